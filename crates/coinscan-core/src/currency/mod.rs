//! Currency reading: candidate rules, selection and orchestration.

mod candidates;
mod extractor;
pub mod money;
mod number;
pub mod patterns;

pub use candidates::{CandidateExtractor, normalize_text};
pub use extractor::{CurrencyExtractor, Extraction, ExtractionSource};
pub use number::parse_number;

use serde::Serialize;

/// Which rule produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateRule {
    /// Number with a k/w/万/m suffix.
    UnitTagged,
    /// Thousands-grouped number without a suffix.
    GroupedBare,
    /// Unsuffixed number read as thousands.
    BareFallback,
}

/// A proposed currency amount in raw units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub raw_value: u64,
    /// Horizontal center over region width, 0.0 at the left edge.
    pub normalized_position: Option<f32>,
    pub rule: CandidateRule,
    /// Recognized text the value came from.
    pub source: String,
}

/// Pick one value: the leftmost positioned candidate, else the largest.
///
/// Non-positive values are ignored. Ties on position keep the earlier candidate.
pub fn select_candidate(candidates: &[Candidate]) -> Option<u64> {
    let valid = || candidates.iter().filter(|c| c.raw_value > 0);

    let leftmost = valid()
        .filter_map(|c| c.normalized_position.map(|p| (p, c.raw_value)))
        .min_by(|a, b| a.0.total_cmp(&b.0));

    match leftmost {
        Some((_, raw)) => Some(raw),
        None => valid().map(|c| c.raw_value).max(),
    }
}
