//! Candidate extraction from recognized text fragments.

use tracing::trace;

use crate::models::config::CandidateConfig;
use crate::ocr::RecognizedItem;

use super::number::parse_number;
use super::patterns::{BARE_NUMERIC, GROUPED_BARE, GROUPED_TOKEN, UNIT_TAGGED};
use super::{Candidate, CandidateRule};

/// Turns recognized fragments into raw-unit currency candidates.
///
/// Three rules run per fragment in order. Unit-tagged and grouped readings
/// are always tried; the bare fallback only runs when neither produced
/// anything for that fragment.
#[derive(Debug, Clone)]
pub struct CandidateExtractor {
    grouped_ceiling: u64,
    grouped_full_integer_floor: u64,
    bare_ceiling: f64,
    unit_tagged_ceiling: u64,
}

impl Default for CandidateExtractor {
    fn default() -> Self {
        Self::from_config(&CandidateConfig::default())
    }
}

impl CandidateExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &CandidateConfig) -> Self {
        Self {
            grouped_ceiling: config.grouped_ceiling,
            grouped_full_integer_floor: config.grouped_full_integer_floor,
            bare_ceiling: config.bare_ceiling,
            unit_tagged_ceiling: config.unit_tagged_ceiling,
        }
    }

    /// Extract candidates from every item. Positions are the item's horizontal
    /// center divided by `region_width`, when both are known.
    pub fn extract_candidates(&self, items: &[RecognizedItem], region_width: u32) -> Vec<Candidate> {
        let mut candidates = Vec::new();

        for item in items {
            let position = match (item.horizontal_center, region_width) {
                (Some(center), width) if width > 0 => Some(center / width as f32),
                _ => None,
            };

            for (raw_value, rule) in self.values_from_text(&item.text) {
                candidates.push(Candidate {
                    raw_value,
                    normalized_position: position,
                    rule,
                    source: item.text.clone(),
                });
            }
        }

        candidates
    }

    /// Apply the three rules to a single fragment.
    pub fn values_from_text(&self, text: &str) -> Vec<(u64, CandidateRule)> {
        let text = normalize_text(text);
        if text.is_empty() {
            return Vec::new();
        }

        let mut values = self.unit_tagged(&text);
        values.extend(self.grouped_bare(&text));

        if values.is_empty() {
            values.extend(self.bare_fallback(&text));
        }

        values
    }

    fn unit_tagged(&self, text: &str) -> Vec<(u64, CandidateRule)> {
        let mut values = Vec::new();

        for caps in UNIT_TAGGED.captures_iter(text) {
            let number = match parse_number(&caps[1]) {
                Ok(n) => n,
                Err(e) => {
                    trace!("Skipping unit-tagged token {:?}: {}", &caps[0], e);
                    continue;
                }
            };

            let multiplier = match caps[2].to_lowercase().as_str() {
                "k" => 1_000.0,
                "m" => 1_000_000.0,
                _ => 10_000.0,
            };

            let raw = (number * multiplier).round();
            if !raw.is_finite() || raw > self.unit_tagged_ceiling as f64 {
                trace!("Skipping unit-tagged token {:?}: above ceiling", &caps[0]);
                continue;
            }

            values.push((raw as u64, CandidateRule::UnitTagged));
        }

        values
    }

    fn grouped_bare(&self, text: &str) -> Vec<(u64, CandidateRule)> {
        let mut values = Vec::new();

        for m in GROUPED_BARE.find_iter(text) {
            let rest = &text[m.end()..];
            if is_growth_marker(rest) {
                trace!("Skipping grouped token {:?}: growth marker", m.as_str());
                continue;
            }
            if continues_grouping(rest) {
                continue;
            }

            let Ok(number) = parse_number(m.as_str()) else {
                continue;
            };
            let n = number.round() as u64;
            if n > self.grouped_ceiling {
                trace!("Skipping grouped token {:?}: above ceiling", m.as_str());
                continue;
            }

            // Short groupings are wan readings ("8,650" is 8650w); longer ones
            // are full integers rounded to the nearest wan.
            let raw = if n >= self.grouped_full_integer_floor {
                ((n as f64 / 10_000.0).round() as u64) * 10_000
            } else {
                n * 10_000
            };

            values.push((raw, CandidateRule::GroupedBare));
        }

        values
    }

    fn bare_fallback(&self, text: &str) -> Vec<(u64, CandidateRule)> {
        let mut values = Vec::new();

        for m in BARE_NUMERIC.find_iter(text) {
            let token = m.as_str();
            if GROUPED_TOKEN.is_match(token) {
                continue;
            }
            if token.chars().filter(char::is_ascii_digit).count() < 4 {
                continue;
            }
            if is_growth_marker(&text[m.end()..]) {
                continue;
            }

            let number = match parse_number(token) {
                Ok(n) => n,
                Err(e) => {
                    trace!("Skipping bare token {:?}: {}", token, e);
                    continue;
                }
            };
            if number > self.bare_ceiling {
                trace!("Skipping bare token {:?}: above ceiling", token);
                continue;
            }

            values.push(((number * 1_000.0).round() as u64, CandidateRule::BareFallback));
        }

        values
    }
}

/// Fold full-width digits, punctuation and lookalike unit letters to ASCII.
pub fn normalize_text(text: &str) -> String {
    text.trim()
        .chars()
        .map(|c| match c {
            '０'..='９' => char::from_digit(c as u32 - '０' as u32, 10).unwrap_or(c),
            '，' => ',',
            '．' | '。' => '.',
            '＋' => '+',
            'Ｋ' | 'К' => 'K',
            'ｋ' | 'к' => 'k',
            'Ｗ' => 'W',
            'ｗ' => 'w',
            'Ｍ' | 'М' => 'M',
            'ｍ' | 'м' => 'm',
            '萬' => '万',
            other => other,
        })
        .collect()
}

// A "+" within two characters marks a per-period gain, not a balance.
fn is_growth_marker(rest: &str) -> bool {
    rest.chars().take(2).any(|c| c == '+')
}

fn continues_grouping(rest: &str) -> bool {
    let mut chars = rest.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(',' | '.'), Some(d)) if d.is_ascii_digit()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn values(text: &str) -> Vec<u64> {
        CandidateExtractor::new()
            .values_from_text(text)
            .into_iter()
            .map(|(v, _)| v)
            .collect()
    }

    #[test]
    fn test_unit_tagged() {
        assert_eq!(values("100k"), vec![100_000]);
        assert_eq!(values("1w"), vec![10_000]);
        assert_eq!(values("3.2 W"), vec![32_000]);
        assert_eq!(values("8万"), vec![80_000]);
        assert_eq!(values("1.5m"), vec![1_500_000]);
        assert_eq!(values("12345k"), vec![12_345_000]);
        assert_eq!(values("1,234.5k"), vec![1_234_500]);
    }

    #[test]
    fn test_unit_tagged_ceiling() {
        assert!(values("99999999999999999999999k").is_empty());
        assert!(values("1000001m").is_empty());
        assert_eq!(values("1000000m"), vec![1_000_000_000_000]);
        assert_eq!(values("5k 99999999999999999999999k"), vec![5_000]);
    }

    #[test]
    fn test_full_width_normalization() {
        assert_eq!(normalize_text("１２３４５ｋ"), "12345k");
        assert_eq!(normalize_text(" 647，736＋ "), "647,736+");
        assert_eq!(values("１００Ｋ"), vec![100_000]);
        assert_eq!(values("5萬"), vec![50_000]);
    }

    #[test]
    fn test_grouped_wan_reading() {
        assert_eq!(values("8,650"), vec![86_500_000]);
        assert_eq!(values("8.650"), vec![86_500_000]);
    }

    #[test]
    fn test_grouped_full_integer() {
        assert_eq!(values("647,736"), vec![650_000]);
        assert_eq!(values("1,234,567"), vec![1_230_000]);
    }

    #[test]
    fn test_grouped_rejections() {
        assert!(values("647,736+").is_empty());
        assert!(values("647,736 +").is_empty());
        assert!(values("12,345,678").is_empty());
        assert!(values("1,234,567,890").is_empty());
    }

    #[test]
    fn test_bare_fallback() {
        assert_eq!(values("12345"), vec![12_345_000]);
        assert!(values("64.7").is_empty());
        assert_eq!(values("1234.5"), vec![1_234_500]);
        assert!(values("250000").is_empty());
        assert!(values("123").is_empty());
        assert!(values("12345+").is_empty());
    }

    #[test]
    fn test_bare_fallback_suppressed_by_other_rules() {
        let extractor = CandidateExtractor::new();
        let found = extractor.values_from_text("5k 12345");
        assert_eq!(found, vec![(5_000, CandidateRule::UnitTagged)]);
    }

    #[test]
    fn test_multiple_rules_in_one_fragment() {
        let extractor = CandidateExtractor::new();
        let found = extractor.values_from_text("3w 8,650");
        assert_eq!(
            found,
            vec![
                (30_000, CandidateRule::UnitTagged),
                (86_500_000, CandidateRule::GroupedBare),
            ]
        );
    }

    #[test]
    fn test_positions() {
        let extractor = CandidateExtractor::new();
        let items = vec![
            RecognizedItem::new("300k", 0.9).with_center(60.0),
            RecognizedItem::new("5k", 0.9),
            RecognizedItem::new("noise", 0.9).with_center(10.0),
        ];

        let candidates = extractor.extract_candidates(&items, 300);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].raw_value, 300_000);
        assert_eq!(candidates[0].normalized_position, Some(0.2));
        assert_eq!(candidates[0].source, "300k");
        assert_eq!(candidates[1].normalized_position, None);

        let candidates = extractor.extract_candidates(&items, 0);
        assert_eq!(candidates[0].normalized_position, None);
    }

    #[test]
    fn test_empty_text() {
        assert!(values("").is_empty());
        assert!(values("   ").is_empty());
        assert!(values("gold").is_empty());
    }
}
