//! Normalization of raw recognition output into [`RecognizedItem`]s.

use serde_json::{Map, Value};
use tracing::{trace, warn};

use crate::error::RecognitionError;
use crate::models::config::RecognitionConfig;

use super::{RecognitionCapability, RecognitionMode, RecognizedItem, Variant};

/// Keys under which dictionary pages keep their geometry, most precise first.
const BOX_KEYS: [&str; 3] = ["rec_polys", "dt_polys", "rec_boxes"];

/// Wraps a [`RecognitionCapability`] and turns its output into a flat item list.
///
/// Failures never escape: a capability error or an unreadable result is
/// logged and read as "no text".
pub struct RecognitionAdapter<C> {
    capability: C,
    localized_min_confidence: f32,
    direct_min_confidence: f32,
}

impl<C: RecognitionCapability> RecognitionAdapter<C> {
    /// Create an adapter with the default confidence floors.
    pub fn new(capability: C) -> Self {
        Self::from_config(capability, &RecognitionConfig::default())
    }

    /// Create an adapter from configuration.
    pub fn from_config(capability: C, config: &RecognitionConfig) -> Self {
        Self {
            capability,
            localized_min_confidence: config.localized_min_confidence,
            direct_min_confidence: config.direct_min_confidence,
        }
    }

    /// Access the wrapped capability.
    pub fn capability(&self) -> &C {
        &self.capability
    }

    /// Detect and recognize; items keep their horizontal centers.
    pub fn recognize_localized(&self, variant: &Variant) -> Vec<RecognizedItem> {
        self.run(
            variant,
            RecognitionMode::DetectAndRecognize,
            self.localized_min_confidence,
        )
    }

    /// Recognize the whole variant as one line; items carry no position.
    pub fn recognize_direct(&self, variant: &Variant) -> Vec<RecognizedItem> {
        let mut items = self.run(
            variant,
            RecognitionMode::RecognizeOnly,
            self.direct_min_confidence,
        );
        for item in &mut items {
            item.horizontal_center = None;
        }
        items
    }

    fn run(&self, variant: &Variant, mode: RecognitionMode, floor: f32) -> Vec<RecognizedItem> {
        let raw = match self.capability.recognize(&variant.image, mode) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Recognition failed on variant {}: {}", variant.name, e);
                return Vec::new();
            }
        };

        let items = match normalize_items(&raw) {
            Ok(items) => items,
            Err(e) => {
                warn!("Skipping variant {}: {}", variant.name, e);
                return Vec::new();
            }
        };

        let kept: Vec<RecognizedItem> = items
            .into_iter()
            .filter(|item| item.confidence >= floor)
            .collect();

        trace!("Variant {} ({:?}): {:?}", variant.name, mode, kept);
        kept
    }
}

/// Normalize a raw recognition result into items, without confidence filtering.
///
/// Accepted shapes:
/// - `[[ [box, [text, score]], ... ]]` and `[[ [text, score], ... ]]`
/// - the same lists without the outer page wrapper
/// - dictionary pages with `rec_texts` / `rec_scores` / polygon lists, optionally under `res`
/// - per-item objects `{ text, score | confidence, box | bbox }`
///
/// `null` pages normalize to no items.
pub fn normalize_items(result: &Value) -> Result<Vec<RecognizedItem>, RecognitionError> {
    if let Some(item) = parse_item(result) {
        return Ok(vec![item]);
    }

    match result {
        Value::Null => Ok(Vec::new()),
        Value::Object(map) => Ok(items_from_page_object(map)),
        Value::Array(entries) => {
            let Some(first) = entries.first() else {
                return Ok(Vec::new());
            };

            // Unwrapped list of items.
            if parse_item(first).is_some() {
                return Ok(entries.iter().filter_map(parse_item).collect());
            }

            // Only the first page is read.
            match first {
                Value::Null => Ok(Vec::new()),
                Value::Array(items) => Ok(items.iter().filter_map(parse_item).collect()),
                Value::Object(map) => Ok(items_from_page_object(map)),
                other => Err(RecognitionError::Malformed(format!(
                    "unexpected page {}",
                    kind_name(other)
                ))),
            }
        }
        other => Err(RecognitionError::Malformed(format!(
            "unexpected result {}",
            kind_name(other)
        ))),
    }
}

fn parse_item(value: &Value) -> Option<RecognizedItem> {
    match value {
        Value::Array(parts) if parts.len() == 2 && parts[0].is_string() => {
            let text = parts[0].as_str()?;
            Some(RecognizedItem::new(text, score_or_default(parts.get(1))))
        }
        Value::Array(parts) if parts.len() >= 2 && looks_like_box(&parts[0]) => {
            let (text, confidence) = text_and_score(&parts[1])?;
            let mut item = RecognizedItem::new(text, confidence);
            item.horizontal_center = box_center(&parts[0]);
            Some(item)
        }
        Value::Object(map) => {
            let text = map.get("text")?.as_str()?;
            let score = map.get("score").or_else(|| map.get("confidence"));
            let mut item = RecognizedItem::new(text, score_or_default(score));
            item.horizontal_center = map
                .get("box")
                .or_else(|| map.get("bbox"))
                .and_then(box_center);
            Some(item)
        }
        _ => None,
    }
}

fn items_from_page_object(map: &Map<String, Value>) -> Vec<RecognizedItem> {
    if let Some(Value::Object(inner)) = map.get("res") {
        return items_from_page_object(inner);
    }

    let Some(texts) = map.get("rec_texts").and_then(Value::as_array) else {
        return parse_item(&Value::Object(map.clone())).into_iter().collect();
    };

    let scores = map.get("rec_scores").and_then(Value::as_array);
    let boxes = BOX_KEYS
        .iter()
        .find_map(|key| map.get(*key).and_then(Value::as_array));

    texts
        .iter()
        .enumerate()
        .filter_map(|(i, text)| {
            let text = text.as_str()?;
            let score = scores.and_then(|s| s.get(i));
            let mut item = RecognizedItem::new(text, score_or_default(score));
            item.horizontal_center = boxes.and_then(|b| b.get(i)).and_then(box_center);
            Some(item)
        })
        .collect()
}

/// `[text, score]` or `[text]`.
fn text_and_score(value: &Value) -> Option<(String, f32)> {
    let parts = value.as_array()?;
    let text = parts.first()?.as_str()?;
    Some((text.to_string(), score_or_default(parts.get(1))))
}

/// A missing score counts as certain; an unreadable one as zero.
fn score_or_default(value: Option<&Value>) -> f32 {
    match value {
        None => 1.0,
        Some(v) => as_number(v).map(|s| s as f32).unwrap_or(0.0),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A polygon of `[x, y]` points or a flat list of coordinates.
fn looks_like_box(value: &Value) -> bool {
    let Some(parts) = value.as_array() else {
        return false;
    };
    if parts.is_empty() {
        return false;
    }

    let is_point = |p: &Value| {
        p.as_array()
            .is_some_and(|xy| xy.len() >= 2 && xy.iter().all(Value::is_number))
    };

    parts.iter().all(is_point) || (parts.len() >= 2 && parts.iter().all(Value::is_number))
}

fn box_center(value: &Value) -> Option<f32> {
    if !looks_like_box(value) {
        return None;
    }
    let parts = value.as_array()?;

    let xs: Vec<f64> = if parts.iter().all(Value::is_number) {
        // Flat [x1, y1, x2, y2, ...]
        parts.iter().step_by(2).filter_map(Value::as_f64).collect()
    } else {
        parts
            .iter()
            .filter_map(|p| p.as_array()?.first()?.as_f64())
            .collect()
    };

    if xs.is_empty() {
        return None;
    }
    Some((xs.iter().sum::<f64>() / xs.len() as f64) as f32)
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
