//! Conversion of remote predictions into canonical detections.
//!
//! The detection service reports boxes in center-point convention and is
//! loose about field names. Everything here treats the payload as untrusted:
//! a malformed entry is dropped, never propagated as an error.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;

use super::palette::{color_for_class, UNKNOWN_CLASS};
use super::result::{BoundingBox, Detection};

/// Prefix for ids synthesised when the service omits one.
pub const GENERATED_ID_PREFIX: &str = "detection";

/// One prediction as reported by the detection service.
///
/// `x`/`y` are the box center.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawPrediction {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub class: Option<String>,
    pub confidence: Option<f64>,
    pub score: Option<f64>,
    pub detection_id: Option<String>,
}

/// The only fields an entry must carry with the right type.
#[derive(Deserialize)]
struct BoxFields {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl RawPrediction {
    /// Parses one prediction entry. The box must be numeric; label, id and
    /// scores are read leniently so a type surprise there never costs a
    /// detection.
    pub fn from_value(item: &Value) -> Result<Self, serde_json::Error> {
        let BoxFields {
            x,
            y,
            width,
            height,
        } = BoxFields::deserialize(item)?;
        Ok(Self {
            x,
            y,
            width,
            height,
            class: lenient_text(item.get("class")),
            confidence: item.get("confidence").and_then(Value::as_f64),
            score: item.get("score").and_then(Value::as_f64),
            detection_id: lenient_text(item.get("detection_id")),
        })
    }
}

fn lenient_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Pulls the prediction list out of a workflow response.
///
/// The list lives at `outputs[0].predictions.predictions`. Any deviation from
/// that shape yields an empty list. Entries without numeric box fields are
/// skipped; nothing else can disqualify an entry.
pub fn extract_predictions(response: &Value) -> Vec<RawPrediction> {
    let Some(items) = response
        .get("outputs")
        .and_then(Value::as_array)
        .and_then(|outputs| outputs.first())
        .and_then(|output| output.get("predictions"))
        .and_then(|predictions| predictions.get("predictions"))
        .and_then(Value::as_array)
    else {
        log::debug!("workflow response has no prediction list");
        return Vec::new();
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            match RawPrediction::from_value(item) {
                Ok(prediction) => Some(prediction),
                Err(err) => {
                    log::debug!("skipping prediction {}: {}", index, err);
                    None
                }
            }
        })
        .collect()
}

/// Maps raw predictions to detections, preserving input order.
///
/// Boxes that cannot be represented (non-finite, zero area) are dropped.
/// Ids are unique within the returned list.
pub fn normalize(predictions: &[RawPrediction]) -> Vec<Detection> {
    let mut used_ids: HashSet<String> = HashSet::new();
    let mut detections = Vec::with_capacity(predictions.len());

    for (index, raw) in predictions.iter().enumerate() {
        let Some(bbox) = BoundingBox::from_center(raw.x, raw.y, raw.width, raw.height) else {
            log::debug!(
                "dropping prediction {} with unusable box ({}, {}, {}, {})",
                index,
                raw.x,
                raw.y,
                raw.width,
                raw.height
            );
            continue;
        };

        let class = raw
            .class
            .as_deref()
            .map(str::trim)
            .filter(|class| !class.is_empty())
            .unwrap_or(UNKNOWN_CLASS)
            .to_string();

        let id = assign_id(raw.detection_id.as_deref(), index, &mut used_ids);
        let color = color_for_class(&class);

        detections.push(Detection {
            id,
            confidence: clamp_confidence(raw.confidence.or(raw.score)),
            class,
            bbox,
            color,
        });
    }

    detections
}

fn clamp_confidence(value: Option<f64>) -> f32 {
    match value {
        Some(v) if v.is_finite() => v.clamp(0.0, 1.0) as f32,
        _ => 0.0,
    }
}

fn assign_id(service_id: Option<&str>, index: usize, used: &mut HashSet<String>) -> String {
    if let Some(id) = service_id.map(str::trim).filter(|id| !id.is_empty()) {
        if used.insert(id.to_string()) {
            return id.to_string();
        }
        log::debug!("duplicate detection id '{}' replaced", id);
    }

    let base = format!("{}-{}", GENERATED_ID_PREFIX, index + 1);
    let mut candidate = base.clone();
    let mut bump = 1;
    while !used.insert(candidate.clone()) {
        bump += 1;
        candidate = format!("{}-{}", base, bump);
    }
    candidate
}
