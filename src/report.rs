//! Plain-text rendering of an analysis for the terminal results view.

use anyhow::Result;
use serde_json::json;
use std::fmt::Write;

use crate::detect::{Detection, ResultOrigin};
use crate::session::{ResultsSession, ScreenState};

pub const DISCLAIMER: &str = "Disclaimer: This analysis is for screening purposes only and \
should not replace proper laboratory diagnosis by trained professionals.";

pub const NO_DETECTIONS: &str = "No malaria parasites were detected in this image. However, \
this does not rule out infection. Always consult with a healthcare professional for proper diagnosis.";

/// Text shown for synthetic results. Synthetic detections are not findings.
pub fn origin_notice(origin: &ResultOrigin) -> Option<String> {
    match origin {
        ResultOrigin::Live => None,
        ResultOrigin::Synthetic { reason } => Some(format!(
            "DEMO DATA: live analysis was unavailable ({}). The detections below are \
simulated and must not be used for diagnosis.",
            reason
        )),
        ResultOrigin::Unavailable { reason } => {
            Some(format!("Live analysis was unavailable ({}).", reason))
        }
    }
}

/// Detail card for one detection.
pub fn detail_card(detection: &Detection) -> String {
    format!(
        "Detection #{}\n  Type:       {}\n  Confidence: {}%\n  Location:   X: {}, Y: {}\n",
        detection.id,
        detection.class,
        detection.confidence_percent(),
        detection.bbox.x.round(),
        detection.bbox.y.round()
    )
}

/// Whole results view for the session's current state.
pub fn render(session: &ResultsSession) -> String {
    let mut out = String::new();
    match session.state() {
        ScreenState::AwaitingImage => {
            out.push_str("No image selected. Capture or choose an image to analyze.\n");
        }
        ScreenState::Loading => {
            out.push_str("Analyzing image...\nThis may take a few moments\n");
        }
        ScreenState::Failed(message) => {
            let _ = writeln!(out, "Analysis Failed\n{}", message);
        }
        ScreenState::NoDetections(result) => {
            if let Some(notice) = origin_notice(&result.origin) {
                let _ = writeln!(out, "{}\n", notice);
            }
            let _ = writeln!(out, "No Parasites Detected\n{}", NO_DETECTIONS);
        }
        ScreenState::Detections(result) => {
            if let Some(notice) = origin_notice(&result.origin) {
                let _ = writeln!(out, "{}\n", notice);
            }
            let _ = writeln!(out, "Detected Parasites: {}", result.detections.len());
            out.push_str("Tap on a detection in the image to view details\n\n");
            if let Some(selected) = session.selected() {
                out.push_str(&detail_card(selected));
                out.push('\n');
            }
            out.push_str("All Detections\n");
            for detection in &result.detections {
                let marker = if session.selected_id() == Some(detection.id.as_str()) {
                    '>'
                } else {
                    ' '
                };
                let _ = writeln!(
                    out,
                    "{} [{}] {:<14} Confidence: {}%  ({})",
                    marker,
                    detection.id,
                    detection.class,
                    detection.confidence_percent(),
                    detection.color
                );
            }
            let _ = writeln!(out, "\n{}", DISCLAIMER);
        }
    }
    out
}

/// Machine-readable view for `--json`: the analysis result, or the failure
/// with an empty detection list.
pub fn to_json(session: &ResultsSession) -> Result<String> {
    let value = match (session.state(), session.result()) {
        (ScreenState::Failed(message), _) => json!({
            "origin": "failed",
            "error": message,
            "detections": [],
        }),
        (_, Some(result)) => serde_json::to_value(result)?,
        (ScreenState::Loading, None) => json!({"origin": "pending", "detections": []}),
        (_, None) => json!({"origin": "no_image", "detections": []}),
    };
    Ok(serde_json::to_string_pretty(&value)?)
}
