//! Results-screen state.
//!
//! A `ResultsSession` owns the current image, its analysis result and the
//! selection. Every submission bumps a generation counter and hands out a
//! `Ticket`; settling with a ticket from an older submission is a no-op, so
//! out-of-order completions can never overwrite a newer image's result.

use anyhow::{anyhow, Result};

use crate::asset::ImageAsset;
use crate::detect::{AnalysisResult, Detection, ResultOrigin};
use crate::overlay::Overlay;

/// Proof of a submission, needed to settle it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
    source: String,
}

impl Ticket {
    pub fn source(&self) -> &str {
        &self.source
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ScreenState {
    /// No image supplied; the caller should route back to image selection.
    AwaitingImage,
    Loading,
    Detections(AnalysisResult),
    NoDetections(AnalysisResult),
    Failed(String),
}

#[derive(Debug)]
pub struct ResultsSession {
    generation: u64,
    image_source: Option<String>,
    state: ScreenState,
    selected_id: Option<String>,
}

impl ResultsSession {
    pub fn new() -> Self {
        Self {
            generation: 0,
            image_source: None,
            state: ScreenState::AwaitingImage,
            selected_id: None,
        }
    }

    /// Starts a new analysis. Any result still pending for an earlier image
    /// is invalidated.
    pub fn submit(&mut self, image: &ImageAsset) -> Ticket {
        self.generation += 1;
        self.image_source = Some(image.source().to_string());
        self.state = ScreenState::Loading;
        self.selected_id = None;
        log::debug!(
            "submission {} for {} is loading",
            self.generation,
            image.source()
        );
        Ticket {
            generation: self.generation,
            source: image.source().to_string(),
        }
    }

    /// Drops the current image and any pending result.
    pub fn clear_image(&mut self) {
        self.generation += 1;
        self.image_source = None;
        self.state = ScreenState::AwaitingImage;
        self.selected_id = None;
    }

    /// Applies a finished analysis. Returns `false` and changes nothing when
    /// the ticket belongs to a superseded submission.
    pub fn settle(&mut self, ticket: &Ticket, result: AnalysisResult) -> bool {
        if ticket.generation != self.generation || self.state != ScreenState::Loading {
            log::debug!(
                "ignoring stale result for {} (submission {}, current {})",
                ticket.source,
                ticket.generation,
                self.generation
            );
            return false;
        }

        self.selected_id = result.detections.first().map(|d| d.id.clone());
        let failure = match &result.origin {
            ResultOrigin::Unavailable { reason } => {
                Some(format!("Failed to analyze the image: {}", reason))
            }
            _ => None,
        };
        self.state = match failure {
            Some(message) => ScreenState::Failed(message),
            None if result.is_empty() => ScreenState::NoDetections(result),
            None => ScreenState::Detections(result),
        };
        true
    }

    pub fn state(&self) -> &ScreenState {
        &self.state
    }

    pub fn image_source(&self) -> Option<&str> {
        self.image_source.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.state == ScreenState::Loading
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match &self.state {
            ScreenState::Detections(result) | ScreenState::NoDetections(result) => Some(result),
            _ => None,
        }
    }

    pub fn detections(&self) -> &[Detection] {
        self.result()
            .map(|result| result.detections.as_slice())
            .unwrap_or(&[])
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected_id.as_deref()
    }

    pub fn selected(&self) -> Option<&Detection> {
        let id = self.selected_id.as_deref()?;
        self.detections().iter().find(|d| d.id == id)
    }

    /// Selects a detection by id. A failed analysis has nothing to select;
    /// the error carries the failure instead.
    pub fn select(&mut self, id: &str) -> Result<&Detection> {
        if let ScreenState::Failed(message) = &self.state {
            return Err(anyhow!("cannot select '{}': {}", id, message));
        }
        let index = self
            .detections()
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| anyhow!("no detection with id '{}'", id))?;
        self.selected_id = Some(id.to_string());
        Ok(&self.detections()[index])
    }

    /// Selects whatever the overlay reports under the point. Returns the new
    /// selection, or `None` (selection unchanged) on a miss.
    pub fn tap(&mut self, x: f64, y: f64) -> Option<&Detection> {
        let hit = self.overlay().hit_test(x, y)?.id.clone();
        self.selected_id = Some(hit);
        self.selected()
    }

    /// Overlay for the current detections and selection.
    pub fn overlay(&self) -> Overlay<'_> {
        Overlay::new(self.detections(), self.selected_id.as_deref())
    }
}

impl Default for ResultsSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{color_for_class, BoundingBox, FallbackReason};

    fn image(name: &str) -> ImageAsset {
        ImageAsset::new(name, vec![0xFF, 0xD8, 0xFF, 0xD9]).unwrap()
    }

    fn detection(id: &str, x: f64) -> Detection {
        Detection {
            id: id.to_string(),
            class: "P. ovale".to_string(),
            confidence: 0.8,
            bbox: BoundingBox {
                x,
                y: 0.0,
                width: 20.0,
                height: 20.0,
            },
            color: color_for_class("P. ovale"),
        }
    }

    #[test]
    fn starts_awaiting_image() {
        let session = ResultsSession::new();
        assert_eq!(session.state(), &ScreenState::AwaitingImage);
        assert!(session.selected().is_none());
        assert!(session.detections().is_empty());
    }

    #[test]
    fn first_detection_is_selected_on_settle() {
        let mut session = ResultsSession::new();
        let ticket = session.submit(&image("one.jpg"));
        assert!(session.is_loading());
        assert!(session.settle(
            &ticket,
            AnalysisResult::live(vec![detection("a", 0.0), detection("b", 50.0)])
        ));
        assert!(matches!(session.state(), ScreenState::Detections(_)));
        assert_eq!(session.selected_id(), Some("a"));
    }

    #[test]
    fn empty_live_result_is_no_detections() {
        let mut session = ResultsSession::new();
        let ticket = session.submit(&image("one.jpg"));
        session.settle(&ticket, AnalysisResult::live(vec![]));
        assert!(matches!(session.state(), ScreenState::NoDetections(_)));
        assert!(session.selected_id().is_none());
    }

    #[test]
    fn unavailable_result_is_failure() {
        let mut session = ResultsSession::new();
        let ticket = session.submit(&image("one.jpg"));
        session.settle(
            &ticket,
            AnalysisResult::unavailable(FallbackReason::UploadFailure("status 500".into())),
        );
        match session.state() {
            ScreenState::Failed(msg) => assert!(msg.contains("status 500")),
            other => panic!("unexpected state {:?}", other),
        }
        let err = session.select("a").unwrap_err().to_string();
        assert!(err.contains("Failed to analyze the image"), "{}", err);
    }

    #[test]
    fn stale_settlement_is_ignored() {
        let mut session = ResultsSession::new();
        let first = session.submit(&image("first.jpg"));
        let second = session.submit(&image("second.jpg"));

        assert!(session.settle(&second, AnalysisResult::live(vec![detection("second-1", 0.0)])));
        assert!(!session.settle(&first, AnalysisResult::live(vec![detection("first-1", 0.0)])));

        assert_eq!(session.selected_id(), Some("second-1"));
        assert_eq!(session.image_source(), Some("second.jpg"));
    }

    #[test]
    fn settlement_after_clear_is_ignored() {
        let mut session = ResultsSession::new();
        let ticket = session.submit(&image("one.jpg"));
        session.clear_image();
        assert!(!session.settle(&ticket, AnalysisResult::live(vec![detection("a", 0.0)])));
        assert_eq!(session.state(), &ScreenState::AwaitingImage);
    }

    #[test]
    fn duplicate_settlement_is_ignored() {
        let mut session = ResultsSession::new();
        let ticket = session.submit(&image("one.jpg"));
        assert!(session.settle(&ticket, AnalysisResult::live(vec![detection("a", 0.0)])));
        assert!(!session.settle(&ticket, AnalysisResult::live(vec![detection("z", 0.0)])));
        assert_eq!(session.selected_id(), Some("a"));
    }

    #[test]
    fn select_and_tap_move_the_selection() {
        let mut session = ResultsSession::new();
        let ticket = session.submit(&image("one.jpg"));
        session.settle(
            &ticket,
            AnalysisResult::live(vec![detection("a", 0.0), detection("b", 50.0)]),
        );

        assert_eq!(session.select("b").unwrap().id, "b");
        assert!(session.select("nope").is_err());
        assert_eq!(session.selected_id(), Some("b"));

        assert_eq!(session.tap(5.0, 5.0).map(|d| d.id.clone()), Some("a".to_string()));
        assert!(session.tap(500.0, 5.0).is_none());
        assert_eq!(session.selected_id(), Some("a"));

        let marked: Vec<String> = session
            .overlay()
            .rects()
            .iter()
            .filter(|r| r.selected)
            .map(|r| r.detection.id.clone())
            .collect();
        assert_eq!(marked, vec!["a".to_string()]);
    }
}
