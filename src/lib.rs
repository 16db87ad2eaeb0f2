//! smearscan
//!
//! Detection-result pipeline for blood-smear malaria screening.
//!
//! # Flow
//!
//! 1. An [`ImageAsset`] is submitted to an [`Analyzer`].
//! 2. The remote backend hosts the image, then runs the detection workflow
//!    on its URL.
//! 3. Raw predictions (center-point boxes, loose field names) are normalized
//!    into [`Detection`]s.
//! 4. If inference fails or yields nothing, the degraded-mode generator
//!    substitutes synthetic detections. The result is always tagged with a
//!    [`ResultOrigin`] so consumers can disclose demo data.
//! 5. A [`ResultsSession`] holds the result and selection; its [`Overlay`]
//!    renders boxes and resolves taps.
//!
//! # Module Structure
//!
//! - `asset`: image handles
//! - `detect`: detection model, normalization, backends
//! - `analyze`: the never-failing analysis entry point
//! - `overlay`: box rendering and hit testing
//! - `session`: results-screen state and stale-result guard
//! - `config`: endpoint, timeout and fallback settings
//! - `report`, `ui`: terminal presentation

pub mod analyze;
pub mod asset;
pub mod config;
pub mod detect;
pub mod overlay;
pub mod report;
pub mod session;
pub mod ui;

pub use analyze::Analyzer;
pub use asset::ImageAsset;
pub use config::{FallbackSettings, ScreeningConfig, UploadSettings, WorkflowSettings};
pub use detect::{
    AnalysisResult, BoundingBox, Color, Detection, DetectorBackend, FallbackReason,
    InferenceFailure, Leg, LegObserver, RawPrediction, ResultOrigin,
};
pub use overlay::{Overlay, OverlayRect};
pub use session::{ResultsSession, ScreenState, Ticket};
