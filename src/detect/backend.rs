use crate::asset::ImageAsset;
use crate::detect::normalize::RawPrediction;

/// Failure of one inference attempt, attributed to the leg that failed.
#[derive(Debug)]
pub enum InferenceFailure {
    /// The image could not be hosted (transport error, non-2xx, no URL).
    Upload(anyhow::Error),
    /// The detection call failed (transport error, non-2xx, malformed JSON).
    DetectionService(anyhow::Error),
}

impl std::fmt::Display for InferenceFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InferenceFailure::Upload(err) => write!(f, "upload failed: {:#}", err),
            InferenceFailure::DetectionService(err) => {
                write!(f, "detection service failed: {:#}", err)
            }
        }
    }
}

impl std::error::Error for InferenceFailure {}

/// One network leg of a remote analysis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Leg {
    Upload,
    Detect,
}

impl Leg {
    pub fn label(self) -> &'static str {
        match self {
            Leg::Upload => "Uploading image",
            Leg::Detect => "Running detection",
        }
    }
}

/// Receives leg boundaries while a backend works, e.g. to drive a loading
/// indicator.
pub trait LegObserver {
    fn started(&mut self, leg: Leg);
    /// `ok` is false when the leg failed; `detail` is a short summary.
    fn finished(&mut self, leg: Leg, ok: bool, detail: &str);
}

/// Observer that ignores everything.
pub struct Unobserved;

impl LegObserver for Unobserved {
    fn started(&mut self, _leg: Leg) {}
    fn finished(&mut self, _leg: Leg, _ok: bool, _detail: &str) {}
}

/// Detector backend trait.
///
/// A backend turns one image into raw predictions. It may block on network
/// I/O but must bound every call with a timeout. An empty prediction list is
/// a success, not a failure.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on an image, reporting each leg to `observer`.
    fn detect(
        &mut self,
        image: &ImageAsset,
        observer: &mut dyn LegObserver,
    ) -> Result<Vec<RawPrediction>, InferenceFailure>;
}
