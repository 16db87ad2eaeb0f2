mod backend;
mod backends;
pub mod normalize;
pub mod palette;
mod result;

pub use backend::{DetectorBackend, InferenceFailure, Leg, LegObserver, Unobserved};
pub use backends::{ImageUploader, RemoteBackend, SyntheticGenerator, WorkflowClient};
pub use backends::remote::MAX_RESPONSE_BYTES;
pub use backends::synthetic::SYNTHETIC_ID_PREFIX;
pub use normalize::{extract_predictions, normalize, RawPrediction};
pub use palette::{color_for_class, Color, PARASITE_CLASSES, UNKNOWN_CLASS};
pub use result::{AnalysisResult, BoundingBox, Detection, FallbackReason, ResultOrigin};
