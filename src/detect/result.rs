use serde::Serialize;

use super::palette::Color;

/// Axis-aligned box in image pixel space. `(x, y)` is the top-left corner
/// and may lie outside the image.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// Builds a box from a center point and extent. Width and height pass
    /// through unchanged, so a box near the image edge may have a negative
    /// origin; rendering clips it.
    ///
    /// Returns `None` when the inputs are not finite or the box has no area.
    pub fn from_center(cx: f64, cy: f64, width: f64, height: f64) -> Option<Self> {
        if ![cx, cy, width, height].iter().all(|v| v.is_finite()) {
            return None;
        }
        if width <= 0.0 || height <= 0.0 {
            return None;
        }
        Some(Self {
            x: cx - width / 2.0,
            y: cy - height / 2.0,
            width,
            height,
        })
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Half-open containment: the left/top edges are inside, the right/bottom
    /// edges are not.
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }
}

/// One detected object instance.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Detection {
    /// Unique within one result set; used as the selection key.
    pub id: String,
    pub class: String,
    /// Always within `[0, 1]`.
    pub confidence: f32,
    pub bbox: BoundingBox,
    pub color: Color,
}

impl Detection {
    /// Confidence as a whole percentage, the way the results screen shows it.
    pub fn confidence_percent(&self) -> u32 {
        (self.confidence * 100.0).round() as u32
    }
}

/// Why the pipeline substituted (or withheld) a result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum FallbackReason {
    UploadFailure(String),
    DetectionServiceFailure(String),
    EmptyPredictions,
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FallbackReason::UploadFailure(msg) => write!(f, "image upload failed: {}", msg),
            FallbackReason::DetectionServiceFailure(msg) => {
                write!(f, "detection service failed: {}", msg)
            }
            FallbackReason::EmptyPredictions => write!(f, "detection service returned no predictions"),
        }
    }
}

/// Where a result set came from. Consumers must disclose anything other
/// than `Live`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum ResultOrigin {
    Live,
    Synthetic { reason: FallbackReason },
    Unavailable { reason: FallbackReason },
}

impl ResultOrigin {
    pub fn is_live(&self) -> bool {
        matches!(self, ResultOrigin::Live)
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self, ResultOrigin::Synthetic { .. })
    }

    pub fn fallback_reason(&self) -> Option<&FallbackReason> {
        match self {
            ResultOrigin::Live => None,
            ResultOrigin::Synthetic { reason } | ResultOrigin::Unavailable { reason } => {
                Some(reason)
            }
        }
    }
}

/// Ordered detections for one image submission, tagged with their origin.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalysisResult {
    #[serde(flatten)]
    pub origin: ResultOrigin,
    pub detections: Vec<Detection>,
}

impl AnalysisResult {
    pub fn live(detections: Vec<Detection>) -> Self {
        Self {
            origin: ResultOrigin::Live,
            detections,
        }
    }

    pub fn synthetic(reason: FallbackReason, detections: Vec<Detection>) -> Self {
        Self {
            origin: ResultOrigin::Synthetic { reason },
            detections,
        }
    }

    pub fn unavailable(reason: FallbackReason) -> Self {
        Self {
            origin: ResultOrigin::Unavailable { reason },
            detections: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Detection> {
        self.detections.iter().find(|d| d.id == id)
    }
}
