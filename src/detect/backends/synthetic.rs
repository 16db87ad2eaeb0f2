use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::detect::palette::{color_for_class, PARASITE_CLASSES};
use crate::detect::result::{BoundingBox, Detection};

/// Prefix marking synthetic detection ids.
pub const SYNTHETIC_ID_PREFIX: &str = "synthetic";

const MAX_DETECTIONS: usize = 3;
const CONFIDENCE_RANGE: std::ops::Range<f32> = 0.7..1.0;
const POSITION_RANGE: std::ops::Range<f64> = 0.0..200.0;
const SIZE_RANGE: std::ops::Range<f64> = 50.0..130.0;

/// Degraded-mode generator. Produces a plausible result set when live
/// inference is unavailable so the results view always has something to
/// explore. Output is always tagged synthetic by the caller.
pub struct SyntheticGenerator {
    rng: StdRng,
}

impl SyntheticGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible generator for demos and tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn generate(&mut self) -> Vec<Detection> {
        let count = self.rng.gen_range(1..=MAX_DETECTIONS);
        (1..=count)
            .map(|n| {
                let class = PARASITE_CLASSES[self.rng.gen_range(0..PARASITE_CLASSES.len())];
                Detection {
                    id: format!("{}-{}", SYNTHETIC_ID_PREFIX, n),
                    class: class.to_string(),
                    confidence: self.rng.gen_range(CONFIDENCE_RANGE),
                    bbox: BoundingBox {
                        x: self.rng.gen_range(POSITION_RANGE),
                        y: self.rng.gen_range(POSITION_RANGE),
                        width: self.rng.gen_range(SIZE_RANGE),
                        height: self.rng.gen_range(SIZE_RANGE),
                    },
                    color: color_for_class(class),
                }
            })
            .collect()
    }
}

impl Default for SyntheticGenerator {
    fn default() -> Self {
        Self::new()
    }
}
