//! Image analysis pipeline.
//!
//! `Analyzer::analyze` always produces an `AnalysisResult`. Failures of the
//! backend and empty prediction lists are absorbed here and turned into a
//! tagged fallback result; nothing propagates to the caller.

use crate::asset::ImageAsset;
use crate::config::{FallbackSettings, ScreeningConfig};
use crate::detect::{
    normalize, AnalysisResult, DetectorBackend, FallbackReason, InferenceFailure, LegObserver,
    RemoteBackend, SyntheticGenerator, Unobserved,
};

pub struct Analyzer {
    backend: Box<dyn DetectorBackend>,
    synthetic: Option<SyntheticGenerator>,
}

impl Analyzer {
    /// Analyzer over an arbitrary backend with the given fallback policy.
    pub fn new(backend: Box<dyn DetectorBackend>, fallback: FallbackSettings) -> Self {
        let synthetic = fallback.synthetic.then(|| match fallback.seed {
            Some(seed) => SyntheticGenerator::seeded(seed),
            None => SyntheticGenerator::new(),
        });
        Self { backend, synthetic }
    }

    /// Remote upload-then-detect analyzer built from configuration.
    pub fn from_config(cfg: &ScreeningConfig) -> Self {
        let backend = RemoteBackend::new(
            cfg.upload.clone(),
            cfg.workflow.clone(),
            cfg.upload_timeout,
            cfg.detect_timeout,
        );
        Self::new(Box::new(backend), cfg.fallback)
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn synthetic_fallback_enabled(&self) -> bool {
        self.synthetic.is_some()
    }

    /// Runs one analysis. Never fails.
    pub fn analyze(&mut self, image: &ImageAsset) -> AnalysisResult {
        self.analyze_observed(image, &mut Unobserved)
    }

    /// Like [`Analyzer::analyze`], reporting each network leg to `observer`.
    pub fn analyze_observed(
        &mut self,
        image: &ImageAsset,
        observer: &mut dyn LegObserver,
    ) -> AnalysisResult {
        log::info!(
            "analyzing {} ({} bytes) with {} backend",
            image.source(),
            image.len(),
            self.backend.name()
        );

        let reason = match self.backend.detect(image, observer) {
            Ok(predictions) => {
                let detections = normalize(&predictions);
                if !detections.is_empty() {
                    log::info!("{} detection(s) from live inference", detections.len());
                    return AnalysisResult::live(detections);
                }
                FallbackReason::EmptyPredictions
            }
            Err(InferenceFailure::Upload(err)) => FallbackReason::UploadFailure(format!("{:#}", err)),
            Err(InferenceFailure::DetectionService(err)) => {
                FallbackReason::DetectionServiceFailure(format!("{:#}", err))
            }
        };

        self.fall_back(reason)
    }

    fn fall_back(&mut self, reason: FallbackReason) -> AnalysisResult {
        match self.synthetic.as_mut() {
            Some(generator) => {
                let detections = generator.generate();
                log::warn!(
                    "{}; substituting {} synthetic detection(s)",
                    reason,
                    detections.len()
                );
                AnalysisResult::synthetic(reason, detections)
            }
            None => {
                log::warn!("{}; synthetic fallback disabled", reason);
                AnalysisResult::unavailable(reason)
            }
        }
    }
}
