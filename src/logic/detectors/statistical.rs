//! Statistical Detector
//!
//! Pretrained binary classifier over the 54-field FeatureVector.
//! `is_anomaly = predicted class == anomaly class`, confidence = class probability.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{DetectionInput, Detector};
use crate::logic::model::{InferenceError, ModelResolver};
use crate::logic::threat::{AnomalyCategory, DetectionResult, FailureKind, STATISTICAL_DETECTOR};

pub struct StatisticalDetector {
    resolver: Arc<ModelResolver>,
    timeout: Duration,
}

impl StatisticalDetector {
    pub fn new(resolver: Arc<ModelResolver>, timeout: Duration) -> Self {
        Self { resolver, timeout }
    }

    /// Resolve the model now instead of on the first cycle
    pub fn warm_up(&self) -> bool {
        self.resolver.get().is_ok()
    }
}

fn failure_kind(error: &InferenceError) -> FailureKind {
    match error {
        InferenceError::ShapeMismatch { .. } => FailureKind::ShapeMismatch,
        InferenceError::NotFound(_)
        | InferenceError::Checksum { .. }
        | InferenceError::Load(_)
        | InferenceError::NoModel => FailureKind::ModelUnavailable,
        InferenceError::Run(_) => FailureKind::Backend,
    }
}

fn abstain(error: &InferenceError) -> DetectionResult {
    DetectionResult::abstain(STATISTICAL_DETECTOR, failure_kind(error), error.to_string())
}

#[async_trait]
impl Detector for StatisticalDetector {
    fn id(&self) -> &str {
        STATISTICAL_DETECTOR
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn classify(&self, input: &DetectionInput) -> DetectionResult {
        let Some(features) = input.features.as_ref() else {
            return DetectionResult::abstain(
                STATISTICAL_DETECTOR,
                FailureKind::NotConfigured,
                "no flow features for identity",
            );
        };

        if let Err(e) = features.validate() {
            return DetectionResult::abstain(
                STATISTICAL_DETECTOR,
                FailureKind::ShapeMismatch,
                e.to_string(),
            );
        }

        let resolver = Arc::clone(&self.resolver);
        let row = features.to_f32();
        let outcome = tokio::task::spawn_blocking(move || {
            let backend = resolver.get()?;
            let prediction = backend.predict(&row)?;
            Ok::<_, InferenceError>((prediction, backend.anomaly_class()))
        })
        .await;

        match outcome {
            Ok(Ok((prediction, anomaly_class))) => {
                if prediction.class == anomaly_class {
                    DetectionResult::anomaly(
                        STATISTICAL_DETECTOR,
                        prediction.probability,
                        AnomalyCategory::StatisticalAnomaly,
                        format!(
                            "classifier predicted anomaly with probability {:.3}",
                            prediction.probability
                        ),
                    )
                } else {
                    DetectionResult::benign(
                        STATISTICAL_DETECTOR,
                        prediction.probability,
                        format!("classifier predicted class {}", prediction.class),
                    )
                }
            }
            Ok(Err(e)) => {
                log::debug!("Statistical detector abstained: {}", e);
                abstain(&e)
            }
            Err(join) => DetectionResult::abstain(
                STATISTICAL_DETECTOR,
                FailureKind::Backend,
                format!("inference task failed: {}", join),
            ),
        }
    }
}

