//! Detectors Module - Independent classification strategies
//!
//! Every detector answers the same question for one identity and never
//! fails outward: backend trouble becomes an abstaining DetectionResult.
//!
//! # Components
//! - `reputation.rs`: external IP reputation score
//! - `statistical.rs`: pretrained classifier over the FeatureVector
//! - `semantic.rs`: LLM traffic-pattern analysis
//! - `threshold.rs`: brute-force / port-scan / DoS rules

pub mod reputation;
pub mod semantic;
pub mod statistical;
pub mod threshold;


use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::logic::aggregator::SourceSummary;
use crate::logic::features::FeatureVector;
use crate::logic::ingest::ConnectionRecord;
use crate::logic::threat::DetectionResult;

pub use reputation::ReputationDetector;
pub use semantic::SemanticDetector;
pub use statistical::StatisticalDetector;
pub use threshold::ThresholdDetector;

/// Everything known about one identity for one decision cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionInput {
    pub identity: String,
    /// `None` when no flow data exists for the identity
    pub features: Option<FeatureVector>,
    pub summary: SourceSummary,
    /// Connection records originating from the identity
    pub batch: Vec<ConnectionRecord>,
}

impl DetectionInput {
    pub fn new(identity: impl Into<String>) -> Self {
        let identity = identity.into();
        Self {
            summary: SourceSummary::new(identity.clone()),
            identity,
            ..Default::default()
        }
    }

    pub fn with_summary(mut self, summary: SourceSummary) -> Self {
        self.summary = summary;
        self
    }

    pub fn with_features(mut self, features: FeatureVector) -> Self {
        self.features = Some(features);
        self
    }

    pub fn with_batch(mut self, batch: Vec<ConnectionRecord>) -> Self {
        self.batch = batch;
        self
    }
}

/// Common detector contract
#[async_trait]
pub trait Detector: Send + Sync {
    fn id(&self) -> &str;

    /// Upper bound the pipeline waits for `classify`
    fn timeout(&self) -> Duration;

    async fn classify(&self, input: &DetectionInput) -> DetectionResult;
}
