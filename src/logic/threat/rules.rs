//! Decision Rules
//!
//! Detector ids and per-detector activation thresholds.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::types::DetectionResult;

// ============================================================================
// DETECTOR IDS
// ============================================================================

pub const REPUTATION_DETECTOR: &str = "reputation";
pub const STATISTICAL_DETECTOR: &str = "statistical";
pub const SEMANTIC_DETECTOR: &str = "semantic";
pub const THRESHOLD_DETECTOR: &str = "threshold";

// ============================================================================
// THRESHOLDS
// ============================================================================

/// Reputation score 25/100, normalized
pub const REPUTATION_ACTIVATION: f64 = 0.25;

/// Raw class probability for the other detectors
pub const DEFAULT_ACTIVATION: f64 = 0.5;

/// Per-detector activation thresholds. A result activates when it is anomalous
/// and its confidence is strictly above its detector's threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionPolicy {
    pub thresholds: BTreeMap<String, f64>,
    /// Used for detector ids without an explicit entry
    pub default_threshold: f64,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ACTIVATION)
            .with_threshold(REPUTATION_DETECTOR, REPUTATION_ACTIVATION)
            .with_threshold(STATISTICAL_DETECTOR, DEFAULT_ACTIVATION)
            .with_threshold(SEMANTIC_DETECTOR, DEFAULT_ACTIVATION)
            .with_threshold(THRESHOLD_DETECTOR, DEFAULT_ACTIVATION)
    }
}

impl DecisionPolicy {
    pub fn new(default_threshold: f64) -> Self {
        Self {
            thresholds: BTreeMap::new(),
            default_threshold,
        }
    }

    pub fn with_threshold(mut self, detector_id: &str, threshold: f64) -> Self {
        self.thresholds.insert(detector_id.to_string(), threshold);
        self
    }

    pub fn threshold_for(&self, detector_id: &str) -> f64 {
        self.thresholds
            .get(detector_id)
            .copied()
            .unwrap_or(self.default_threshold)
    }

    pub fn is_activated(&self, result: &DetectionResult) -> bool {
        !result.is_abstention()
            && result.is_anomaly
            && result.confidence > self.threshold_for(&result.detector_id)
    }
}
