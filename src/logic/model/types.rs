//! Model Types

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::logic::features::FEATURE_COUNT;

/// Default positive class of the random-forest classifier
pub const DEFAULT_ANOMALY_CLASS: i64 = 1;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum InferenceError {
    #[error("model not found: {0}")]
    NotFound(String),
    #[error("checksum mismatch for {path}: expected {expected}, got {actual}")]
    Checksum {
        path: String,
        expected: String,
        actual: String,
    },
    #[error("feature shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
    #[error("failed to load model: {0}")]
    Load(String),
    #[error("inference failed: {0}")]
    Run(String),
    #[error("no model source could be loaded")]
    NoModel,
}

// ============================================================================
// MODEL SOURCE
// ============================================================================

/// One candidate model location, optionally pinned to a SHA-256 digest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSource {
    pub path: PathBuf,
    pub sha256: Option<String>,
}

impl ModelSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sha256: None,
        }
    }

    pub fn with_sha256(mut self, digest: impl Into<String>) -> Self {
        self.sha256 = Some(digest.into());
        self
    }

    /// `<model>.json` next to the model file
    pub fn sidecar_path(&self) -> PathBuf {
        let mut raw = self.path.as_os_str().to_owned();
        raw.push(".json");
        PathBuf::from(raw)
    }
}

/// Optional metadata written next to the model at export time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSidecar {
    #[serde(default = "default_n_features")]
    pub n_features: usize,
    #[serde(default = "default_anomaly_class")]
    pub anomaly_class: i64,
}

fn default_n_features() -> usize {
    FEATURE_COUNT
}

fn default_anomaly_class() -> i64 {
    DEFAULT_ANOMALY_CLASS
}

impl Default for ModelSidecar {
    fn default() -> Self {
        Self {
            n_features: FEATURE_COUNT,
            anomaly_class: DEFAULT_ANOMALY_CLASS,
        }
    }
}

// ============================================================================
// PREDICTION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassPrediction {
    pub class: i64,
    /// Probability of the predicted class
    pub probability: f64,
    pub probabilities: Vec<f32>,
}

impl ClassPrediction {
    /// Build from a class-probability row; predicted class = argmax
    pub fn from_probabilities(probabilities: Vec<f32>) -> Option<Self> {
        let (idx, p) = probabilities
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_finite())
            .max_by(|a, b| a.1.total_cmp(b.1))?;
        Some(Self {
            class: idx as i64,
            probability: *p as f64,
            probabilities,
        })
    }
}
