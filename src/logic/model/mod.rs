//! Model Module - Statistical classifier backend
//!
//! Inference is kept behind `ClassifierBackend` so the detector never knows
//! which runtime produced the prediction.

pub mod onnx;
pub mod resolve;
pub mod types;


pub use onnx::OnnxClassifier;
pub use resolve::{file_sha256, ModelResolver, SharedBackend};
pub use types::{ClassPrediction, InferenceError, ModelSidecar, ModelSource, DEFAULT_ANOMALY_CLASS};

/// Trait for binary classifier runtimes (ONNX, stubs in tests, ...)
pub trait ClassifierBackend: Send + Sync {
    fn name(&self) -> &str;
    /// Input width the model was trained on
    fn n_features(&self) -> usize;
    /// Class index that means "anomalous"
    fn anomaly_class(&self) -> i64;
    fn predict(&self, features: &[f32]) -> Result<ClassPrediction, InferenceError>;
}
