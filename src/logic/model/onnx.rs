//! ONNX Classifier Backend
//!
//! Runs an exported binary classifier (label + probability outputs) over one
//! feature row. The session needs `&mut` to run, so it sits behind a mutex.
//!
//! Probabilities must be a float tensor. sklearn-onnx wraps them in a ZipMap
//! (`seq(map(int64, float))`) unless the model is exported with
//! `options={id(clf): {"zipmap": False}}`; such models are refused at load.

use std::path::Path;

use ndarray::Array2;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::{Tensor, ValueType};
use parking_lot::Mutex;

use super::types::{ClassPrediction, InferenceError, ModelSidecar};
use super::ClassifierBackend;

pub struct OnnxClassifier {
    session: Mutex<Session>,
    name: String,
    sidecar: ModelSidecar,
}

impl OnnxClassifier {
    pub fn load(path: &Path, sidecar: ModelSidecar) -> Result<Self, InferenceError> {
        log::info!("Loading ONNX model from: {}", path.display());

        let session = Session::builder()
            .map_err(|e| InferenceError::Load(format!("session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| InferenceError::Load(format!("optimization: {}", e)))?
            .commit_from_file(path)
            .map_err(|e| InferenceError::Load(e.to_string()))?;

        require_tensor_probabilities(
            session
                .outputs()
                .iter()
                .map(|o| (o.name(), o.dtype())),
        )?;

        log::info!("ONNX model loaded ({} outputs)", session.outputs().len());

        Ok(Self {
            session: Mutex::new(session),
            name: path.display().to_string(),
            sidecar,
        })
    }
}

/// sklearn-onnx's default probability output
pub fn is_zipmap(ty: &ValueType) -> bool {
    matches!(ty, ValueType::Sequence(inner) if matches!(**inner, ValueType::Map { .. }))
}

/// Fails when the only probability output is a ZipMap. A label tensor plus a
/// probability tensor is what `predict` reads.
pub fn require_tensor_probabilities<'a>(
    outputs: impl IntoIterator<Item = (&'a str, &'a ValueType)>,
) -> Result<(), InferenceError> {
    let mut tensors = 0;
    let mut zipmaps = Vec::new();
    for (name, ty) in outputs {
        match ty {
            ValueType::Tensor { .. } => tensors += 1,
            ty if is_zipmap(ty) => zipmaps.push(name),
            _ => {}
        }
    }

    if !zipmaps.is_empty() && tensors < 2 {
        log::warn!("Model probabilities are a ZipMap ({}), re-export with zipmap=False", zipmaps.join(", "));
        return Err(InferenceError::Load(format!(
            "probability output {} is a ZipMap seq(map(int64, float)); re-export with zipmap=False",
            zipmaps.join(", ")
        )));
    }
    Ok(())
}

impl ClassifierBackend for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn n_features(&self) -> usize {
        self.sidecar.n_features
    }

    fn anomaly_class(&self) -> i64 {
        self.sidecar.anomaly_class
    }

    fn predict(&self, features: &[f32]) -> Result<ClassPrediction, InferenceError> {
        let expected = self.n_features();
        if features.len() != expected {
            return Err(InferenceError::ShapeMismatch {
                expected,
                actual: features.len(),
            });
        }

        let input = Array2::<f32>::from_shape_vec((1, expected), features.to_vec())
            .map_err(|e| InferenceError::Run(format!("array: {}", e)))?;
        let tensor = Tensor::from_array(input)
            .map_err(|e| InferenceError::Run(format!("tensor: {}", e)))?;

        let mut session = self.session.lock();
        let output_names: Vec<String> = session.outputs().iter().map(|o| o.name().to_string()).collect();

        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| InferenceError::Run(e.to_string()))?;

        // Label output is int64, probability output is float32 [1, n_classes]
        let mut label: Option<i64> = None;
        let mut probabilities: Option<Vec<f32>> = None;
        for name in &output_names {
            let Some(value) = outputs.get(name) else { continue };
            if let Ok(tensor) = value.try_extract_tensor::<i64>() {
                label = label.or_else(|| tensor.1.first().copied());
            } else if let Ok(tensor) = value.try_extract_tensor::<f32>() {
                probabilities = probabilities.or_else(|| Some(tensor.1.to_vec()));
            }
        }

        let probabilities = probabilities
            .ok_or_else(|| InferenceError::Run("model has no probability output".to_string()))?;

        match label {
            Some(class) => {
                let probability = usize::try_from(class)
                    .ok()
                    .and_then(|i| probabilities.get(i))
                    .copied()
                    .ok_or_else(|| InferenceError::Run(format!("label {} outside probabilities", class)))?;
                Ok(ClassPrediction {
                    class,
                    probability: probability as f64,
                    probabilities,
                })
            }
            None => ClassPrediction::from_probabilities(probabilities)
                .ok_or_else(|| InferenceError::Run("empty probability output".to_string())),
        }
    }
}
