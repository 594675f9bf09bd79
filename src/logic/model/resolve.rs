//! Model Resolution
//!
//! Walks an ordered list of model sources once and caches the outcome for the
//! lifetime of the resolver. A source is skipped when the file is missing,
//! its digest does not match, or its sidecar declares a different feature count.

use std::path::Path;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use sha2::{Digest, Sha256};

use super::onnx::OnnxClassifier;
use super::types::{InferenceError, ModelSidecar, ModelSource};
use super::ClassifierBackend;
use crate::logic::features::FEATURE_COUNT;

pub type SharedBackend = Arc<dyn ClassifierBackend>;

type Loader = dyn Fn(&Path, ModelSidecar) -> Result<SharedBackend, InferenceError> + Send + Sync;

pub struct ModelResolver {
    sources: Vec<ModelSource>,
    loader: Box<Loader>,
    outcome: OnceCell<Result<SharedBackend, InferenceError>>,
}

impl ModelResolver {
    /// Resolver that loads ONNX models
    pub fn new(sources: Vec<ModelSource>) -> Self {
        Self::with_loader(sources, |path, sidecar| {
            OnnxClassifier::load(path, sidecar).map(|m| Arc::new(m) as SharedBackend)
        })
    }

    pub fn with_loader<F>(sources: Vec<ModelSource>, loader: F) -> Self
    where
        F: Fn(&Path, ModelSidecar) -> Result<SharedBackend, InferenceError> + Send + Sync + 'static,
    {
        Self {
            sources,
            loader: Box::new(loader),
            outcome: OnceCell::new(),
        }
    }

    /// Resolver with an already-loaded backend
    pub fn preloaded(backend: SharedBackend) -> Self {
        let resolver = Self::with_loader(Vec::new(), |_, _| Err(InferenceError::NoModel));
        let _ = resolver.outcome.set(Ok(backend));
        resolver
    }

    pub fn sources(&self) -> &[ModelSource] {
        &self.sources
    }

    /// Resolve (first call only) and return the cached outcome
    pub fn get(&self) -> Result<SharedBackend, InferenceError> {
        self.outcome.get_or_init(|| self.resolve()).clone()
    }

    pub fn is_resolved(&self) -> bool {
        self.outcome.get().is_some()
    }

    fn resolve(&self) -> Result<SharedBackend, InferenceError> {
        let mut shape_error = None;

        for source in &self.sources {
            match self.try_source(source) {
                Ok(backend) => {
                    log::info!("Statistical model resolved: {}", source.path.display());
                    return Ok(backend);
                }
                Err(e @ InferenceError::ShapeMismatch { .. }) => {
                    log::warn!("Skipping model {}: {}", source.path.display(), e);
                    shape_error = Some(e);
                }
                Err(InferenceError::NotFound(path)) => {
                    log::debug!("Model candidate not present: {}", path);
                }
                Err(e) => {
                    log::warn!("Skipping model {}: {}", source.path.display(), e);
                }
            }
        }

        log::warn!("No statistical model could be loaded from {} candidates", self.sources.len());
        Err(shape_error.unwrap_or(InferenceError::NoModel))
    }

    fn try_source(&self, source: &ModelSource) -> Result<SharedBackend, InferenceError> {
        let path = source.path.as_path();
        if !path.is_file() {
            return Err(InferenceError::NotFound(path.display().to_string()));
        }

        if let Some(expected) = &source.sha256 {
            let actual = file_sha256(path)?;
            if !actual.eq_ignore_ascii_case(expected.trim()) {
                return Err(InferenceError::Checksum {
                    path: path.display().to_string(),
                    expected: expected.clone(),
                    actual,
                });
            }
        }

        let sidecar = read_sidecar(source)?;
        if sidecar.n_features != FEATURE_COUNT {
            return Err(InferenceError::ShapeMismatch {
                expected: FEATURE_COUNT,
                actual: sidecar.n_features,
            });
        }

        let backend = (self.loader)(path, sidecar)?;
        if backend.n_features() != FEATURE_COUNT {
            return Err(InferenceError::ShapeMismatch {
                expected: FEATURE_COUNT,
                actual: backend.n_features(),
            });
        }
        Ok(backend)
    }
}

/// Hex SHA-256 of a file
pub fn file_sha256(path: &Path) -> Result<String, InferenceError> {
    let bytes = std::fs::read(path).map_err(|e| InferenceError::Load(e.to_string()))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

fn read_sidecar(source: &ModelSource) -> Result<ModelSidecar, InferenceError> {
    let path = source.sidecar_path();
    if !path.is_file() {
        return Ok(ModelSidecar::default());
    }
    let text = std::fs::read_to_string(&path).map_err(|e| InferenceError::Load(e.to_string()))?;
    serde_json::from_str(&text)
        .map_err(|e| InferenceError::Load(format!("sidecar {}: {}", path.display(), e)))
}
