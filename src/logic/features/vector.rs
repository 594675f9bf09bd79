//! Feature Vector - Core data structure for ML input
//!
//! **Versioned, fixed-shape feature vector**
//!
//! Values are stored in the order defined by `FEATURE_LAYOUT`. The only way to
//! build one from arbitrary input is `normalize`, so every vector downstream
//! is complete.

use serde::{Deserialize, Serialize};

use super::layout::{
    feature_index, layout_hash, validate_layout, LayoutMismatchError, FEATURE_COUNT,
    FEATURE_LAYOUT, FEATURE_VERSION, FIELD_DEFAULT,
};
use crate::logic::ingest::{FieldMap, Scalar};

// ============================================================================
// VERSIONED FEATURE VECTOR
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Feature layout version
    pub version: u8,
    /// CRC32 hash of the feature layout (for mismatch detection)
    pub layout_hash: u32,
    /// Always exactly FEATURE_COUNT entries
    values: Vec<f64>,
}

impl FeatureVector {
    /// Vector with every field at its default
    pub fn new() -> Self {
        Self {
            version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            values: vec![FIELD_DEFAULT; FEATURE_COUNT],
        }
    }

    /// Build from ordered values; extra values are dropped, missing ones defaulted
    pub fn from_values(values: &[f64]) -> Self {
        let mut vector = Self::new();
        for (slot, v) in vector.values.iter_mut().zip(values.iter()) {
            *slot = *v;
        }
        vector
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get feature by index
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    /// Get feature by name
    pub fn get_by_name(&self, name: &str) -> Option<f64> {
        feature_index(name).and_then(|i| self.get(i))
    }

    /// Values as f32, the tensor type of the ONNX model
    pub fn to_f32(&self) -> Vec<f32> {
        self.values.iter().map(|v| *v as f32).collect()
    }

    /// Named mapping of the vector, in layout order
    pub fn to_field_map(&self) -> FieldMap {
        FEATURE_LAYOUT
            .iter()
            .zip(self.values.iter())
            .map(|(name, value)| (name.to_string(), Scalar::Number(*value)))
            .collect()
    }

    /// Validate that this vector is compatible with current layout
    pub fn validate(&self) -> Result<(), LayoutMismatchError> {
        validate_layout(self.version, self.layout_hash)?;
        if self.values.len() != FEATURE_COUNT {
            return Err(LayoutMismatchError {
                expected_version: FEATURE_VERSION,
                actual_version: self.version,
                expected_hash: layout_hash(),
                actual_hash: self.layout_hash,
            });
        }
        Ok(())
    }

    pub fn is_compatible(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn feature_names(&self) -> &'static [&'static str] {
        FEATURE_LAYOUT
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self::new()
    }
}
