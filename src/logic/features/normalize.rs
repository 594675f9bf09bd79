//! Feature Normalizer
//!
//! The single chokepoint from schema-less input to a fixed-shape vector.
//! Total over any mapping: absent or non-numeric fields become FIELD_DEFAULT.

use super::layout::{FEATURE_LAYOUT, FIELD_DEFAULT};
use super::vector::FeatureVector;
use crate::logic::ingest::{FieldMap, Scalar};

/// Normalize an arbitrary field mapping into the canonical vector.
///
/// Keys outside the schema are ignored. Pure; never fails.
pub fn normalize(fields: &FieldMap) -> FeatureVector {
    let values: Vec<f64> = FEATURE_LAYOUT
        .iter()
        .map(|name| {
            fields
                .get(*name)
                .and_then(Scalar::as_f64)
                .unwrap_or(FIELD_DEFAULT)
        })
        .collect();

    FeatureVector::from_values(&values)
}

/// Like `normalize`, but over a JSON object (anything else yields all defaults)
pub fn normalize_json(value: &serde_json::Value) -> FeatureVector {
    let fields: FieldMap = value
        .as_object()
        .map(|obj| obj.iter().map(|(k, v)| (k.clone(), Scalar::from(v))).collect())
        .unwrap_or_default();
    normalize(&fields)
}

/// Names of schema fields the mapping did not supply with a usable number
pub fn missing_fields(fields: &FieldMap) -> Vec<&'static str> {
    FEATURE_LAYOUT
        .iter()
        .copied()
        .filter(|name| fields.get(*name).and_then(Scalar::as_f64).is_none())
        .collect()
}
