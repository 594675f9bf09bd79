//! Features Module - Fixed-schema vectors from schema-less input
//!
//! ## Structure
//! - `layout`: the 54-field schema (names, order, version, hash)
//! - `vector`: FeatureVector
//! - `normalize`: mapping -> FeatureVector (total, pure)
//! - `traffic`: ConnectionRecord -> flow field mapping

pub mod layout;
pub mod normalize;
pub mod traffic;
pub mod vector;


pub use layout::{feature_index, layout_hash, FEATURE_COUNT, FEATURE_LAYOUT, FEATURE_VERSION, FIELD_DEFAULT};
pub use normalize::{missing_fields, normalize, normalize_json};
pub use traffic::{derive_fields, merge_records};
pub use vector::FeatureVector;
