//! Threat Module
//!
//! Turns several uncertain detector outputs into one verdict per identity and
//! window: Anomalous, Benign, or Unknown (nothing could check).
//!
//! ## Structure
//! - `types`: DetectionResult, ThreatVerdict, FailureKind, AnomalyCategory
//! - `rules`: detector ids and activation thresholds
//! - `engine`: `decide` / `decide_for`
//!
//! ## Usage
//! ```ignore
//! use crate::logic::threat::{decide_for, DecisionPolicy};
//!
//! let verdict = decide_for("10.0.0.5", window, &results, &DecisionPolicy::default());
//! if verdict.is_unknown() {
//!     // audit only, no containment
//! }
//! ```

pub mod engine;
pub mod rules;
pub mod types;

#[cfg(test)]
mod tests;

pub use engine::{decide, decide_for};
pub use rules::{
    DecisionPolicy, DEFAULT_ACTIVATION, REPUTATION_ACTIVATION, REPUTATION_DETECTOR,
    SEMANTIC_DETECTOR, STATISTICAL_DETECTOR, THRESHOLD_DETECTOR,
};
pub use types::{
    clamp_confidence, AnomalyCategory, DetectionResult, FailureKind, ThreatVerdict, VerdictStatus,
};
