//! Pipeline Module - Per-identity decision cycles
//!
//! # Components
//! - `cycle.rs`: detector fan-out, reconciliation, supersession, containment, audit
//! - `input.rs`: DetectionInput assembly from summaries and connection records

pub mod cycle;
pub mod input;

#[cfg(test)]
mod tests;

pub use cycle::{CycleReport, Pipeline, PipelineError};
pub use input::detection_input;
