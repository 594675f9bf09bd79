//! Logic Module - Detection & Containment Engines
//!
//! ## Flow
//! ingest -> aggregator -> detectors (fan-out) -> threat (decide) -> response -> telemetry
//!
//! - `ingest/` - RawEvents, connection records, triggers
//! - `features/` - 54-field FeatureVector
//! - `aggregator/` - per-identity SourceSummary
//! - `detectors/` - reputation, statistical, semantic, threshold
//! - `threat/` - DetectionResult, ThreatVerdict, decision policy
//! - `pipeline/` - per-identity decision cycles

pub mod config;

pub mod ingest;
pub mod features;
pub mod aggregator;

// Backends
pub mod external_intel;
pub mod model;
pub mod llm;

pub mod detectors;
pub mod threat;
pub mod response;
pub mod telemetry;
pub mod pipeline;
