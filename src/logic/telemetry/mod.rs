//! Telemetry Module
//!
//! The audit trail operators read to tell "checked, clean" from
//! "could not check". Operational diagnostics go through `log` instead.
//!
//! ## Structure
//! - `audit.rs` - AuditSink trait, append-only file sink, in-memory sink

pub mod audit;

pub use audit::{format_line, AuditError, AuditSink, FileAuditSink, MemoryAuditSink, AUDIT_TAG};
