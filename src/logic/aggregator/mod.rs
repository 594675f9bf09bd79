//! Aggregator Module - Per-identity rolling summaries
//!
//! # Components
//! - `types.rs`: SourceSummary, FailedAttempt
//! - `store.rs`: sharded Aggregator (`observe`, `flush`)
//! - `report.rs`: WindowReport written at window boundary

pub mod report;
pub mod store;
pub mod types;


pub use report::{ReportError, WindowReport};
pub use store::Aggregator;
pub use types::{FailedAttempt, SourceSummary};
