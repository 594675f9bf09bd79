//! External Intelligence Module - IP reputation lookups
//!
//! # Components
//! - `types.rs`: ReputationReport, Severity, ReputationError, category map
//! - `abuseipdb.rs`: AbuseIPDB `/check` client

pub mod abuseipdb;
pub mod types;

use async_trait::async_trait;

pub use abuseipdb::{parse_check_response, AbuseIpDbClient};
pub use types::{category_name, ReputationError, ReputationReport, Severity};

/// Seam for reputation backends
#[async_trait]
pub trait ReputationLookup: Send + Sync {
    async fn check(&self, ip: &str) -> Result<ReputationReport, ReputationError>;
}
