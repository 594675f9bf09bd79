//! Response Module - Containment of anomalous identities
//!
//! # Components
//! - `enforcer.rs`: `EnforcementPoint` trait, SSH router enforcer, dry-run enforcer
//! - `executor.rs`: `ResponseExecutor` with per-window idempotency
//! - `types.rs`: ResponseRecord, ResponseAction, EnforcementError

pub mod enforcer;
pub mod executor;
pub mod types;

#[cfg(test)]
mod tests;

pub use enforcer::{validate_duration, DryRunEnforcer, EnforcementPoint, SshEnforcer};
pub use executor::ResponseExecutor;
pub use types::{EnforcementError, ResponseAction, ResponseRecord};
