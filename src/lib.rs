//! ThreatWatch Core
//!
//! Authentication/network threat detection: aggregate failed logins per
//! source, ask several independent detectors, reconcile their answers into
//! one verdict and contain the source on the router when warranted.

pub mod constants;
pub mod logic;
