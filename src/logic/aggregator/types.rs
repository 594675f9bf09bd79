//! Aggregator Types
//!
//! Per-identity rolling summaries and the matched-attempt records kept for the
//! window report.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::logic::ingest::RawEvent;

// ============================================================================
// SOURCE SUMMARY
// ============================================================================

/// Rolling summary for one source identity within one window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub identity: String,
    /// Matching events observed since the last flush
    pub attempts: u64,
    /// Distinct principals, no duplicates
    #[serde(rename = "users")]
    pub principals: BTreeSet<String>,
    /// Observation order
    pub timestamps: Vec<String>,
}

impl SourceSummary {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            ..Default::default()
        }
    }

    /// Fold one event into the summary
    pub fn record(&mut self, event: &RawEvent) {
        self.attempts += 1;
        if let Some(principal) = &event.principal {
            self.principals.insert(principal.clone());
        }
        self.timestamps.push(event.timestamp.clone());
    }

    pub fn distinct_principals(&self) -> usize {
        self.principals.len()
    }

    pub fn first_seen(&self) -> Option<&str> {
        self.timestamps.first().map(String::as_str)
    }

    pub fn last_seen(&self) -> Option<&str> {
        self.timestamps.last().map(String::as_str)
    }
}

// ============================================================================
// FAILED ATTEMPT
// ============================================================================

/// One matched attempt as it appears in the report's `logs` list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedAttempt {
    pub timestamp: String,
    pub user: Option<String>,
    pub ip: String,
    pub raw: Option<String>,
}

impl From<&RawEvent> for FailedAttempt {
    fn from(event: &RawEvent) -> Self {
        Self {
            timestamp: event.timestamp.clone(),
            user: event.principal.clone(),
            ip: event.source.clone(),
            raw: event.raw_line().map(str::to_string),
        }
    }
}
