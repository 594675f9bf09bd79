//! Window Report
//!
//! Structured artifact produced once per aggregation window: total matched
//! attempts, per-identity summaries, and every matched attempt in stream order.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{FailedAttempt, SourceSummary};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("cannot write report {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowReport {
    pub window_id: u64,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub host: String,
    pub total_failed_attempts: u64,
    pub ip_summary: BTreeMap<String, SourceSummary>,
    pub logs: Vec<FailedAttempt>,
}

impl WindowReport {
    pub fn build(
        window_id: u64,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        summaries: Vec<SourceSummary>,
        logs: Vec<FailedAttempt>,
    ) -> Self {
        let total_failed_attempts = summaries.iter().map(|s| s.attempts).sum();
        let ip_summary = summaries
            .into_iter()
            .map(|s| (s.identity.clone(), s))
            .collect();

        Self {
            window_id,
            window_start,
            window_end,
            host: host_name(),
            total_failed_attempts,
            ip_summary,
            logs,
        }
    }

    /// Summaries sorted by identity
    pub fn summaries(self) -> Vec<SourceSummary> {
        self.ip_summary.into_values().collect()
    }

    /// Identities with at least `min_attempts` matched attempts
    pub fn identities_over(&self, min_attempts: u64) -> Vec<&SourceSummary> {
        self.ip_summary
            .values()
            .filter(|s| s.attempts >= min_attempts)
            .collect()
    }

    /// Write as pretty JSON, creating parent directories
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), ReportError> {
        let path = path.as_ref();
        let io_err = |source| ReportError::Io {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(io_err)?;

        log::info!(
            "Report written to {} ({} attempts, {} identities)",
            path.display(),
            self.total_failed_attempts,
            self.ip_summary.len()
        );
        Ok(())
    }
}

fn host_name() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}
