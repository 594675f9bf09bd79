//! Response Types

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// RESPONSE RECORD
// ============================================================================

/// What the executor did for one decision cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseAction {
    /// Containment command accepted by the enforcement point
    Blocked,
    /// Identity already contained in the current audit window
    Skipped,
    /// Enforcement point rejected or never received the command
    Failed,
    /// Cycle superseded before it could act
    Abandoned,
    /// Verdict did not call for containment
    NoAction,
}

impl ResponseAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseAction::Blocked => "blocked",
            ResponseAction::Skipped => "skipped",
            ResponseAction::Failed => "failed",
            ResponseAction::Abandoned => "abandoned",
            ResponseAction::NoAction => "no_action",
        }
    }
}

impl std::fmt::Display for ResponseAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub identity: String,
    pub action: ResponseAction,
    pub reason: String,
    pub recorded_at: DateTime<Utc>,
}

impl ResponseRecord {
    pub fn new(identity: impl Into<String>, action: ResponseAction, reason: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            action,
            reason: reason.into(),
            recorded_at: Utc::now(),
        }
    }

    pub fn abandoned(identity: impl Into<String>) -> Self {
        Self::new(identity, ResponseAction::Abandoned, "superseded by a newer cycle")
    }

    /// One audit line for this outcome
    pub fn audit_message(&self) -> String {
        format!("{} {}: {}", self.action, self.identity, self.reason)
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum EnforcementError {
    #[error("identity {0:?} is not an IP address")]
    InvalidIdentity(String),

    #[error("invalid block timeout {0:?}")]
    InvalidTimeout(String),

    #[error("could not start remote command: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("enforcement point did not answer within {0:?}")]
    Timeout(Duration),

    #[error("remote command failed (exit {status:?}): {stderr}")]
    CommandFailed { status: Option<i32>, stderr: String },
}
