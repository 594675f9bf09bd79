//! Active-response trigger
//!
//! `{"command":"add","parameters":{"alert":{"data":{"srcip":"1.2.3.4"}}}}`

use std::path::Path;

use serde_json::Value;

use super::types::ConnectionRecord;
use super::IngestError;

/// Only "add" triggers a decision cycle
pub const TRIGGER_COMMAND: &str = "add";

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveResponse {
    pub command: String,
    pub srcip: String,
    /// The whole alert object, kept for context
    pub alert: Value,
}

pub fn parse_active_response(input: &str) -> Result<ActiveResponse, IngestError> {
    let value: Value = serde_json::from_str(input.trim())
        .map_err(|e| IngestError::Malformed(format!("trigger is not JSON: {}", e)))?;

    let command = value
        .get("command")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if command != TRIGGER_COMMAND {
        return Err(IngestError::Malformed(format!(
            "unsupported command {:?}",
            command
        )));
    }

    let alert = value
        .pointer("/parameters/alert")
        .cloned()
        .unwrap_or(Value::Null);
    let srcip = alert
        .pointer("/data/srcip")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .ok_or_else(|| IngestError::Malformed("alert has no data.srcip".to_string()))?;

    Ok(ActiveResponse {
        command: command.to_string(),
        srcip: srcip.to_string(),
        alert,
    })
}

/// Connection records from a JSON array file
pub fn read_connection_records(path: impl AsRef<Path>) -> Result<Vec<ConnectionRecord>, IngestError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| IngestError::Open {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text)
        .map_err(|e| IngestError::Malformed(format!("{}: {}", path.display(), e)))
}
