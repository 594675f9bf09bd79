//! Ingest Types
//!
//! Raw records handed over by the ingestion side. No logic here.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// SCALAR
// ============================================================================

/// A single schema-less field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(f64),
    Bool(bool),
    Text(String),
    Null,
}

impl Scalar {
    /// Numeric view of the value; text is parsed, booleans map to 0/1.
    /// Non-finite numbers and unparsable text yield `None`.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Scalar::Number(n) => *n,
            Scalar::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Scalar::Text(s) => s.trim().parse::<f64>().ok()?,
            Scalar::Null => return None,
        };
        value.is_finite().then_some(value)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Number(v)
    }
}

impl From<u64> for Scalar {
    fn from(v: u64) -> Self {
        Scalar::Number(v as f64)
    }
}

impl From<u16> for Scalar {
    fn from(v: u16) -> Self {
        Scalar::Number(v as f64)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Text(v)
    }
}

impl From<&serde_json::Value> for Scalar {
    fn from(v: &serde_json::Value) -> Self {
        match v {
            serde_json::Value::Number(n) => n.as_f64().map(Scalar::Number).unwrap_or(Scalar::Null),
            serde_json::Value::Bool(b) => Scalar::Bool(*b),
            serde_json::Value::String(s) => Scalar::Text(s.clone()),
            // Arrays/objects are not scalars
            _ => Scalar::Null,
        }
    }
}

/// Generic key -> scalar mapping accepted by the feature normalizer
pub type FieldMap = BTreeMap<String, Scalar>;

// ============================================================================
// RAW EVENT
// ============================================================================

/// One parsed record from a log source. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Source identity (IP address or similar)
    pub source: String,
    /// Timestamp exactly as it appeared in the source (syslog lines carry no year)
    pub timestamp: String,
    /// Principal / user name, if the record has one
    pub principal: Option<String>,
    /// Remaining payload fields
    pub fields: FieldMap,
}

impl RawEvent {
    pub fn new(source: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            timestamp: timestamp.into(),
            principal: None,
            fields: FieldMap::new(),
        }
    }

    pub fn with_principal(mut self, principal: impl Into<String>) -> Self {
        self.principal = Some(principal.into());
        self
    }

    pub fn with_field(mut self, key: &str, value: impl Into<Scalar>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Raw text line, when the event came from a text log
    pub fn raw_line(&self) -> Option<&str> {
        self.fields.get("raw").and_then(Scalar::as_str)
    }
}

// ============================================================================
// CONNECTION RECORD
// ============================================================================

/// One observed connection / flow, as fed to the statistical and semantic detectors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionRecord {
    pub src_ip: String,
    pub src_port: u16,
    pub dst_ip: String,
    pub dst_port: u16,
    /// "tcp", "udp", "icmp", ...
    pub protocol: String,
    pub bytes: u64,
    pub packet_count: u64,
    /// Flow duration in milliseconds
    pub flow_duration_ms: f64,
    pub timestamp: Option<DateTime<Utc>>,
}

impl ConnectionRecord {
    pub fn is_tcp(&self) -> bool {
        self.protocol.eq_ignore_ascii_case("tcp")
    }
}
