//! Semantic Response Schemas
//!
//! The backend is asked for JSON of a fixed shape per use-case. Nothing it
//! returns is trusted until it passes the matching `parse_*` check: required
//! keys present with the right type, confidence within [0, 1], and bounded
//! values for severity / risk level.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum SchemaError {
    #[error("not valid JSON: {0}")]
    NotJson(String),
    #[error("top-level value is not an object")]
    NotObject,
    #[error("missing key `{0}`")]
    Missing(&'static str),
    #[error("key `{key}` is not a {expected}")]
    WrongType {
        key: &'static str,
        expected: &'static str,
    },
    #[error("key `{key}` out of range: {value}")]
    OutOfRange { key: &'static str, value: f64 },
    #[error("key `{key}` has unexpected value {value:?}")]
    UnexpectedValue { key: &'static str, value: String },
}

// ============================================================================
// BOUNDED VALUES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticSeverity {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl SemanticSeverity {
    fn parse(key: &'static str, raw: &str) -> Result<Self, SchemaError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "none" | "n/a" => Ok(Self::None),
            "low" => Ok(Self::Low),
            "medium" | "moderate" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(SchemaError::UnexpectedValue {
                key,
                value: raw.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityClass {
    Normal,
    Suspicious,
    Malicious,
}

impl ActivityClass {
    fn parse(raw: &str) -> Result<Self, SchemaError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "normal" | "benign" => Ok(Self::Normal),
            "suspicious" => Ok(Self::Suspicious),
            "malicious" => Ok(Self::Malicious),
            _ => Err(SchemaError::UnexpectedValue {
                key: "classification",
                value: raw.to_string(),
            }),
        }
    }
}

// ============================================================================
// RESPONSE TYPES
// ============================================================================

/// Traffic-pattern analysis (used by the semantic detector)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficAnalysis {
    pub anomaly_detected: bool,
    pub confidence: f64,
    pub anomaly_type: Option<String>,
    pub description: String,
    pub severity: SemanticSeverity,
    pub source_ips: Vec<String>,
    pub target_ips: Vec<String>,
    pub recommended_action: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityClassification {
    pub classification: ActivityClass,
    pub anomaly_detected: bool,
    pub pattern_description: String,
    pub severity: SemanticSeverity,
    pub recommended_action: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacketAnalysis {
    pub threats_detected: bool,
    pub analysis: String,
    pub techniques: Vec<String>,
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatReport {
    pub summary: String,
    pub risk_level: SemanticSeverity,
    pub detailed_findings: Vec<String>,
    pub remediation_steps: Vec<String>,
    pub prevention_guidance: Vec<String>,
}

// ============================================================================
// PARSERS
// ============================================================================

pub fn parse_traffic_analysis(text: &str) -> Result<TrafficAnalysis, SchemaError> {
    let obj = object(text)?;
    Ok(TrafficAnalysis {
        anomaly_detected: req_bool(&obj, "anomaly_detected")?,
        confidence: req_confidence(&obj, "confidence")?,
        anomaly_type: opt_str(&obj, "anomaly_type")?,
        description: req_str(&obj, "description")?,
        severity: SemanticSeverity::parse("severity", &req_str(&obj, "severity")?)?,
        source_ips: opt_list(&obj, "source_ips")?,
        target_ips: opt_list(&obj, "target_ips")?,
        recommended_action: req_str(&obj, "recommended_action")?,
    })
}

pub fn parse_activity_classification(text: &str) -> Result<ActivityClassification, SchemaError> {
    let obj = object(text)?;
    Ok(ActivityClassification {
        classification: ActivityClass::parse(&req_str(&obj, "classification")?)?,
        anomaly_detected: req_bool(&obj, "anomaly_detected")?,
        pattern_description: req_str(&obj, "pattern_description")?,
        severity: SemanticSeverity::parse("severity", &req_str(&obj, "severity")?)?,
        recommended_action: req_str(&obj, "recommended_action")?,
        confidence: req_confidence(&obj, "confidence")?,
    })
}

pub fn parse_packet_analysis(text: &str) -> Result<PacketAnalysis, SchemaError> {
    let obj = object(text)?;
    let confidence = match obj.get("confidence") {
        None | Some(Value::Null) => None,
        Some(_) => Some(req_confidence(&obj, "confidence")?),
    };
    Ok(PacketAnalysis {
        threats_detected: req_bool(&obj, "threats_detected")?,
        analysis: req_str(&obj, "analysis")?,
        techniques: opt_list(&obj, "techniques")?,
        confidence,
    })
}

pub fn parse_threat_report(text: &str) -> Result<ThreatReport, SchemaError> {
    let obj = object(text)?;
    Ok(ThreatReport {
        summary: req_str(&obj, "summary")?,
        risk_level: SemanticSeverity::parse("risk_level", &req_str(&obj, "risk_level")?)?,
        detailed_findings: req_list(&obj, "detailed_findings")?,
        remediation_steps: req_list(&obj, "remediation_steps")?,
        prevention_guidance: req_list(&obj, "prevention_guidance")?,
    })
}

// ============================================================================
// HELPERS
// ============================================================================

fn object(text: &str) -> Result<Map<String, Value>, SchemaError> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(SchemaError::NotObject),
        Err(e) => Err(SchemaError::NotJson(e.to_string())),
    }
}

fn req<'a>(obj: &'a Map<String, Value>, key: &'static str) -> Result<&'a Value, SchemaError> {
    match obj.get(key) {
        None | Some(Value::Null) => Err(SchemaError::Missing(key)),
        Some(v) => Ok(v),
    }
}

fn req_bool(obj: &Map<String, Value>, key: &'static str) -> Result<bool, SchemaError> {
    req(obj, key)?.as_bool().ok_or(SchemaError::WrongType {
        key,
        expected: "boolean",
    })
}

fn req_str(obj: &Map<String, Value>, key: &'static str) -> Result<String, SchemaError> {
    req(obj, key)?
        .as_str()
        .map(str::to_string)
        .ok_or(SchemaError::WrongType {
            key,
            expected: "string",
        })
}

fn opt_str(obj: &Map<String, Value>, key: &'static str) -> Result<Option<String>, SchemaError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(SchemaError::WrongType {
            key,
            expected: "string",
        }),
    }
}

fn req_confidence(obj: &Map<String, Value>, key: &'static str) -> Result<f64, SchemaError> {
    let value = req(obj, key)?.as_f64().ok_or(SchemaError::WrongType {
        key,
        expected: "number",
    })?;
    if !(0.0..=1.0).contains(&value) {
        return Err(SchemaError::OutOfRange { key, value });
    }
    Ok(value)
}

fn list(value: &Value, key: &'static str) -> Result<Vec<String>, SchemaError> {
    let wrong = SchemaError::WrongType {
        key,
        expected: "list of strings",
    };
    let items = value.as_array().ok_or_else(|| wrong.clone())?;
    items
        .iter()
        .map(|item| match item {
            Value::String(s) => Ok(s.clone()),
            // findings are sometimes objects; keep their JSON text
            Value::Object(_) => Ok(item.to_string()),
            _ => Err(wrong.clone()),
        })
        .collect()
}

fn req_list(obj: &Map<String, Value>, key: &'static str) -> Result<Vec<String>, SchemaError> {
    list(req(obj, key)?, key)
}

fn opt_list(obj: &Map<String, Value>, key: &'static str) -> Result<Vec<String>, SchemaError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(v) => list(v, key),
    }
}
