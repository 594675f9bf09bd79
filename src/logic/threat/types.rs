//! Threat Types
//!
//! DetectionResult (one detector, one cycle) and ThreatVerdict (all detectors,
//! one identity, one window).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// FAILURE KIND
// ============================================================================

/// Why a detector abstained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Backend has no credentials / input is outside its domain
    NotConfigured,
    Timeout,
    Network,
    RateLimited,
    MalformedResponse,
    ModelUnavailable,
    ShapeMismatch,
    Backend,
}

impl FailureKind {
    /// Hard = the backend was called and failed. Neutral = it was never usable.
    /// Both abstain; the split only changes how the audit line reads.
    pub fn is_hard(&self) -> bool {
        !matches!(
            self,
            FailureKind::NotConfigured | FailureKind::ModelUnavailable | FailureKind::ShapeMismatch
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::NotConfigured => "not_configured",
            FailureKind::Timeout => "timeout",
            FailureKind::Network => "network",
            FailureKind::RateLimited => "rate_limited",
            FailureKind::MalformedResponse => "malformed_response",
            FailureKind::ModelUnavailable => "model_unavailable",
            FailureKind::ShapeMismatch => "shape_mismatch",
            FailureKind::Backend => "backend",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ANOMALY CATEGORY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AnomalyCategory {
    #[default]
    None,
    KnownBadReputation,
    BruteForce,
    PortScan,
    DosAttack,
    DataExfiltration,
    MalwareC2,
    StatisticalAnomaly,
    Other,
    /// Detector abstained; see `DetectionResult::failure`
    Unavailable,
}

impl AnomalyCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyCategory::None => "none",
            AnomalyCategory::KnownBadReputation => "known-bad-reputation",
            AnomalyCategory::BruteForce => "brute-force",
            AnomalyCategory::PortScan => "port-scan",
            AnomalyCategory::DosAttack => "dos-attack",
            AnomalyCategory::DataExfiltration => "data-exfiltration",
            AnomalyCategory::MalwareC2 => "malware-c2",
            AnomalyCategory::StatisticalAnomaly => "statistical-anomaly",
            AnomalyCategory::Other => "other",
            AnomalyCategory::Unavailable => "unavailable",
        }
    }

    /// Map a free-form attack label ("port_scan", "DDoS", "Brute Force", ...)
    pub fn from_label(label: &str) -> Self {
        let key: String = label
            .trim()
            .to_ascii_lowercase()
            .chars()
            .map(|c| if c == ' ' || c == '-' { '_' } else { c })
            .collect();

        match key.as_str() {
            "" | "none" | "normal" | "benign" => AnomalyCategory::None,
            "port_scan" | "port_scanning" | "portscan" => AnomalyCategory::PortScan,
            "ddos" | "dos" | "dos_attack" | "ddos_attack" => AnomalyCategory::DosAttack,
            "brute_force" | "bruteforce" | "ssh_brute_force" => AnomalyCategory::BruteForce,
            "data_exfiltration" | "exfiltration" => AnomalyCategory::DataExfiltration,
            "malware_c2" | "c2" | "c2_communication" | "command_and_control" => AnomalyCategory::MalwareC2,
            "known_bad_reputation" | "bad_reputation" => AnomalyCategory::KnownBadReputation,
            _ => AnomalyCategory::Other,
        }
    }
}

impl std::fmt::Display for AnomalyCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// DETECTION RESULT
// ============================================================================

/// Output of a single detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub detector_id: String,
    pub is_anomaly: bool,
    /// 0.0 - 1.0
    pub confidence: f64,
    pub category: AnomalyCategory,
    pub description: String,
    /// Set when the detector abstained
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl DetectionResult {
    pub fn anomaly(
        detector_id: &str,
        confidence: f64,
        category: AnomalyCategory,
        description: impl Into<String>,
    ) -> Self {
        Self {
            detector_id: detector_id.to_string(),
            is_anomaly: true,
            confidence: clamp_confidence(confidence),
            category,
            description: description.into(),
            failure: None,
        }
    }

    pub fn benign(detector_id: &str, confidence: f64, description: impl Into<String>) -> Self {
        Self {
            detector_id: detector_id.to_string(),
            is_anomaly: false,
            confidence: clamp_confidence(confidence),
            category: AnomalyCategory::None,
            description: description.into(),
            failure: None,
        }
    }

    /// Neutral/failed result: never anomalous, zero confidence
    pub fn abstain(detector_id: &str, kind: FailureKind, description: impl Into<String>) -> Self {
        Self {
            detector_id: detector_id.to_string(),
            is_anomaly: false,
            confidence: 0.0,
            category: AnomalyCategory::Unavailable,
            description: description.into(),
            failure: Some(kind),
        }
    }

    pub fn is_abstention(&self) -> bool {
        self.failure.is_some()
    }
}

/// NaN collapses to 0
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

// ============================================================================
// THREAT VERDICT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictStatus {
    Anomalous,
    Benign,
    /// Every detector abstained
    Unknown,
}

impl VerdictStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictStatus::Anomalous => "anomalous",
            VerdictStatus::Benign => "benign",
            VerdictStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatVerdict {
    pub identity: String,
    pub window: u64,
    pub status: VerdictStatus,
    pub confidence: f64,
    /// Detectors that took part in the decision, sorted
    pub contributing_detectors: Vec<String>,
    pub category: AnomalyCategory,
    pub description: String,
    /// (detector id, failure kind) for every abstaining detector, sorted
    pub abstentions: Vec<(String, FailureKind)>,
    pub decided_at: DateTime<Utc>,
}

impl ThreatVerdict {
    pub fn is_anomaly(&self) -> bool {
        self.status == VerdictStatus::Anomalous
    }

    pub fn is_unknown(&self) -> bool {
        self.status == VerdictStatus::Unknown
    }

    /// Same verdict rebound to an identity/window
    pub fn for_identity(mut self, identity: impl Into<String>, window: u64) -> Self {
        self.identity = identity.into();
        self.window = window;
        self
    }
}
