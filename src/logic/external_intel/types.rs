//! External Intel Types

use serde::{Deserialize, Serialize};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ReputationError {
    #[error("reputation API key not configured")]
    NotConfigured,
    #[error("not a routable IP address: {0}")]
    InvalidIdentity(String),
    #[error("invalid reputation API key")]
    InvalidApiKey,
    #[error("rate limited, retry after {retry_after}s")]
    RateLimited { retry_after: u64 },
    #[error("reputation request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed reputation response: {0}")]
    Malformed(String),
}

// ============================================================================
// SEVERITY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// >= 90 high, >= 50 medium
    pub fn from_score(score: u8) -> Self {
        if score >= 90 {
            Severity::High
        } else if score >= 50 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

// ============================================================================
// REPORT
// ============================================================================

/// Validated reputation for one IP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReputationReport {
    pub ip: String,
    /// 0-100
    pub score: u8,
    pub total_reports: u32,
    pub is_whitelisted: bool,
    pub country_code: Option<String>,
    pub isp: Option<String>,
    pub last_reported_at: Option<String>,
    /// Distinct category names, first-seen order
    pub categories: Vec<String>,
}

impl ReputationReport {
    pub fn severity(&self) -> Severity {
        Severity::from_score(self.score)
    }

    /// Most severe category, falling back to the first one seen
    pub fn primary_category(&self) -> Option<&str> {
        HIGH_PRIORITY_CATEGORIES
            .iter()
            .find(|c| self.categories.iter().any(|x| x == *c))
            .copied()
            .or_else(|| self.categories.first().map(String::as_str))
    }

    pub fn describe(&self) -> String {
        let mut text = format!("IP {} has abuse score {}/100", self.ip, self.score);
        if let Some(country) = &self.country_code {
            text.push_str(&format!(" from {}", country));
        }
        if self.total_reports > 0 {
            text.push_str(&format!(" with {} reports", self.total_reports));
        }
        if !self.categories.is_empty() {
            text.push_str(&format!(". Categories: {}", self.categories.join(", ")));
        }
        text
    }
}

// ============================================================================
// CATEGORIES
// ============================================================================

const HIGH_PRIORITY_CATEGORIES: &[&str] = &[
    "DDOS_ATTACK",
    "HACKING",
    "SQL_INJECTION",
    "WEB_APP_ATTACK",
    "EXPLOITED_HOST",
    "DNS_COMPROMISE",
    "DNS_POISONING",
];

/// AbuseIPDB report category id -> name
pub fn category_name(id: u32) -> String {
    let name = match id {
        1 => "DNS_COMPROMISE",
        2 => "DNS_POISONING",
        3 => "FRAUD_ORDERS",
        4 => "DDOS_ATTACK",
        5 => "FTP_BRUTE_FORCE",
        6 => "PING_OF_DEATH",
        7 => "PHISHING",
        8 => "FRAUD_VOIP",
        9 => "OPEN_PROXY",
        10 => "WEB_SPAM",
        11 => "EMAIL_SPAM",
        12 => "BLOG_SPAM",
        13 => "VPN_IP",
        14 => "PORT_SCAN",
        15 => "HACKING",
        16 => "SQL_INJECTION",
        17 => "SPOOFING",
        18 => "BRUTE_FORCE",
        19 => "BAD_WEB_BOT",
        20 => "EXPLOITED_HOST",
        21 => "WEB_APP_ATTACK",
        22 => "SSH",
        23 => "IOT_TARGETED",
        other => return format!("CATEGORY_{}", other),
    };
    name.to_string()
}

// ============================================================================
// WIRE FORMAT
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct CheckResponse {
    pub data: CheckData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CheckData {
    pub ip_address: Option<String>,
    pub abuse_confidence_score: Option<i64>,
    #[serde(default)]
    pub total_reports: Option<u32>,
    #[serde(default)]
    pub is_whitelisted: Option<bool>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub isp: Option<String>,
    #[serde(default)]
    pub last_reported_at: Option<String>,
    #[serde(default)]
    pub reports: Vec<ReportEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReportEntry {
    #[serde(default)]
    pub categories: Vec<u32>,
}
