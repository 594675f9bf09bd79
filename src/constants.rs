//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! `PipelineConfig::from_env` reads the environment through the helpers below.

/// App name (prefix of every audit line)
pub const APP_NAME: &str = "threatwatch";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// REPUTATION (AbuseIPDB)
// ============================================================================

pub const DEFAULT_ABUSEIPDB_URL: &str = "https://api.abuseipdb.com/api/v2/check";

/// Look back over reports from the last N days
pub const DEFAULT_MAX_AGE_DAYS: u32 = 90;

/// Confidence score threshold (0-100)
pub const DEFAULT_REPUTATION_THRESHOLD: u8 = 25;

pub const DEFAULT_REPUTATION_TIMEOUT_SECS: u64 = 5;

pub const DEFAULT_REPUTATION_CACHE_TTL_SECS: u64 = 3600;

pub const DEFAULT_REPUTATION_RATE_LIMIT: u32 = 60;

// ============================================================================
// STATISTICAL MODEL
// ============================================================================

/// Ordered candidate locations; first successful load wins
pub const DEFAULT_MODEL_PATHS: &str =
    "rf_model.onnx,./server/assets/rf_model.onnx,./attached_assets/rf_model.onnx";

pub const DEFAULT_STATISTICAL_THRESHOLD: f64 = 0.5;

pub const DEFAULT_STATISTICAL_TIMEOUT_SECS: u64 = 5;

// ============================================================================
// SEMANTIC (LLM)
// ============================================================================

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

pub const DEFAULT_SEMANTIC_THRESHOLD: f64 = 0.5;

pub const DEFAULT_SEMANTIC_TIMEOUT_SECS: u64 = 30;

/// Max records submitted per semantic call
pub const DEFAULT_SEMANTIC_SAMPLE_SIZE: usize = 100;

// ============================================================================
// ENFORCEMENT (MikroTik via SSH)
// ============================================================================

pub const DEFAULT_ROUTER_HOST: &str = "192.168.1.1";

pub const DEFAULT_ROUTER_USER: &str = "wazuh";

pub const DEFAULT_ROUTER_SSH_KEY: &str = "/var/ossec/.ssh/id_rsa";

pub const DEFAULT_BLOCK_LIST_NAME: &str = "blocked-by-wazuh";

/// RouterOS duration syntax
pub const DEFAULT_BLOCK_TIMEOUT: &str = "90d";

pub const DEFAULT_ENFORCEMENT_TIMEOUT_SECS: u64 = 30;

/// Global confidence a verdict must exceed before containment runs
pub const DEFAULT_ACTION_THRESHOLD: f64 = 0.25;

// ============================================================================
// AUDIT / REPORT / RULES
// ============================================================================

pub const DEFAULT_AUDIT_LOG_PATH: &str = "/var/ossec/logs/active-responses.log";

/// Span during which an identity counts as "already blocked"
pub const DEFAULT_AUDIT_WINDOW_SECS: u64 = 86_400;

pub const DEFAULT_REPORT_PATH: &str = "reports/summary.json";

pub const DEFAULT_BRUTE_FORCE_ATTEMPTS: u32 = 10;

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Read a string variable; empty values count as unset
pub fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Read a string variable or use the default
pub fn env_or(key: &str, default: &str) -> String {
    env_string(key).unwrap_or_else(|| default.to_string())
}

/// Read and parse a variable, falling back to the default when unset or malformed
pub fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    match env_string(key) {
        Some(raw) => match raw.parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                log::warn!("Ignoring malformed {}={:?}, using default {}", key, raw, default);
                default
            }
        },
        None => default,
    }
}

/// Read a boolean flag ("false"/"0" disable, anything else enables)
pub fn env_flag(key: &str, default: bool) -> bool {
    env_string(key)
        .map(|s| s.to_lowercase() != "false" && s != "0")
        .unwrap_or(default)
}

/// Read a comma-separated list, preserving order
pub fn env_list(key: &str, default: &str) -> Vec<String> {
    env_or(key, default)
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
