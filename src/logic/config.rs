//! Pipeline Configuration
//!
//! Explicit configuration handed to every component at construction.
//! Built from the environment (and `.env`) with the defaults in `constants`.

use std::path::PathBuf;
use std::time::Duration;

use crate::constants::*;
use crate::logic::model::ModelSource;
use crate::logic::threat::{
    DecisionPolicy, REPUTATION_DETECTOR, SEMANTIC_DETECTOR, STATISTICAL_DETECTOR,
    THRESHOLD_DETECTOR, DEFAULT_ACTIVATION,
};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be within [0, 1], got {value}")]
    ThresholdOutOfRange { name: &'static str, value: f64 },
    #[error("reputation threshold must be within 0-100, got {0}")]
    ReputationThreshold(u8),
    #[error("{0} must not be zero")]
    Zero(&'static str),
    #[error("no model sources configured")]
    NoModelSources,
}

// ============================================================================
// SECTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ReputationConfig {
    pub api_key: Option<String>,
    pub api_url: String,
    pub max_age_days: u32,
    /// Score (0-100) above which an identity counts as known-bad
    pub threshold: u8,
    pub timeout: Duration,
    pub cache_ttl: Duration,
    pub max_requests_per_minute: u32,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_ABUSEIPDB_URL.to_string(),
            max_age_days: DEFAULT_MAX_AGE_DAYS,
            threshold: DEFAULT_REPUTATION_THRESHOLD,
            timeout: Duration::from_secs(DEFAULT_REPUTATION_TIMEOUT_SECS),
            cache_ttl: Duration::from_secs(DEFAULT_REPUTATION_CACHE_TTL_SECS),
            max_requests_per_minute: DEFAULT_REPUTATION_RATE_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatisticalConfig {
    /// Tried in order; first successful load wins
    pub model_sources: Vec<ModelSource>,
    pub threshold: f64,
    pub timeout: Duration,
}

impl Default for StatisticalConfig {
    fn default() -> Self {
        Self {
            model_sources: DEFAULT_MODEL_PATHS
                .split(',')
                .map(|p| ModelSource::new(p.trim()))
                .collect(),
            threshold: DEFAULT_STATISTICAL_THRESHOLD,
            timeout: Duration::from_secs(DEFAULT_STATISTICAL_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SemanticConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub threshold: f64,
    pub timeout: Duration,
    pub sample_size: usize,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            threshold: DEFAULT_SEMANTIC_THRESHOLD,
            timeout: Duration::from_secs(DEFAULT_SEMANTIC_TIMEOUT_SECS),
            sample_size: DEFAULT_SEMANTIC_SAMPLE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnforcementConfig {
    pub router_host: String,
    pub router_user: String,
    pub ssh_key: PathBuf,
    pub list_name: String,
    /// RouterOS duration, e.g. "90d"
    pub block_timeout: String,
    pub timeout: Duration,
    /// Verdict confidence must exceed this before containment runs
    pub action_threshold: f64,
    pub auto_block: bool,
}

impl Default for EnforcementConfig {
    fn default() -> Self {
        Self {
            router_host: DEFAULT_ROUTER_HOST.to_string(),
            router_user: DEFAULT_ROUTER_USER.to_string(),
            ssh_key: PathBuf::from(DEFAULT_ROUTER_SSH_KEY),
            list_name: DEFAULT_BLOCK_LIST_NAME.to_string(),
            block_timeout: DEFAULT_BLOCK_TIMEOUT.to_string(),
            timeout: Duration::from_secs(DEFAULT_ENFORCEMENT_TIMEOUT_SECS),
            action_threshold: DEFAULT_ACTION_THRESHOLD,
            auto_block: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditConfig {
    pub log_path: PathBuf,
    /// How long a containment counts as "already blocked"
    pub window: Duration,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from(DEFAULT_AUDIT_LOG_PATH),
            window: Duration::from_secs(DEFAULT_AUDIT_WINDOW_SECS),
        }
    }
}

// ============================================================================
// PIPELINE CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub reputation: ReputationConfig,
    pub statistical: StatisticalConfig,
    pub semantic: SemanticConfig,
    pub enforcement: EnforcementConfig,
    pub audit: AuditConfig,
    pub report_path: PathBuf,
    pub brute_force_attempts: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            reputation: ReputationConfig::default(),
            statistical: StatisticalConfig::default(),
            semantic: SemanticConfig::default(),
            enforcement: EnforcementConfig::default(),
            audit: AuditConfig::default(),
            report_path: PathBuf::from(DEFAULT_REPORT_PATH),
            brute_force_attempts: DEFAULT_BRUTE_FORCE_ATTEMPTS,
        }
    }
}

impl PipelineConfig {
    /// Load `.env` (if present) then read the environment
    pub fn from_env() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            log::debug!("Loaded environment from {}", path.display());
        }

        let expected_sha = env_string("IDS_MODEL_SHA256");
        let model_sources = env_list("IDS_MODEL_PATHS", DEFAULT_MODEL_PATHS)
            .into_iter()
            .map(|p| ModelSource {
                path: PathBuf::from(p),
                sha256: expected_sha.clone(),
            })
            .collect();

        Self {
            reputation: ReputationConfig {
                api_key: env_string("ABUSEIPDB_API_KEY"),
                api_url: env_or("ABUSEIPDB_API_URL", DEFAULT_ABUSEIPDB_URL),
                max_age_days: env_parse("ABUSEIPDB_MAX_AGE_DAYS", DEFAULT_MAX_AGE_DAYS),
                threshold: env_parse("REPUTATION_THRESHOLD", DEFAULT_REPUTATION_THRESHOLD),
                timeout: Duration::from_secs(env_parse(
                    "REPUTATION_TIMEOUT_SECS",
                    DEFAULT_REPUTATION_TIMEOUT_SECS,
                )),
                cache_ttl: Duration::from_secs(env_parse(
                    "REPUTATION_CACHE_TTL_SECS",
                    DEFAULT_REPUTATION_CACHE_TTL_SECS,
                )),
                max_requests_per_minute: env_parse(
                    "REPUTATION_MAX_REQUESTS_PER_MINUTE",
                    DEFAULT_REPUTATION_RATE_LIMIT,
                ),
            },
            statistical: StatisticalConfig {
                model_sources,
                threshold: env_parse("STATISTICAL_THRESHOLD", DEFAULT_STATISTICAL_THRESHOLD),
                timeout: Duration::from_secs(env_parse(
                    "STATISTICAL_TIMEOUT_SECS",
                    DEFAULT_STATISTICAL_TIMEOUT_SECS,
                )),
            },
            semantic: SemanticConfig {
                api_key: env_string("OPENAI_API_KEY"),
                base_url: env_or("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL),
                model: env_or("OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
                threshold: env_parse("SEMANTIC_THRESHOLD", DEFAULT_SEMANTIC_THRESHOLD),
                timeout: Duration::from_secs(env_parse(
                    "SEMANTIC_TIMEOUT_SECS",
                    DEFAULT_SEMANTIC_TIMEOUT_SECS,
                )),
                sample_size: env_parse("SEMANTIC_SAMPLE_SIZE", DEFAULT_SEMANTIC_SAMPLE_SIZE),
            },
            enforcement: EnforcementConfig {
                router_host: env_or("ROUTER_HOST", DEFAULT_ROUTER_HOST),
                router_user: env_or("ROUTER_USER", DEFAULT_ROUTER_USER),
                ssh_key: PathBuf::from(env_or("ROUTER_SSH_KEY", DEFAULT_ROUTER_SSH_KEY)),
                list_name: env_or("BLOCK_LIST_NAME", DEFAULT_BLOCK_LIST_NAME),
                block_timeout: env_or("BLOCK_TIMEOUT", DEFAULT_BLOCK_TIMEOUT),
                timeout: Duration::from_secs(env_parse(
                    "ENFORCEMENT_TIMEOUT_SECS",
                    DEFAULT_ENFORCEMENT_TIMEOUT_SECS,
                )),
                action_threshold: env_parse("ACTION_THRESHOLD", DEFAULT_ACTION_THRESHOLD),
                auto_block: env_flag("AUTO_BLOCK_ENABLED", true),
            },
            audit: AuditConfig {
                log_path: PathBuf::from(env_or("AUDIT_LOG_PATH", DEFAULT_AUDIT_LOG_PATH)),
                window: Duration::from_secs(env_parse(
                    "AUDIT_WINDOW_SECS",
                    DEFAULT_AUDIT_WINDOW_SECS,
                )),
            },
            report_path: PathBuf::from(env_or("REPORT_PATH", DEFAULT_REPORT_PATH)),
            brute_force_attempts: env_parse("BRUTE_FORCE_ATTEMPTS", DEFAULT_BRUTE_FORCE_ATTEMPTS),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reputation.threshold > 100 {
            return Err(ConfigError::ReputationThreshold(self.reputation.threshold));
        }
        for (name, value) in [
            ("STATISTICAL_THRESHOLD", self.statistical.threshold),
            ("SEMANTIC_THRESHOLD", self.semantic.threshold),
            ("ACTION_THRESHOLD", self.enforcement.action_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ThresholdOutOfRange { name, value });
            }
        }
        if self.semantic.sample_size == 0 {
            return Err(ConfigError::Zero("SEMANTIC_SAMPLE_SIZE"));
        }
        if self.brute_force_attempts == 0 {
            return Err(ConfigError::Zero("BRUTE_FORCE_ATTEMPTS"));
        }
        if self.statistical.model_sources.is_empty() {
            return Err(ConfigError::NoModelSources);
        }
        Ok(())
    }

    /// Activation thresholds per detector
    pub fn decision_policy(&self) -> DecisionPolicy {
        DecisionPolicy::new(DEFAULT_ACTIVATION)
            .with_threshold(REPUTATION_DETECTOR, self.reputation.threshold as f64 / 100.0)
            .with_threshold(STATISTICAL_DETECTOR, self.statistical.threshold)
            .with_threshold(SEMANTIC_DETECTOR, self.semantic.threshold)
            .with_threshold(THRESHOLD_DETECTOR, DEFAULT_ACTIVATION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.statistical.model_sources.len(), 3);
        assert_eq!(config.enforcement.list_name, "blocked-by-wazuh");
    }

    #[test]
    fn test_default_policy_matches_threat_defaults() {
        let policy = PipelineConfig::default().decision_policy();
        assert_eq!(policy.threshold_for(REPUTATION_DETECTOR), 0.25);
        assert_eq!(policy.threshold_for(SEMANTIC_DETECTOR), 0.5);
        assert_eq!(policy, DecisionPolicy::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = PipelineConfig::default();
        config.reputation.threshold = 150;
        assert_eq!(config.validate(), Err(ConfigError::ReputationThreshold(150)));

        let mut config = PipelineConfig::default();
        config.enforcement.action_threshold = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ThresholdOutOfRange { name: "ACTION_THRESHOLD", .. })
        ));

        let mut config = PipelineConfig::default();
        config.statistical.model_sources.clear();
        assert_eq!(config.validate(), Err(ConfigError::NoModelSources));
    }
}
