//! Semantic Detector
//!
//! Sends a bounded summary of the identity's activity to the LLM backend and
//! maps the validated traffic-analysis reply onto a DetectionResult.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::{DetectionInput, Detector};
use crate::logic::llm::{LlmError, SemanticAnalyzer};
use crate::logic::threat::{AnomalyCategory, DetectionResult, FailureKind, SEMANTIC_DETECTOR};

pub struct SemanticDetector {
    analyzer: Arc<SemanticAnalyzer>,
    timeout: Duration,
}

impl SemanticDetector {
    pub fn new(analyzer: Arc<SemanticAnalyzer>, timeout: Duration) -> Self {
        Self { analyzer, timeout }
    }
}

fn failure_kind(error: &LlmError) -> FailureKind {
    match error {
        LlmError::NotConfigured(_) => FailureKind::NotConfigured,
        LlmError::Timeout => FailureKind::Timeout,
        LlmError::Http(_) => FailureKind::Network,
        LlmError::Api { status: 429, .. } => FailureKind::RateLimited,
        LlmError::Api { .. } => FailureKind::Backend,
        LlmError::Parse(_) | LlmError::Schema(_) => FailureKind::MalformedResponse,
    }
}

#[async_trait]
impl Detector for SemanticDetector {
    fn id(&self) -> &str {
        SEMANTIC_DETECTOR
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn classify(&self, input: &DetectionInput) -> DetectionResult {
        if input.summary.attempts == 0 && input.batch.is_empty() {
            return DetectionResult::abstain(
                SEMANTIC_DETECTOR,
                FailureKind::NotConfigured,
                "no activity to analyze",
            );
        }

        let context = json!({
            "identity": input.identity,
            "authentication_failures": {
                "attempts": input.summary.attempts,
                "distinct_users": input.summary.distinct_principals(),
                "first_seen": input.summary.first_seen(),
                "last_seen": input.summary.last_seen(),
            },
            "traffic": self.analyzer.summarize(&input.batch),
        });

        match self.analyzer.analyze_traffic(&context).await {
            Ok(analysis) if analysis.anomaly_detected => {
                let category = match analysis.anomaly_type.as_deref().map(AnomalyCategory::from_label) {
                    None | Some(AnomalyCategory::None) => AnomalyCategory::Other,
                    Some(category) => category,
                };
                DetectionResult::anomaly(
                    SEMANTIC_DETECTOR,
                    analysis.confidence,
                    category,
                    format!(
                        "{} (severity {:?}, recommended: {})",
                        analysis.description, analysis.severity, analysis.recommended_action
                    ),
                )
            }
            Ok(analysis) => {
                DetectionResult::benign(SEMANTIC_DETECTOR, analysis.confidence, analysis.description)
            }
            Err(e) => {
                log::warn!("Semantic analysis for {} failed: {}", input.identity, e);
                DetectionResult::abstain(SEMANTIC_DETECTOR, failure_kind(&e), e.to_string())
            }
        }
    }
}
