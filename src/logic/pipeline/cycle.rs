//! Decision Cycle
//!
//! One cycle = fan out to every detector, reconcile, contain, audit.
//! Detectors run as concurrent tasks, each bounded by its own timeout; a late
//! detector becomes a Timeout abstention instead of stalling the cycle.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::logic::config::{ConfigError, PipelineConfig};
use crate::logic::detectors::{
    DetectionInput, Detector, ReputationDetector, SemanticDetector, StatisticalDetector,
    ThresholdDetector,
};
use crate::logic::external_intel::{AbuseIpDbClient, ReputationError, ReputationLookup};
use crate::logic::llm::{LlmError, LlmProvider, OpenAiProvider, SemanticAnalyzer};
use crate::logic::model::ModelResolver;
use crate::logic::response::{EnforcementPoint, ResponseAction, ResponseExecutor, ResponseRecord};
use crate::logic::telemetry::AuditSink;
use crate::logic::threat::{decide_for, DecisionPolicy, DetectionResult, FailureKind, ThreatVerdict};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("reputation client: {0}")]
    Reputation(#[from] ReputationError),
    #[error("semantic backend: {0}")]
    Llm(#[from] LlmError),
}

/// Everything one cycle produced
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub verdict: ThreatVerdict,
    /// Empty when the verdict came from the per-window cache
    pub results: Vec<DetectionResult>,
    pub response: ResponseRecord,
    pub from_cache: bool,
}

impl CycleReport {
    pub fn is_abandoned(&self) -> bool {
        self.response.action == ResponseAction::Abandoned
    }
}

pub struct Pipeline {
    detectors: Vec<Arc<dyn Detector>>,
    policy: DecisionPolicy,
    executor: ResponseExecutor,
    audit: Arc<dyn AuditSink>,
    next_generation: AtomicU64,
    /// Latest cycle number started per identity, removed when that cycle ends
    generations: Mutex<HashMap<String, u64>>,
    verdicts: Mutex<HashMap<(String, u64), ThreatVerdict>>,
}

impl Pipeline {
    pub fn new(
        detectors: Vec<Arc<dyn Detector>>,
        policy: DecisionPolicy,
        executor: ResponseExecutor,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            detectors,
            policy,
            executor,
            audit,
            next_generation: AtomicU64::new(0),
            generations: Mutex::new(HashMap::new()),
            verdicts: Mutex::new(HashMap::new()),
        }
    }

    /// Wire the four standard detectors from configuration
    pub fn from_config(
        config: &PipelineConfig,
        enforcer: Arc<dyn EnforcementPoint>,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;

        let reputation = AbuseIpDbClient::new(&config.reputation)?;
        if !reputation.is_configured() {
            log::warn!("ABUSEIPDB_API_KEY not set, reputation detector will abstain");
        }

        let resolver = Arc::new(ModelResolver::new(config.statistical.model_sources.clone()));
        let provider = OpenAiProvider::new(&config.semantic)?;

        Self::with_backends(config, Arc::new(reputation), Arc::new(provider), resolver, enforcer, audit)
    }

    /// The standard detector set over caller-supplied backends
    pub fn with_backends(
        config: &PipelineConfig,
        lookup: Arc<dyn ReputationLookup>,
        provider: Arc<dyn LlmProvider>,
        resolver: Arc<ModelResolver>,
        enforcer: Arc<dyn EnforcementPoint>,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;

        let analyzer = Arc::new(SemanticAnalyzer::new(provider, config.semantic.sample_size));

        let detectors: Vec<Arc<dyn Detector>> = vec![
            Arc::new(ReputationDetector::new(lookup, &config.reputation)),
            Arc::new(StatisticalDetector::new(resolver, config.statistical.timeout)),
            Arc::new(SemanticDetector::new(analyzer, config.semantic.timeout)),
            Arc::new(ThresholdDetector::new(config.brute_force_attempts)),
        ];

        let executor = ResponseExecutor::new(enforcer, &config.enforcement, &config.audit);
        Ok(Self::new(detectors, config.decision_policy(), executor, audit))
    }

    pub fn detector_ids(&self) -> Vec<&str> {
        self.detectors.iter().map(|d| d.id()).collect()
    }

    pub fn executor(&self) -> &ResponseExecutor {
        &self.executor
    }

    // ========================================================================
    // FAN-OUT
    // ========================================================================

    /// Run every detector concurrently. Always one result per detector,
    /// in registration order.
    pub async fn classify_all(&self, input: Arc<DetectionInput>) -> Vec<DetectionResult> {
        let mut tasks = JoinSet::new();
        for (index, detector) in self.detectors.iter().enumerate() {
            let detector = Arc::clone(detector);
            let input = Arc::clone(&input);
            tasks.spawn(async move {
                let limit = detector.timeout();
                let result = match tokio::time::timeout(limit, detector.classify(&input)).await {
                    Ok(result) => result,
                    Err(_) => DetectionResult::abstain(
                        detector.id(),
                        FailureKind::Timeout,
                        format!("no answer within {:?}", limit),
                    ),
                };
                (index, result)
            });
        }

        let mut slots: Vec<Option<DetectionResult>> = vec![None; self.detectors.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => log::error!("Detector task failed: {}", e),
            }
        }

        slots
            .into_iter()
            .zip(&self.detectors)
            .map(|(slot, detector)| {
                slot.unwrap_or_else(|| {
                    DetectionResult::abstain(detector.id(), FailureKind::Backend, "detector task panicked")
                })
            })
            .collect()
    }

    // ========================================================================
    // CYCLE
    // ========================================================================

    pub async fn run_cycle(&self, input: DetectionInput, window: u64) -> CycleReport {
        let identity = input.identity.clone();
        let generation = self.begin(&identity);
        let cycle_id = Uuid::new_v4();
        log::debug!("Cycle {} started for {} (window {})", cycle_id, identity, window);

        let key = (identity.clone(), window);
        let cached = self.verdicts.lock().get(&key).cloned();

        let (verdict, results, from_cache) = match cached {
            Some(verdict) => {
                log::debug!("Reusing window {} verdict for {}", window, identity);
                (verdict, Vec::new(), true)
            }
            None => {
                let results = self.classify_all(Arc::new(input)).await;
                let verdict = decide_for(&identity, window, &results, &self.policy);
                self.record_diagnostics(&verdict, &results);
                (verdict, results, false)
            }
        };

        if !self.is_current(&identity, generation) {
            log::info!("Cycle {} for {} superseded, no action taken", cycle_id, identity);
            let response = ResponseRecord::abandoned(&identity);
            self.write_audit(&response.audit_message());
            return CycleReport {
                cycle_id,
                verdict,
                results,
                response,
                from_cache,
            };
        }

        // Unknown means "could not check"; the next trigger asks again
        if !from_cache && !verdict.is_unknown() {
            let mut verdicts = self.verdicts.lock();
            verdicts.retain(|(_, w), _| *w + 1 >= window);
            verdicts.insert(key, verdict.clone());
        }

        let response = self.executor.respond(&verdict, &identity).await;
        self.finish(&identity, generation);
        self.write_audit(&format!(
            "{} [verdict {}, confidence {:.2}, category {}]",
            response.audit_message(),
            verdict.status.as_str(),
            verdict.confidence,
            verdict.category
        ));

        log::info!(
            "{}: {} ({:.2}) -> {}",
            identity,
            verdict.status.as_str(),
            verdict.confidence,
            response.action
        );

        CycleReport {
            cycle_id,
            verdict,
            results,
            response,
            from_cache,
        }
    }

    /// Forget cached verdicts, e.g. when a new aggregation window opens
    pub fn clear_verdicts(&self) {
        self.verdicts.lock().clear();
    }

    /// Identities with a cycle in flight
    pub fn active_identities(&self) -> usize {
        self.generations.lock().len()
    }

    fn begin(&self, identity: &str) -> u64 {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.generations.lock().insert(identity.to_string(), generation);
        generation
    }

    fn finish(&self, identity: &str, generation: u64) {
        let mut generations = self.generations.lock();
        if generations.get(identity) == Some(&generation) {
            generations.remove(identity);
        }
    }

    fn is_current(&self, identity: &str, generation: u64) -> bool {
        self.generations.lock().get(identity).copied() == Some(generation)
    }

    fn record_diagnostics(&self, verdict: &ThreatVerdict, results: &[DetectionResult]) {
        for (detector, kind) in &verdict.abstentions {
            let detail = results
                .iter()
                .find(|r| &r.detector_id == detector)
                .map(|r| r.description.as_str())
                .unwrap_or_default();
            self.write_audit(&format!(
                "{} check for {} unavailable: {} ({})",
                detector, verdict.identity, kind, detail
            ));
        }

        if verdict.is_unknown() {
            self.write_audit(&format!(
                "could not check {}: every detector abstained",
                verdict.identity
            ));
        }
    }

    fn write_audit(&self, message: &str) {
        if let Err(e) = self.audit.record(message) {
            log::error!("Audit write failed: {}", e);
        }
    }
}
