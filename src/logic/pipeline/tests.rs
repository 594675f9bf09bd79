use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::logic::aggregator::SourceSummary;
use crate::logic::config::{AuditConfig, EnforcementConfig, PipelineConfig, ReputationConfig};
use crate::logic::detectors::{
    DetectionInput, Detector, ReputationDetector, SemanticDetector, StatisticalDetector,
};
use crate::logic::external_intel::{ReputationError, ReputationLookup, ReputationReport};
use crate::logic::features::FeatureVector;
use crate::logic::ingest::{ConnectionRecord, RawEvent};
use crate::logic::llm::{LlmError, LlmProvider, Message, SemanticAnalyzer};
use crate::logic::model::{ModelResolver, ModelSource};
use crate::logic::pipeline::{detection_input, Pipeline};
use crate::logic::response::{DryRunEnforcer, ResponseAction, ResponseExecutor};
use crate::logic::telemetry::MemoryAuditSink;
use crate::logic::threat::{
    AnomalyCategory, DecisionPolicy, DetectionResult, FailureKind, VerdictStatus,
    REPUTATION_DETECTOR, SEMANTIC_DETECTOR, STATISTICAL_DETECTOR, THRESHOLD_DETECTOR,
};

const IP: &str = "203.0.113.9";

// ============================================================================
// STUBS
// ============================================================================

/// Returns a fixed result after an optional delay
struct Scripted {
    id: &'static str,
    result: DetectionResult,
    delay: Duration,
    timeout: Duration,
    calls: AtomicUsize,
}

impl Scripted {
    fn new(id: &'static str, result: DetectionResult) -> Arc<Self> {
        Arc::new(Self {
            id,
            result,
            delay: Duration::ZERO,
            timeout: Duration::from_secs(5),
            calls: AtomicUsize::new(0),
        })
    }

    fn slow(id: &'static str, result: DetectionResult, delay: Duration, timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            id,
            result,
            delay,
            timeout,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Detector for Scripted {
    fn id(&self) -> &str {
        self.id
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn classify(&self, _input: &DetectionInput) -> DetectionResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.result.clone()
    }
}

struct Panicking;

#[async_trait]
impl Detector for Panicking {
    fn id(&self) -> &str {
        STATISTICAL_DETECTOR
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(1)
    }

    async fn classify(&self, _input: &DetectionInput) -> DetectionResult {
        panic!("backend exploded")
    }
}

struct Score(u8);

#[async_trait]
impl ReputationLookup for Score {
    async fn check(&self, ip: &str) -> Result<ReputationReport, ReputationError> {
        Ok(ReputationReport {
            ip: ip.to_string(),
            score: self.0,
            total_reports: 12,
            is_whitelisted: false,
            country_code: Some("NL".into()),
            isp: None,
            last_reported_at: None,
            categories: vec!["Brute-Force".into(), "SSH".into()],
        })
    }
}

/// Never answers within any sane timeout
struct Hanging;

#[async_trait]
impl ReputationLookup for Hanging {
    async fn check(&self, _ip: &str) -> Result<ReputationReport, ReputationError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Err(ReputationError::Timeout)
    }
}

struct CannedLlm(Mutex<Option<String>>);

#[async_trait]
impl LlmProvider for CannedLlm {
    async fn complete_json(&self, _messages: Vec<Message>) -> Result<String, LlmError> {
        self.0
            .lock()
            .take()
            .ok_or_else(|| LlmError::Http("no scripted reply".into()))
    }
}

struct Harness {
    pipeline: Arc<Pipeline>,
    enforcer: Arc<DryRunEnforcer>,
    audit: Arc<MemoryAuditSink>,
}

fn harness(detectors: Vec<Arc<dyn Detector>>) -> Harness {
    let enforcer = Arc::new(DryRunEnforcer::new());
    let audit = Arc::new(MemoryAuditSink::new());
    let executor = ResponseExecutor::new(
        enforcer.clone(),
        &EnforcementConfig::default(),
        &AuditConfig::default(),
    );
    let pipeline = Pipeline::new(detectors, DecisionPolicy::default(), executor, audit.clone());
    Harness {
        pipeline: Arc::new(pipeline),
        enforcer,
        audit,
    }
}

/// The standard four detectors over stubbed backends
fn wired(
    config: &PipelineConfig,
    lookup: Arc<dyn ReputationLookup>,
    reply: Option<&str>,
) -> Harness {
    let enforcer = Arc::new(DryRunEnforcer::new());
    let audit = Arc::new(MemoryAuditSink::new());
    let provider = Arc::new(CannedLlm(Mutex::new(reply.map(str::to_string))));
    let resolver = Arc::new(ModelResolver::new(vec![ModelSource::new("/nonexistent/rf_model.onnx")]));
    let pipeline = Pipeline::with_backends(
        config,
        lookup,
        provider,
        resolver,
        enforcer.clone(),
        audit.clone(),
    )
    .unwrap();
    Harness {
        pipeline: Arc::new(pipeline),
        enforcer,
        audit,
    }
}

fn outcome_lines(audit: &MemoryAuditSink) -> Vec<String> {
    const OUTCOMES: [&str; 5] = ["blocked ", "skipped ", "failed ", "abandoned ", "no_action "];
    audit
        .lines()
        .into_iter()
        .filter(|line| OUTCOMES.iter().any(|o| line.starts_with(o)))
        .collect()
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[tokio::test]
async fn test_bad_reputation_is_contained() {
    let reputation = ReputationDetector::new(Arc::new(Score(80)), &ReputationConfig::default());
    let h = harness(vec![Arc::new(reputation)]);

    let report = h.pipeline.run_cycle(DetectionInput::new(IP), 1).await;

    assert_eq!(report.verdict.status, VerdictStatus::Anomalous);
    assert_eq!(report.verdict.category, AnomalyCategory::KnownBadReputation);
    assert!((report.verdict.confidence - 0.8).abs() < 1e-9);
    assert_eq!(report.response.action, ResponseAction::Blocked);
    assert_eq!(h.enforcer.requests().len(), 1);

    let outcomes = outcome_lines(&h.audit);
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].starts_with("blocked 203.0.113.9"));
}

#[tokio::test]
async fn test_semantic_benign_with_other_backends_down() {
    let reputation = ReputationDetector::new(
        Arc::new(Hanging),
        &ReputationConfig {
            timeout: Duration::from_millis(50),
            ..Default::default()
        },
    );
    let statistical = StatisticalDetector::new(
        Arc::new(ModelResolver::new(vec![ModelSource::new("/nonexistent/rf_model.onnx")])),
        Duration::from_secs(5),
    );
    let reply = r#"{"anomaly_detected": false, "confidence": 0.9, "anomaly_type": null,
        "description": "routine traffic", "severity": "none", "source_ips": [],
        "target_ips": [], "recommended_action": "none"}"#;
    let analyzer = SemanticAnalyzer::new(Arc::new(CannedLlm(Mutex::new(Some(reply.into())))), 100);
    let semantic = SemanticDetector::new(Arc::new(analyzer), Duration::from_secs(5));

    let h = harness(vec![Arc::new(reputation), Arc::new(statistical), Arc::new(semantic)]);

    let mut summary = SourceSummary::new(IP);
    summary.record(&RawEvent::new(IP, "Mar 10 12:00:01").with_principal("admin"));
    let input = DetectionInput::new(IP)
        .with_summary(summary)
        .with_features(FeatureVector::new());

    let report = h.pipeline.run_cycle(input, 1).await;

    assert_eq!(report.verdict.status, VerdictStatus::Benign);
    assert!((report.verdict.confidence - 0.9).abs() < 1e-9);
    assert_eq!(report.response.action, ResponseAction::NoAction);
    assert!(h.enforcer.requests().is_empty());

    let kinds: Vec<FailureKind> = report.verdict.abstentions.iter().map(|(_, k)| *k).collect();
    assert!(kinds.contains(&FailureKind::Timeout));
    assert!(kinds.contains(&FailureKind::ModelUnavailable));

    let lines = h.audit.lines();
    assert!(lines.iter().any(|l| l.starts_with("reputation check for 203.0.113.9 unavailable: timeout")));
    assert!(lines.iter().any(|l| l.starts_with("statistical check for 203.0.113.9 unavailable")));
    assert_eq!(outcome_lines(&h.audit).len(), 1);
}

#[tokio::test]
async fn test_all_abstain_is_unknown() {
    let h = harness(vec![
        Scripted::new(
            REPUTATION_DETECTOR,
            DetectionResult::abstain(REPUTATION_DETECTOR, FailureKind::Network, "refused"),
        ),
        Scripted::new(
            SEMANTIC_DETECTOR,
            DetectionResult::abstain(SEMANTIC_DETECTOR, FailureKind::NotConfigured, "no key"),
        ),
    ]);

    let report = h.pipeline.run_cycle(DetectionInput::new(IP), 1).await;

    assert_eq!(report.verdict.status, VerdictStatus::Unknown);
    assert_eq!(report.response.action, ResponseAction::NoAction);
    assert!(h.enforcer.requests().is_empty());

    let lines = h.audit.lines();
    assert!(lines.iter().any(|l| l.starts_with("could not check 203.0.113.9")));
    assert_eq!(outcome_lines(&h.audit).len(), 1);
    assert!(outcome_lines(&h.audit)[0].contains("verdict unknown"));
}

// ============================================================================
// STANDARD WIRING
// ============================================================================

#[tokio::test]
async fn test_unconfigured_backends_give_unknown() {
    let audit = Arc::new(MemoryAuditSink::new());
    let enforcer = Arc::new(DryRunEnforcer::new());
    let pipeline =
        Pipeline::from_config(&PipelineConfig::default(), enforcer.clone(), audit.clone()).unwrap();

    // what `respond` builds from a bare trigger
    let report = pipeline.run_cycle(detection_input(IP, None, &[]), 1).await;

    assert_eq!(report.verdict.status, VerdictStatus::Unknown);
    assert!(report.verdict.contributing_detectors.is_empty());
    assert_eq!(report.verdict.abstentions.len(), 4);
    assert_eq!(report.response.action, ResponseAction::NoAction);
    assert!(enforcer.requests().is_empty());

    assert!(audit.lines().iter().any(|l| l.starts_with("could not check 203.0.113.9")));
    let outcomes = outcome_lines(&audit);
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].contains("verdict unknown"));
}

#[tokio::test]
async fn test_wired_bad_reputation_is_contained() {
    let h = wired(&PipelineConfig::default(), Arc::new(Score(80)), None);

    let report = h.pipeline.run_cycle(detection_input(IP, None, &[]), 1).await;

    assert_eq!(report.results.len(), 4);
    assert_eq!(report.verdict.status, VerdictStatus::Anomalous);
    assert_eq!(report.verdict.category, AnomalyCategory::KnownBadReputation);
    assert!((report.verdict.confidence - 0.8).abs() < 1e-9);
    assert_eq!(report.verdict.contributing_detectors, vec![REPUTATION_DETECTOR.to_string()]);
    assert_eq!(report.response.action, ResponseAction::Blocked);
    assert_eq!(h.enforcer.requests().len(), 1);
}

#[tokio::test]
async fn test_wired_semantic_benign_with_other_backends_down() {
    let mut config = PipelineConfig::default();
    config.reputation.timeout = Duration::from_millis(50);
    let reply = r#"{"anomaly_detected": false, "confidence": 0.9, "anomaly_type": null,
        "description": "routine traffic", "severity": "none", "source_ips": [],
        "target_ips": [], "recommended_action": "none"}"#;
    let h = wired(&config, Arc::new(Hanging), Some(reply));

    let mut summary = SourceSummary::new(IP);
    summary.record(&RawEvent::new(IP, "Mar 10 12:00:01").with_principal("admin"));
    let input = DetectionInput::new(IP)
        .with_summary(summary)
        .with_features(FeatureVector::new());

    let report = h.pipeline.run_cycle(input, 1).await;

    // one failed login: the threshold rules vote benign, below the semantic 0.9
    assert_eq!(report.verdict.status, VerdictStatus::Benign);
    assert!((report.verdict.confidence - 0.9).abs() < 1e-9);
    assert_eq!(
        report.verdict.contributing_detectors,
        vec![SEMANTIC_DETECTOR.to_string(), THRESHOLD_DETECTOR.to_string()]
    );
    let kinds: Vec<FailureKind> = report.verdict.abstentions.iter().map(|(_, k)| *k).collect();
    assert!(kinds.contains(&FailureKind::Timeout));
    assert!(kinds.contains(&FailureKind::ModelUnavailable));
    assert_eq!(report.response.action, ResponseAction::NoAction);
    assert!(h.enforcer.requests().is_empty());
}

#[tokio::test]
async fn test_unknown_verdict_is_not_reused() {
    let detector = Scripted::new(
        REPUTATION_DETECTOR,
        DetectionResult::abstain(REPUTATION_DETECTOR, FailureKind::Network, "refused"),
    );
    let h = harness(vec![detector.clone()]);

    let first = h.pipeline.run_cycle(DetectionInput::new(IP), 3).await;
    let second = h.pipeline.run_cycle(DetectionInput::new(IP), 3).await;

    assert_eq!(first.verdict.status, VerdictStatus::Unknown);
    assert!(!second.from_cache);
    assert_eq!(detector.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_cycle_state_released_after_many_identities() {
    let detector = Scripted::new(
        REPUTATION_DETECTOR,
        DetectionResult::anomaly(REPUTATION_DETECTOR, 0.9, AnomalyCategory::KnownBadReputation, "bad"),
    );
    let h = harness(vec![detector]);

    for host in 1..=40u8 {
        let ip = format!("198.51.100.{host}");
        let report = h.pipeline.run_cycle(DetectionInput::new(ip), 1).await;
        assert_eq!(report.response.action, ResponseAction::Blocked);
    }

    assert_eq!(h.pipeline.active_identities(), 0);
    assert_eq!(h.pipeline.executor().tracked_locks(), 0);
}

#[tokio::test]
async fn test_late_detector_becomes_timeout_abstention() {
    let slow = Scripted::slow(
        SEMANTIC_DETECTOR,
        DetectionResult::anomaly(SEMANTIC_DETECTOR, 0.99, AnomalyCategory::MalwareC2, "c2"),
        Duration::from_secs(10),
        Duration::from_millis(50),
    );
    let fast = Scripted::new(
        THRESHOLD_DETECTOR,
        DetectionResult::benign(THRESHOLD_DETECTOR, 1.0, "no signature rule matched"),
    );
    let h = harness(vec![slow, fast]);

    let results = h.pipeline.classify_all(Arc::new(DetectionInput::new(IP))).await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].detector_id, SEMANTIC_DETECTOR);
    assert_eq!(results[0].failure, Some(FailureKind::Timeout));
    assert_eq!(results[1].detector_id, THRESHOLD_DETECTOR);
    assert!(!results[1].is_abstention());
}

#[tokio::test]
async fn test_panicking_detector_abstains() {
    let h = harness(vec![
        Arc::new(Panicking),
        Scripted::new(
            THRESHOLD_DETECTOR,
            DetectionResult::anomaly(THRESHOLD_DETECTOR, 0.9, AnomalyCategory::PortScan, "scan"),
        ),
    ]);

    let report = h.pipeline.run_cycle(DetectionInput::new(IP), 1).await;

    assert_eq!(report.results[0].failure, Some(FailureKind::Backend));
    assert_eq!(report.verdict.category, AnomalyCategory::PortScan);
    assert_eq!(report.response.action, ResponseAction::Blocked);
}

#[tokio::test]
async fn test_repeat_trigger_reuses_window_verdict() {
    let detector = Scripted::new(
        REPUTATION_DETECTOR,
        DetectionResult::anomaly(REPUTATION_DETECTOR, 0.8, AnomalyCategory::KnownBadReputation, "bad"),
    );
    let h = harness(vec![detector.clone()]);

    let first = h.pipeline.run_cycle(DetectionInput::new(IP), 7).await;
    let second = h.pipeline.run_cycle(DetectionInput::new(IP), 7).await;

    assert!(!first.from_cache);
    assert!(second.from_cache);
    assert_eq!(first.response.action, ResponseAction::Blocked);
    assert_eq!(second.response.action, ResponseAction::Skipped);
    assert_eq!(detector.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.enforcer.requests().len(), 1);
    assert_eq!(outcome_lines(&h.audit).len(), 2);

    // a new window asks the detectors again
    h.pipeline.run_cycle(DetectionInput::new(IP), 8).await;
    assert_eq!(detector.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_superseded_cycle_takes_no_action() {
    let detector = Scripted::slow(
        REPUTATION_DETECTOR,
        DetectionResult::anomaly(REPUTATION_DETECTOR, 0.9, AnomalyCategory::KnownBadReputation, "bad"),
        Duration::from_millis(100),
        Duration::from_secs(5),
    );
    let h = harness(vec![detector]);

    let (first, second) = tokio::join!(
        h.pipeline.run_cycle(DetectionInput::new(IP), 1),
        h.pipeline.run_cycle(DetectionInput::new(IP), 1),
    );

    assert!(first.is_abandoned());
    assert_eq!(second.response.action, ResponseAction::Blocked);
    assert_eq!(h.enforcer.requests().len(), 1);

    let outcomes = outcome_lines(&h.audit);
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().any(|l| l.starts_with("abandoned 203.0.113.9")));
    assert_eq!(h.pipeline.active_identities(), 0);
}

#[tokio::test]
async fn test_identities_do_not_supersede_each_other() {
    let detector = Scripted::slow(
        REPUTATION_DETECTOR,
        DetectionResult::anomaly(REPUTATION_DETECTOR, 0.9, AnomalyCategory::KnownBadReputation, "bad"),
        Duration::from_millis(50),
        Duration::from_secs(5),
    );
    let h = harness(vec![detector]);

    let (a, b) = tokio::join!(
        h.pipeline.run_cycle(DetectionInput::new("198.51.100.1"), 1),
        h.pipeline.run_cycle(DetectionInput::new("198.51.100.2"), 1),
    );

    assert_eq!(a.response.action, ResponseAction::Blocked);
    assert_eq!(b.response.action, ResponseAction::Blocked);
    assert_eq!(h.enforcer.requests().len(), 2);
}

// ============================================================================
// INPUT ASSEMBLY + WIRING
// ============================================================================

#[test]
fn test_detection_input_uses_own_records() {
    let records = vec![
        ConnectionRecord {
            src_ip: IP.into(),
            dst_ip: "10.0.0.1".into(),
            dst_port: 22,
            protocol: "tcp".into(),
            bytes: 4_000,
            packet_count: 40,
            flow_duration_ms: 2_000.0,
            ..Default::default()
        },
        ConnectionRecord {
            src_ip: "198.51.100.7".into(),
            dst_port: 443,
            ..Default::default()
        },
    ];

    let input = detection_input(IP, None, &records);
    assert_eq!(input.batch.len(), 1);
    assert_eq!(input.summary.identity, IP);
    assert!(input.features.as_ref().is_some_and(|f| f.is_compatible()));

    let idle = detection_input("192.0.2.1", None, &records);
    assert!(idle.batch.is_empty());
    assert!(idle.features.is_none());
}

#[test]
fn test_from_config_registers_all_detectors() {
    let audit = Arc::new(MemoryAuditSink::new());
    let pipeline =
        Pipeline::from_config(&PipelineConfig::default(), Arc::new(DryRunEnforcer::new()), audit).unwrap();

    assert_eq!(
        pipeline.detector_ids(),
        vec![REPUTATION_DETECTOR, STATISTICAL_DETECTOR, SEMANTIC_DETECTOR, THRESHOLD_DETECTOR]
    );
    assert_eq!(pipeline.executor().enforcer_name(), "dry-run");
}
