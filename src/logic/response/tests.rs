use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::logic::config::{AuditConfig, EnforcementConfig};
use crate::logic::response::{
    validate_duration, DryRunEnforcer, EnforcementError, EnforcementPoint, ResponseAction,
    ResponseExecutor, SshEnforcer,
};
use crate::logic::threat::{
    decide_for, AnomalyCategory, DecisionPolicy, DetectionResult, FailureKind, ThreatVerdict,
    REPUTATION_DETECTOR, SEMANTIC_DETECTOR,
};

const IP: &str = "203.0.113.9";

fn anomalous(confidence: f64) -> ThreatVerdict {
    decide_for(
        IP,
        1,
        &[DetectionResult::anomaly(
            REPUTATION_DETECTOR,
            confidence,
            AnomalyCategory::KnownBadReputation,
            "bad reputation",
        )],
        &DecisionPolicy::default(),
    )
}

fn executor(enforcer: Arc<dyn EnforcementPoint>) -> ResponseExecutor {
    ResponseExecutor::new(enforcer, &EnforcementConfig::default(), &AuditConfig::default())
}

struct Unreachable {
    attempts: AtomicUsize,
}

#[async_trait]
impl EnforcementPoint for Unreachable {
    fn name(&self) -> &str {
        "unreachable"
    }

    async fn block(&self, _ip: IpAddr, _duration: &str) -> Result<(), EnforcementError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(EnforcementError::CommandFailed {
            status: Some(255),
            stderr: "ssh: connect to host 192.168.1.1 port 22: No route to host".into(),
        })
    }
}

#[tokio::test]
async fn test_respond_twice_blocks_once() {
    let enforcer = Arc::new(DryRunEnforcer::new());
    let executor = executor(enforcer.clone());
    let verdict = anomalous(0.8);

    let first = executor.respond(&verdict, IP).await;
    let second = executor.respond(&verdict, IP).await;

    assert_eq!(first.action, ResponseAction::Blocked);
    assert_eq!(second.action, ResponseAction::Skipped);
    assert_eq!(enforcer.requests().len(), 1);
    assert_eq!(enforcer.requests()[0].1, "90d");
    assert!(executor.is_blocked(IP));
}

#[tokio::test]
async fn test_concurrent_triggers_issue_one_command() {
    let enforcer = Arc::new(DryRunEnforcer::new());
    let executor = Arc::new(executor(enforcer.clone()));
    let verdict = anomalous(0.9);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let executor = Arc::clone(&executor);
        let verdict = verdict.clone();
        handles.push(tokio::spawn(async move { executor.respond(&verdict, IP).await.action }));
    }

    let mut actions = Vec::new();
    for handle in handles {
        actions.push(handle.await.unwrap());
    }

    assert_eq!(actions.iter().filter(|a| **a == ResponseAction::Blocked).count(), 1);
    assert_eq!(actions.iter().filter(|a| **a == ResponseAction::Skipped).count(), 7);
    assert_eq!(enforcer.requests().len(), 1);
    assert_eq!(executor.tracked_locks(), 0);
}

#[tokio::test]
async fn test_per_identity_state_stays_bounded() {
    let enforcer = Arc::new(DryRunEnforcer::new());
    let audit = AuditConfig {
        window: Duration::ZERO,
        ..Default::default()
    };
    let executor = ResponseExecutor::new(enforcer.clone(), &EnforcementConfig::default(), &audit);

    for host in 1..=50u8 {
        let ip = format!("198.51.100.{host}");
        let verdict = anomalous(0.8).for_identity(&ip, 1);
        assert_eq!(executor.respond(&verdict, &ip).await.action, ResponseAction::Blocked);
    }

    assert_eq!(enforcer.requests().len(), 50);
    // expired blocks are pruned whenever a new one is remembered
    assert_eq!(executor.tracked_blocks(), 1);
    assert_eq!(executor.tracked_locks(), 0);
}

#[tokio::test]
async fn test_failure_is_recorded_and_not_remembered() {
    let enforcer = Arc::new(Unreachable {
        attempts: AtomicUsize::new(0),
    });
    let executor = executor(enforcer.clone());
    let verdict = anomalous(0.8);

    let record = executor.respond(&verdict, IP).await;
    assert_eq!(record.action, ResponseAction::Failed);
    assert!(record.reason.contains("No route to host"));
    assert!(!executor.is_blocked(IP));

    // a later trigger may try again
    executor.respond(&verdict, IP).await;
    assert_eq!(enforcer.attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_no_containment_without_anomaly() {
    let enforcer = Arc::new(DryRunEnforcer::new());
    let executor = executor(enforcer.clone());

    let benign = decide_for(
        IP,
        1,
        &[DetectionResult::benign(SEMANTIC_DETECTOR, 0.9, "normal")],
        &DecisionPolicy::default(),
    );
    let unknown = decide_for(
        IP,
        1,
        &[DetectionResult::abstain(REPUTATION_DETECTOR, FailureKind::Timeout, "timeout")],
        &DecisionPolicy::default(),
    );

    assert_eq!(executor.respond(&benign, IP).await.action, ResponseAction::NoAction);
    let record = executor.respond(&unknown, IP).await;
    assert_eq!(record.action, ResponseAction::NoAction);
    assert!(record.reason.contains("unknown"));
    assert!(enforcer.requests().is_empty());
}

#[tokio::test]
async fn test_action_threshold_and_auto_block() {
    let enforcer = Arc::new(DryRunEnforcer::new());
    let strict = EnforcementConfig {
        action_threshold: 0.85,
        ..Default::default()
    };
    let executor = ResponseExecutor::new(enforcer.clone(), &strict, &AuditConfig::default());
    assert_eq!(executor.respond(&anomalous(0.8), IP).await.action, ResponseAction::NoAction);

    let manual = EnforcementConfig {
        auto_block: false,
        ..Default::default()
    };
    let executor = ResponseExecutor::new(enforcer.clone(), &manual, &AuditConfig::default());
    assert_eq!(executor.respond(&anomalous(0.99), IP).await.action, ResponseAction::NoAction);

    assert!(enforcer.requests().is_empty());
}

#[tokio::test]
async fn test_block_expires_with_audit_window() {
    let enforcer = Arc::new(DryRunEnforcer::new());
    let audit = AuditConfig {
        window: Duration::ZERO,
        ..Default::default()
    };
    let executor = ResponseExecutor::new(enforcer.clone(), &EnforcementConfig::default(), &audit);

    executor.respond(&anomalous(0.8), IP).await;
    let again = executor.respond(&anomalous(0.8), IP).await;
    assert_eq!(again.action, ResponseAction::Blocked);
    assert_eq!(enforcer.requests().len(), 2);
}

#[tokio::test]
async fn test_non_ip_identity_fails() {
    let enforcer = Arc::new(DryRunEnforcer::new());
    let executor = executor(enforcer.clone());
    let verdict = anomalous(0.8).for_identity("web-01", 1);

    let record = executor.respond(&verdict, "web-01").await;
    assert_eq!(record.action, ResponseAction::Failed);
    assert!(enforcer.requests().is_empty());
}

#[test]
fn test_router_command_format() {
    let enforcer = SshEnforcer::new(&EnforcementConfig::default());
    let ip: IpAddr = "203.0.113.9".parse().unwrap();

    assert_eq!(
        enforcer.router_command(ip, "90d"),
        "/ip firewall address-list add list=\"blocked-by-wazuh\" address=203.0.113.9 timeout=90d comment=\"Added by Wazuh\""
    );

    let args = enforcer.ssh_args(ip, "90d");
    assert_eq!(args[0], "-i");
    assert_eq!(args[1], "/var/ossec/.ssh/id_rsa");
    assert!(args.contains(&"StrictHostKeyChecking=no".to_string()));
    assert_eq!(args[6], "wazuh@192.168.1.1");
}

#[test]
fn test_duration_validation() {
    assert!(validate_duration("90d").is_ok());
    assert!(validate_duration("1d12h").is_ok());
    assert!(validate_duration("00:30:00").is_ok());
    assert!(validate_duration("").is_err());
    assert!(validate_duration("90d; /system reboot").is_err());
    assert!(validate_duration("d90").is_err());
}
