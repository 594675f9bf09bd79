use crate::logic::threat::{
    decide, decide_for, AnomalyCategory, DecisionPolicy, DetectionResult, FailureKind,
    VerdictStatus, REPUTATION_DETECTOR, SEMANTIC_DETECTOR, STATISTICAL_DETECTOR,
    THRESHOLD_DETECTOR,
};

fn reputation(score: f64) -> DetectionResult {
    DetectionResult::anomaly(
        REPUTATION_DETECTOR,
        score / 100.0,
        AnomalyCategory::KnownBadReputation,
        format!("abuse score {score}"),
    )
}

#[test]
fn test_reputation_80_is_anomalous() {
    let verdict = decide_for(
        "10.0.0.5",
        3,
        &[
            reputation(80.0),
            DetectionResult::abstain(STATISTICAL_DETECTOR, FailureKind::ModelUnavailable, "no model"),
        ],
        &DecisionPolicy::default(),
    );

    assert_eq!(verdict.status, VerdictStatus::Anomalous);
    assert_eq!(verdict.category, AnomalyCategory::KnownBadReputation);
    assert!((verdict.confidence - 0.8).abs() < 1e-9);
    assert_eq!(verdict.identity, "10.0.0.5");
    assert_eq!(verdict.window, 3);
    assert_eq!(verdict.contributing_detectors, vec![REPUTATION_DETECTOR]);
    assert_eq!(
        verdict.abstentions,
        vec![(STATISTICAL_DETECTOR.to_string(), FailureKind::ModelUnavailable)]
    );
}

#[test]
fn test_semantic_benign_with_other_failures() {
    let results = [
        DetectionResult::abstain(REPUTATION_DETECTOR, FailureKind::Timeout, "timed out"),
        DetectionResult::abstain(STATISTICAL_DETECTOR, FailureKind::ModelUnavailable, "no model"),
        DetectionResult::benign(SEMANTIC_DETECTOR, 0.9, "normal traffic"),
    ];

    let verdict = decide(&results, &DecisionPolicy::default());
    assert_eq!(verdict.status, VerdictStatus::Benign);
    assert!((verdict.confidence - 0.9).abs() < 1e-9);
    assert!(!verdict.is_anomaly());
    assert_eq!(verdict.abstentions.len(), 2);
}

#[test]
fn test_all_abstain_is_unknown_not_benign() {
    let results = [
        DetectionResult::abstain(REPUTATION_DETECTOR, FailureKind::Network, "down"),
        DetectionResult::abstain(SEMANTIC_DETECTOR, FailureKind::MalformedResponse, "bad json"),
    ];

    let verdict = decide(&results, &DecisionPolicy::default());
    assert_eq!(verdict.status, VerdictStatus::Unknown);
    assert!(verdict.is_unknown());
    assert!(verdict.contributing_detectors.is_empty());

    let empty = decide(&[], &DecisionPolicy::default());
    assert_eq!(empty.status, VerdictStatus::Unknown);
}

#[test]
fn test_threshold_comparison_is_strict() {
    let policy = DecisionPolicy::default();

    let at = decide(&[reputation(25.0)], &policy);
    assert_eq!(at.status, VerdictStatus::Benign);
    assert!((at.confidence - 0.75).abs() < 1e-9);

    let above = decide(&[reputation(26.0)], &policy);
    assert_eq!(above.status, VerdictStatus::Anomalous);
}

#[test]
fn test_anomaly_wins_regardless_of_benign_votes() {
    let results = [
        DetectionResult::benign(SEMANTIC_DETECTOR, 0.99, "looks fine"),
        DetectionResult::benign(THRESHOLD_DETECTOR, 1.0, "no rule matched"),
        DetectionResult::anomaly(STATISTICAL_DETECTOR, 0.6, AnomalyCategory::StatisticalAnomaly, "rf"),
        DetectionResult::abstain(REPUTATION_DETECTOR, FailureKind::RateLimited, "limit"),
    ];

    let verdict = decide(&results, &DecisionPolicy::default());
    assert_eq!(verdict.status, VerdictStatus::Anomalous);
    assert_eq!(verdict.category, AnomalyCategory::StatisticalAnomaly);
    assert_eq!(verdict.contributing_detectors.len(), 3);
}

#[test]
fn test_highest_confidence_chooses_category() {
    let results = vec![
        reputation(60.0),
        DetectionResult::anomaly(THRESHOLD_DETECTOR, 0.95, AnomalyCategory::BruteForce, "12 attempts"),
        DetectionResult::anomaly(SEMANTIC_DETECTOR, 0.7, AnomalyCategory::PortScan, "scan"),
    ];

    let verdict = decide(&results, &DecisionPolicy::default());
    assert_eq!(verdict.category, AnomalyCategory::BruteForce);
    assert!((verdict.confidence - 0.95).abs() < 1e-9);
}

#[test]
fn test_order_independent() {
    let mut results = vec![
        DetectionResult::anomaly(SEMANTIC_DETECTOR, 0.9, AnomalyCategory::PortScan, "a"),
        DetectionResult::anomaly(THRESHOLD_DETECTOR, 0.9, AnomalyCategory::BruteForce, "b"),
        DetectionResult::abstain(REPUTATION_DETECTOR, FailureKind::Timeout, "c"),
        DetectionResult::benign(STATISTICAL_DETECTOR, 0.4, "d"),
    ];
    let policy = DecisionPolicy::default();
    let first = decide(&results, &policy);

    results.reverse();
    let second = decide(&results, &policy);
    results.swap(0, 2);
    let third = decide(&results, &policy);

    for v in [&second, &third] {
        assert_eq!(v.status, first.status);
        assert_eq!(v.category, first.category);
        assert_eq!(v.confidence, first.confidence);
        assert_eq!(v.contributing_detectors, first.contributing_detectors);
        assert_eq!(v.abstentions, first.abstentions);
    }
    // tie at 0.9 resolves to the lower detector id
    assert_eq!(first.category, AnomalyCategory::PortScan);
}

#[test]
fn test_custom_thresholds() {
    let policy = DecisionPolicy::default().with_threshold(SEMANTIC_DETECTOR, 0.95);
    let verdict = decide(
        &[DetectionResult::anomaly(SEMANTIC_DETECTOR, 0.9, AnomalyCategory::Other, "x")],
        &policy,
    );
    assert_eq!(verdict.status, VerdictStatus::Benign);
    assert_eq!(policy.threshold_for("unregistered"), policy.default_threshold);
}

#[test]
fn test_category_from_label() {
    assert_eq!(AnomalyCategory::from_label("port_scan"), AnomalyCategory::PortScan);
    assert_eq!(AnomalyCategory::from_label("DDoS"), AnomalyCategory::DosAttack);
    assert_eq!(AnomalyCategory::from_label("Brute Force"), AnomalyCategory::BruteForce);
    assert_eq!(AnomalyCategory::from_label("malware-c2"), AnomalyCategory::MalwareC2);
    assert_eq!(AnomalyCategory::from_label("none"), AnomalyCategory::None);
    assert_eq!(AnomalyCategory::from_label("weird"), AnomalyCategory::Other);
}

#[test]
fn test_result_constructors_clamp() {
    let r = DetectionResult::anomaly("x", 1.7, AnomalyCategory::Other, "");
    assert_eq!(r.confidence, 1.0);
    let r = DetectionResult::benign("x", f64::NAN, "");
    assert_eq!(r.confidence, 0.0);
    let r = DetectionResult::abstain("x", FailureKind::Timeout, "t");
    assert!(r.is_abstention());
    assert!(!r.is_anomaly);
    assert_eq!(r.category, AnomalyCategory::Unavailable);
    assert!(FailureKind::Timeout.is_hard());
    assert!(!FailureKind::NotConfigured.is_hard());
}

#[test]
fn test_verdict_serializes_lowercase_status() {
    let v = decide(&[reputation(90.0)], &DecisionPolicy::default());
    let json = serde_json::to_value(&v).unwrap();
    assert_eq!(json["status"], "anomalous");
    assert_eq!(json["category"], "known-bad-reputation");
}
