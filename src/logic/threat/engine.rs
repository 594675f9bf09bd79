//! Decision Engine
//!
//! Reconciles a set of DetectionResults into one ThreatVerdict.
//! "Most suspicious wins": any activated detector makes the verdict anomalous.
//! Abstentions are excluded entirely; if nothing participates the verdict is
//! Unknown, never Benign.

use std::cmp::Ordering;

use chrono::Utc;

use super::rules::DecisionPolicy;
use super::types::{AnomalyCategory, DetectionResult, ThreatVerdict, VerdictStatus};

/// Higher confidence first, then lowest detector id
fn stronger(a: &DetectionResult, b: &DetectionResult) -> Ordering {
    a.confidence
        .total_cmp(&b.confidence)
        .then_with(|| b.detector_id.cmp(&a.detector_id))
}

/// Reconcile results for an unnamed identity. Use `decide_for` to bind one.
pub fn decide(results: &[DetectionResult], policy: &DecisionPolicy) -> ThreatVerdict {
    decide_for("", 0, results, policy)
}

/// Reconcile results into the verdict for `identity` in `window`.
/// The outcome depends only on the set of results, not their order.
pub fn decide_for(
    identity: &str,
    window: u64,
    results: &[DetectionResult],
    policy: &DecisionPolicy,
) -> ThreatVerdict {
    let mut abstentions: Vec<(String, _)> = results
        .iter()
        .filter_map(|r| r.failure.map(|kind| (r.detector_id.clone(), kind)))
        .collect();
    abstentions.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.as_str().cmp(b.1.as_str())));

    let participating: Vec<&DetectionResult> =
        results.iter().filter(|r| !r.is_abstention()).collect();

    let mut contributing: Vec<String> =
        participating.iter().map(|r| r.detector_id.clone()).collect();
    contributing.sort();
    contributing.dedup();

    let verdict = |status, confidence, category, description: String| ThreatVerdict {
        identity: identity.to_string(),
        window,
        status,
        confidence,
        contributing_detectors: contributing.clone(),
        category,
        description,
        abstentions: abstentions.clone(),
        decided_at: Utc::now(),
    };

    if participating.is_empty() {
        return verdict(
            VerdictStatus::Unknown,
            0.0,
            AnomalyCategory::None,
            "all detectors abstained".to_string(),
        );
    }

    // ===== ANOMALOUS =====
    let winner = participating
        .iter()
        .filter(|r| policy.is_activated(r))
        .max_by(|a, b| stronger(a, b));

    if let Some(winner) = winner {
        return verdict(
            VerdictStatus::Anomalous,
            winner.confidence,
            winner.category,
            format!("[{}] {}", winner.detector_id, winner.description),
        );
    }

    // ===== BENIGN =====
    let clean = participating
        .iter()
        .filter(|r| !r.is_anomaly)
        .max_by(|a, b| stronger(a, b));

    match clean {
        Some(best) => verdict(
            VerdictStatus::Benign,
            best.confidence,
            AnomalyCategory::None,
            format!("[{}] {}", best.detector_id, best.description),
        ),
        None => {
            // Only sub-threshold anomalies took part
            let strongest = participating
                .iter()
                .max_by(|a, b| stronger(a, b))
                .map(|r| r.confidence)
                .unwrap_or(0.0);
            verdict(
                VerdictStatus::Benign,
                1.0 - strongest,
                AnomalyCategory::None,
                "anomaly signals below activation threshold".to_string(),
            )
        }
    }
}
