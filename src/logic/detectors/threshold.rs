//! Threshold Detector
//!
//! Signature rules over the identity's summary and connection records.
//! The strongest rule wins. Needs no backend; abstains only when the identity
//! has no failed attempts and no connection records to judge.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;

use super::{DetectionInput, Detector};
use crate::logic::ingest::ConnectionRecord;
use crate::logic::threat::{AnomalyCategory, DetectionResult, FailureKind, THRESHOLD_DETECTOR};

// ============================================================================
// RULE CONSTANTS
// ============================================================================

/// Services commonly targeted by password guessing (ssh, telnet, rdp, vnc, winbox)
pub const AUTH_PORTS: [u16; 5] = [22, 23, 3389, 5900, 8291];
const BRUTE_FORCE_MIN_PROBABILITY: f64 = 0.7;

pub const PORT_SCAN_UNIQUE_PORTS: usize = 15;
const PORT_SCAN_MIN_PROBABILITY: f64 = 0.7;

pub const DOS_WINDOW_SECS: i64 = 10;
pub const DOS_PACKET_RATE: f64 = 100.0;
pub const DOS_BYTE_RATE: f64 = 10_000.0;
const DOS_MIN_PROBABILITY: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleHit {
    pub category: AnomalyCategory,
    pub probability: f64,
    pub is_anomaly: bool,
}

pub struct ThresholdDetector {
    brute_force_attempts: u32,
}

impl ThresholdDetector {
    pub fn new(brute_force_attempts: u32) -> Self {
        Self {
            brute_force_attempts: brute_force_attempts.max(1),
        }
    }

    pub fn brute_force(&self, input: &DetectionInput) -> RuleHit {
        let attempts = auth_attempts(input);
        let required = self.brute_force_attempts as u64;

        let ratio = (attempts as f64 / required as f64).min(1.0);
        let probability = if attempts == 0 { 0.0 } else { ratio * 0.8 + 0.2 };

        RuleHit {
            category: AnomalyCategory::BruteForce,
            probability,
            is_anomaly: attempts >= required && probability >= BRUTE_FORCE_MIN_PROBABILITY,
        }
    }

    pub fn port_scan(&self, batch: &[ConnectionRecord]) -> RuleHit {
        let ports: HashSet<u16> = batch.iter().map(|r| r.dst_port).filter(|p| *p != 0).collect();
        let probability = (ports.len() as f64 / PORT_SCAN_UNIQUE_PORTS as f64).min(1.0) * 0.9;

        RuleHit {
            category: AnomalyCategory::PortScan,
            probability,
            is_anomaly: ports.len() >= PORT_SCAN_UNIQUE_PORTS
                && probability >= PORT_SCAN_MIN_PROBABILITY,
        }
    }

    pub fn dos(&self, batch: &[ConnectionRecord]) -> RuleHit {
        // Window ends at the newest timestamped record; untimed records all count
        let newest = batch.iter().filter_map(|r| r.timestamp).max();
        let in_window = |r: &&ConnectionRecord| match (newest, r.timestamp) {
            (Some(end), Some(ts)) => (end - ts).num_seconds() < DOS_WINDOW_SECS,
            _ => true,
        };

        let (packets, bytes) = batch
            .iter()
            .filter(in_window)
            .fold((0u64, 0u64), |(p, b), r| (p + r.packet_count, b + r.bytes));

        let window = DOS_WINDOW_SECS as f64;
        let packet_ratio = (packets as f64 / window / DOS_PACKET_RATE).min(1.0);
        let byte_ratio = (bytes as f64 / window / DOS_BYTE_RATE).min(1.0);
        let probability = packet_ratio * 0.7 + byte_ratio * 0.3;

        RuleHit {
            category: AnomalyCategory::DosAttack,
            probability,
            is_anomaly: probability >= DOS_MIN_PROBABILITY,
        }
    }

    pub fn evaluate(&self, input: &DetectionInput) -> DetectionResult {
        if input.summary.attempts == 0 && input.batch.is_empty() {
            return DetectionResult::abstain(
                THRESHOLD_DETECTOR,
                FailureKind::NotConfigured,
                "no activity to evaluate",
            );
        }

        let hits = [
            self.brute_force(input),
            self.port_scan(&input.batch),
            self.dos(&input.batch),
        ];

        // Anomalous hits outrank quiet ones, then probability; first rule wins ties
        let best = hits[1..].iter().copied().fold(hits[0], |best, hit| {
            let better = (hit.is_anomaly && !best.is_anomaly)
                || (hit.is_anomaly == best.is_anomaly && hit.probability > best.probability);
            if better { hit } else { best }
        });

        if best.is_anomaly {
            let description = match best.category {
                AnomalyCategory::BruteForce => format!(
                    "possible brute force: {} attempts against authentication services",
                    auth_attempts(input)
                ),
                AnomalyCategory::PortScan => "port scanning: many destination ports in a short window".to_string(),
                _ => "possible DoS: high packet rate toward target".to_string(),
            };
            DetectionResult::anomaly(THRESHOLD_DETECTOR, best.probability, best.category, description)
        } else {
            DetectionResult::benign(
                THRESHOLD_DETECTOR,
                1.0 - best.probability,
                "no signature rule matched",
            )
        }
    }
}

/// Failed logins, or connections to auth ports when only flows are known
fn auth_attempts(input: &DetectionInput) -> u64 {
    let auth_connections = input
        .batch
        .iter()
        .filter(|r| AUTH_PORTS.contains(&r.dst_port))
        .count() as u64;
    input.summary.attempts.max(auth_connections)
}

#[async_trait]
impl Detector for ThresholdDetector {
    fn id(&self) -> &str {
        THRESHOLD_DETECTOR
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(1)
    }

    async fn classify(&self, input: &DetectionInput) -> DetectionResult {
        self.evaluate(input)
    }
}
