//! Response Executor
//!
//! Turns an anomalous verdict into at most one containment command per
//! identity per audit window. Decisions for the same identity are serialized
//! through a per-identity lock; different identities never wait on each other.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::enforcer::EnforcementPoint;
use super::types::{EnforcementError, ResponseAction, ResponseRecord};
use crate::logic::config::{AuditConfig, EnforcementConfig};
use crate::logic::threat::ThreatVerdict;

pub struct ResponseExecutor {
    enforcer: Arc<dyn EnforcementPoint>,
    block_duration: String,
    action_threshold: f64,
    auto_block: bool,
    window: Duration,
    blocked: Mutex<HashMap<String, Instant>>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ResponseExecutor {
    pub fn new(
        enforcer: Arc<dyn EnforcementPoint>,
        enforcement: &EnforcementConfig,
        audit: &AuditConfig,
    ) -> Self {
        Self {
            enforcer,
            block_duration: enforcement.block_timeout.clone(),
            action_threshold: enforcement.action_threshold,
            auto_block: enforcement.auto_block,
            window: audit.window,
            blocked: Mutex::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn enforcer_name(&self) -> &str {
        self.enforcer.name()
    }

    /// Contained within the current audit window
    pub fn is_blocked(&self, identity: &str) -> bool {
        self.blocked
            .lock()
            .get(identity)
            .is_some_and(|at| at.elapsed() < self.window)
    }

    /// Identities remembered as blocked, expired entries included until the next block
    pub fn tracked_blocks(&self) -> usize {
        self.blocked.lock().len()
    }

    /// Per-identity locks currently allocated
    pub fn tracked_locks(&self) -> usize {
        self.locks.lock().len()
    }

    fn identity_lock(&self, identity: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(locks.entry(identity.to_string()).or_default())
    }

    /// Drop the identity's lock once no other decision holds or awaits it
    fn release_lock(&self, identity: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock();
        drop(lock);
        if locks.get(identity).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(identity);
        }
    }

    fn remember_block(&self, identity: &str) {
        let mut blocked = self.blocked.lock();
        blocked.retain(|_, at| at.elapsed() < self.window);
        blocked.insert(identity.to_string(), Instant::now());
    }

    pub async fn respond(&self, verdict: &ThreatVerdict, identity: &str) -> ResponseRecord {
        if !verdict.is_anomaly() {
            return ResponseRecord::new(
                identity,
                ResponseAction::NoAction,
                format!("verdict {}", verdict.status.as_str()),
            );
        }

        if verdict.confidence <= self.action_threshold {
            return ResponseRecord::new(
                identity,
                ResponseAction::NoAction,
                format!(
                    "confidence {:.2} not above action threshold {:.2}",
                    verdict.confidence, self.action_threshold
                ),
            );
        }

        if !self.auto_block {
            return ResponseRecord::new(
                identity,
                ResponseAction::NoAction,
                format!("{} ({}), automatic blocking disabled", verdict.category, verdict.description),
            );
        }

        let lock = self.identity_lock(identity);
        let record = {
            let _guard = lock.lock().await;
            self.contain(verdict, identity).await
        };
        self.release_lock(identity, lock);
        record
    }

    /// Runs with the identity's lock held
    async fn contain(&self, verdict: &ThreatVerdict, identity: &str) -> ResponseRecord {
        if self.is_blocked(identity) {
            return ResponseRecord::new(
                identity,
                ResponseAction::Skipped,
                "already blocked in the current audit window",
            );
        }

        let outcome = match identity.trim().parse::<IpAddr>() {
            Ok(ip) => self.enforcer.block(ip, &self.block_duration).await,
            Err(_) => Err(EnforcementError::InvalidIdentity(identity.to_string())),
        };

        match outcome {
            Ok(()) => {
                self.remember_block(identity);
                log::warn!(
                    "Blocked {} for {} via {} ({}, confidence {:.2})",
                    identity,
                    self.block_duration,
                    self.enforcer.name(),
                    verdict.category,
                    verdict.confidence
                );
                ResponseRecord::new(
                    identity,
                    ResponseAction::Blocked,
                    format!(
                        "{} with confidence {:.2}, blocked for {}",
                        verdict.category, verdict.confidence, self.block_duration
                    ),
                )
            }
            Err(e) => {
                log::error!("Containment of {} failed: {}", identity, e);
                ResponseRecord::new(identity, ResponseAction::Failed, e.to_string())
            }
        }
    }
}
