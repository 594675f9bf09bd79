//! Reputation Detector
//!
//! Score > threshold (default 25/100) means known-bad, confidence = score/100.
//! Lookups are cached per identity and limited per minute.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{DetectionInput, Detector};
use crate::logic::config::ReputationConfig;
use crate::logic::external_intel::{ReputationError, ReputationLookup, ReputationReport};
use crate::logic::threat::{AnomalyCategory, DetectionResult, FailureKind, REPUTATION_DETECTOR};

const CACHE_MAX_SIZE: usize = 1000;

struct RateWindow {
    started: Instant,
    count: u32,
}

pub struct ReputationDetector {
    lookup: Arc<dyn ReputationLookup>,
    threshold: u8,
    timeout: Duration,
    cache_ttl: Duration,
    max_per_minute: u32,
    cache: Mutex<HashMap<String, (Instant, ReputationReport)>>,
    window: Mutex<RateWindow>,
}

impl ReputationDetector {
    pub fn new(lookup: Arc<dyn ReputationLookup>, config: &ReputationConfig) -> Self {
        Self {
            lookup,
            threshold: config.threshold,
            timeout: config.timeout,
            cache_ttl: config.cache_ttl,
            max_per_minute: config.max_requests_per_minute,
            cache: Mutex::new(HashMap::new()),
            window: Mutex::new(RateWindow {
                started: Instant::now(),
                count: 0,
            }),
        }
    }

    fn cached(&self, ip: &str) -> Option<ReputationReport> {
        let cache = self.cache.lock();
        cache
            .get(ip)
            .filter(|(at, _)| at.elapsed() < self.cache_ttl)
            .map(|(_, report)| report.clone())
    }

    fn remember(&self, ip: &str, report: &ReputationReport) {
        let mut cache = self.cache.lock();
        if cache.len() >= CACHE_MAX_SIZE {
            let ttl = self.cache_ttl;
            cache.retain(|_, (at, _)| at.elapsed() < ttl);
        }
        if cache.len() < CACHE_MAX_SIZE {
            cache.insert(ip.to_string(), (Instant::now(), report.clone()));
        }
    }

    /// Take one request slot for the current minute
    fn acquire_slot(&self) -> Result<(), u64> {
        let mut window = self.window.lock();
        let elapsed = window.started.elapsed();
        if elapsed >= Duration::from_secs(60) {
            window.started = Instant::now();
            window.count = 0;
        }
        if window.count >= self.max_per_minute {
            return Err(60u64.saturating_sub(elapsed.as_secs()));
        }
        window.count += 1;
        Ok(())
    }

    fn judge(&self, report: &ReputationReport) -> DetectionResult {
        let score = report.score.min(100);
        let ratio = score as f64 / 100.0;

        if report.is_whitelisted {
            return DetectionResult::benign(
                REPUTATION_DETECTOR,
                1.0 - ratio,
                format!("{} (whitelisted)", report.describe()),
            );
        }

        if score > self.threshold {
            let mut description = format!("{} [severity {}]", report.describe(), report.severity().as_str());
            if let Some(primary) = report.primary_category() {
                description.push_str(&format!(" primary {}", primary));
            }
            DetectionResult::anomaly(
                REPUTATION_DETECTOR,
                ratio,
                AnomalyCategory::KnownBadReputation,
                description,
            )
        } else {
            DetectionResult::benign(REPUTATION_DETECTOR, 1.0 - ratio, report.describe())
        }
    }
}

fn failure_kind(error: &ReputationError) -> FailureKind {
    match error {
        ReputationError::NotConfigured | ReputationError::InvalidIdentity(_) => {
            FailureKind::NotConfigured
        }
        ReputationError::InvalidApiKey => FailureKind::Backend,
        ReputationError::RateLimited { .. } => FailureKind::RateLimited,
        ReputationError::Timeout => FailureKind::Timeout,
        ReputationError::Network(_) => FailureKind::Network,
        ReputationError::Malformed(_) => FailureKind::MalformedResponse,
    }
}

#[async_trait]
impl Detector for ReputationDetector {
    fn id(&self) -> &str {
        REPUTATION_DETECTOR
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn classify(&self, input: &DetectionInput) -> DetectionResult {
        let ip = input.identity.trim();
        if ip.parse::<IpAddr>().is_err() {
            return DetectionResult::abstain(
                REPUTATION_DETECTOR,
                FailureKind::NotConfigured,
                format!("identity {:?} is not an IP address", ip),
            );
        }

        if let Some(report) = self.cached(ip) {
            log::debug!("Using cached reputation for {}", ip);
            return self.judge(&report);
        }

        if let Err(retry_after) = self.acquire_slot() {
            return DetectionResult::abstain(
                REPUTATION_DETECTOR,
                FailureKind::RateLimited,
                format!("local request limit reached, retry in {}s", retry_after),
            );
        }

        match self.lookup.check(ip).await {
            Ok(report) => {
                self.remember(ip, &report);
                self.judge(&report)
            }
            Err(e) => {
                log::warn!("Reputation lookup for {} failed: {}", ip, e);
                DetectionResult::abstain(REPUTATION_DETECTOR, failure_kind(&e), e.to_string())
            }
        }
    }
}
