//! Aggregator Store
//!
//! Per-identity state behind its own lock. The outer map is only written when
//! a new identity appears or the window is flushed, so updates for different
//! identities never contend on the same mutex.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock, RwLockWriteGuard};

use super::report::WindowReport;
use super::types::{FailedAttempt, SourceSummary};
use crate::logic::ingest::{parse_failed_password, RawEvent};

struct Entry {
    summary: SourceSummary,
    /// (global sequence, attempt) so the report can restore stream order
    attempts: Vec<(u64, FailedAttempt)>,
}

type Shard = Arc<Mutex<Entry>>;

pub struct Aggregator {
    entries: RwLock<HashMap<String, Shard>>,
    sequence: AtomicU64,
    window_id: AtomicU64,
    window_start: Mutex<DateTime<Utc>>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            sequence: AtomicU64::new(0),
            window_id: AtomicU64::new(1),
            window_start: Mutex::new(Utc::now()),
        }
    }

    /// Fold one failed-attempt event into its identity's summary.
    /// Returns the updated summary.
    pub fn observe(&self, event: RawEvent) -> SourceSummary {
        // Holding the read guard keeps `flush` from draining mid-update
        let entries = self.entries.read();
        if let Some(shard) = entries.get(&event.source) {
            let shard = Arc::clone(shard);
            let summary = self.apply(&shard, &event);
            drop(entries);
            return summary;
        }
        drop(entries);

        let mut entries = self.entries.write();
        let shard = Arc::clone(entries.entry(event.source.clone()).or_insert_with(|| {
            Arc::new(Mutex::new(Entry {
                summary: SourceSummary::new(event.source.clone()),
                attempts: Vec::new(),
            }))
        }));
        let entries = RwLockWriteGuard::downgrade(entries);
        let summary = self.apply(&shard, &event);
        drop(entries);
        summary
    }

    fn apply(&self, shard: &Shard, event: &RawEvent) -> SourceSummary {
        let mut entry = shard.lock();
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        entry.summary.record(event);
        entry.attempts.push((seq, FailedAttempt::from(event)));
        entry.summary.clone()
    }

    /// Match a raw text line against the failed-password pattern and observe it.
    /// Non-matching lines are dropped silently.
    pub fn observe_line(&self, line: &str) -> Option<SourceSummary> {
        parse_failed_password(line).map(|event| self.observe(event))
    }

    /// Current summary for an identity, without flushing
    pub fn snapshot(&self, identity: &str) -> Option<SourceSummary> {
        self.entries
            .read()
            .get(identity)
            .map(|shard| shard.lock().summary.clone())
    }

    /// Number of identities seen in the current window
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn window_id(&self) -> u64 {
        self.window_id.load(Ordering::SeqCst)
    }

    /// Drain all summaries and start a new window
    pub fn flush(&self) -> Vec<SourceSummary> {
        self.flush_window().summaries()
    }

    /// Drain all state into a window report and start a new window
    pub fn flush_window(&self) -> WindowReport {
        let drained: Vec<Shard> = {
            let mut entries = self.entries.write();
            entries.drain().map(|(_, shard)| shard).collect()
        };

        let window_end = Utc::now();
        let window_start = std::mem::replace(&mut *self.window_start.lock(), window_end);
        let window_id = self.window_id.fetch_add(1, Ordering::SeqCst);

        let mut summaries = Vec::with_capacity(drained.len());
        let mut attempts = Vec::new();
        for shard in drained {
            let mut entry = shard.lock();
            attempts.append(&mut entry.attempts);
            summaries.push(std::mem::take(&mut entry.summary));
        }
        attempts.sort_by_key(|(seq, _)| *seq);

        log::info!(
            "Window {} flushed: {} identities, {} attempts",
            window_id,
            summaries.len(),
            attempts.len()
        );

        WindowReport::build(
            window_id,
            window_start,
            window_end,
            summaries,
            attempts.into_iter().map(|(_, a)| a).collect(),
        )
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}
