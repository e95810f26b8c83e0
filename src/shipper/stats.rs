use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by the registry and read without taking its lock
#[derive(Debug, Default)]
pub struct ShipperStats {
    events_accepted: AtomicU64,
    events_dropped: AtomicU64,
    events_oversized: AtomicU64,
    events_submitted: AtomicU64,
    events_rejected: AtomicU64,
    flushes_succeeded: AtomicU64,
    flushes_failed: AtomicU64,
    provision_failures: AtomicU64,
    token_reconciliations: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub events_accepted: u64,
    pub events_dropped: u64,
    pub events_oversized: u64,
    pub events_submitted: u64,
    pub events_rejected: u64,
    pub flushes_succeeded: u64,
    pub flushes_failed: u64,
    pub provision_failures: u64,
    pub token_reconciliations: u64,
}

impl ShipperStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn event_accepted(&self) {
        self.events_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn event_dropped(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn event_oversized(&self) {
        self.events_oversized.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn flush_succeeded(&self, events: usize) {
        self.flushes_succeeded.fetch_add(1, Ordering::Relaxed);
        self.events_submitted
            .fetch_add(events as u64, Ordering::Relaxed);
    }

    /// A batch the remote refused for good; its events are gone
    pub(crate) fn batch_rejected(&self, events: usize) {
        self.events_rejected
            .fetch_add(events as u64, Ordering::Relaxed);
    }

    pub(crate) fn flush_failed(&self) {
        self.flushes_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn provision_failed(&self) {
        self.provision_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn token_reconciled(&self) {
        self.token_reconciliations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            events_accepted: self.events_accepted.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            events_oversized: self.events_oversized.load(Ordering::Relaxed),
            events_submitted: self.events_submitted.load(Ordering::Relaxed),
            events_rejected: self.events_rejected.load(Ordering::Relaxed),
            flushes_succeeded: self.flushes_succeeded.load(Ordering::Relaxed),
            flushes_failed: self.flushes_failed.load(Ordering::Relaxed),
            provision_failures: self.provision_failures.load(Ordering::Relaxed),
            token_reconciliations: self.token_reconciliations.load(Ordering::Relaxed),
        }
    }
}
