//! Process-local coordination counters.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters updated by every coordinator call
#[derive(Debug, Default)]
pub struct CoordinatorStats {
    cache_hits: AtomicU64,
    double_check_hits: AtomicU64,
    generations: AtomicU64,
    waits_resolved: AtomicU64,
    waits_exhausted: AtomicU64,
    generation_failures: AtomicU64,
    lock_backend_errors: AtomicU64,
    store_errors: AtomicU64,
}

/// Point-in-time copy of [`CoordinatorStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub cache_hits: u64,
    pub double_check_hits: u64,
    pub generations: u64,
    pub waits_resolved: u64,
    pub waits_exhausted: u64,
    pub generation_failures: u64,
    pub lock_backend_errors: u64,
    pub store_errors: u64,
}

impl StatsSnapshot {
    /// Calls that returned a record
    pub fn successes(&self) -> u64 {
        self.cache_hits + self.double_check_hits + self.generations + self.waits_resolved
    }
}

impl CoordinatorStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_double_check_hit(&self) {
        self.double_check_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_generation(&self) {
        self.generations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_wait_resolved(&self) {
        self.waits_resolved.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_wait_exhausted(&self) {
        self.waits_exhausted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_generation_failure(&self) {
        self.generation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_lock_backend_error(&self) {
        self.lock_backend_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_store_error(&self) {
        self.store_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            double_check_hits: self.double_check_hits.load(Ordering::Relaxed),
            generations: self.generations.load(Ordering::Relaxed),
            waits_resolved: self.waits_resolved.load(Ordering::Relaxed),
            waits_exhausted: self.waits_exhausted.load(Ordering::Relaxed),
            generation_failures: self.generation_failures.load(Ordering::Relaxed),
            lock_backend_errors: self.lock_backend_errors.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
        }
    }
}
