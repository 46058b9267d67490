//! Process-local lock provider.
//!
//! Leases live in a `DashMap` keyed by lock key. Expiry is measured on the Tokio
//! clock, so tests can fast-forward through leases with a paused runtime.

use super::{acquire_with_retry, LockHandle, LockProvider};
use crate::constants::DEFAULT_LOCK_RETRY_INTERVAL;
use crate::error::LockResult;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, instrument};

#[derive(Debug, Clone)]
struct Lease {
    token: String,
    expires_at: Instant,
}

impl Lease {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug)]
pub struct InMemoryLockProvider {
    leases: DashMap<String, Lease>,
    retry_interval: Duration,
}

impl Default for InMemoryLockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLockProvider {
    pub fn new() -> Self {
        Self::with_retry_interval(DEFAULT_LOCK_RETRY_INTERVAL)
    }

    pub fn with_retry_interval(retry_interval: Duration) -> Self {
        Self {
            leases: DashMap::new(),
            retry_interval,
        }
    }

    /// Atomic set-if-absent-or-expired
    fn try_acquire_once(&self, handle: &LockHandle) -> bool {
        let now = Instant::now();
        let lease = Lease {
            token: handle.token().to_string(),
            expires_at: now + handle.lease_time(),
        };

        match self.leases.entry(handle.key().to_string()) {
            Entry::Vacant(entry) => {
                entry.insert(lease);
                true
            }
            Entry::Occupied(mut entry) if entry.get().is_expired(now) => {
                debug!(lock_key = handle.key(), "Taking over expired lease");
                entry.insert(lease);
                true
            }
            Entry::Occupied(_) => false,
        }
    }
}

#[async_trait]
impl LockProvider for InMemoryLockProvider {
    #[instrument(skip(self, handle), fields(lock_key = handle.key()))]
    async fn try_acquire(&self, handle: &LockHandle) -> LockResult<bool> {
        acquire_with_retry(handle.wait_time(), self.retry_interval, move || async move {
            Ok(self.try_acquire_once(handle))
        })
        .await
    }

    async fn release(&self, handle: &LockHandle) -> LockResult<bool> {
        let removed = self
            .leases
            .remove_if(handle.key(), |_, lease| lease.token == handle.token());
        Ok(removed.is_some())
    }

    async fn is_held_by_current_caller(&self, handle: &LockHandle) -> LockResult<bool> {
        let now = Instant::now();
        Ok(self
            .leases
            .get(handle.key())
            .map(|lease| lease.token == handle.token() && !lease.is_expired(now))
            .unwrap_or(false))
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}
