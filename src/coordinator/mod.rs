//! # Content Coordinator
//!
//! Cache-aside, single-flight generation of per-day content.
//!
//! ## Overview
//!
//! Every request for `(category, date)` is resolved by exactly one of three
//! paths:
//!
//! 1. **Cache hit**: the record store already holds a record for the key.
//! 2. **Winner**: the caller takes the per-key distributed lock, re-checks the
//!    store, runs the generator and persists the result.
//! 3. **Loser**: the caller could not take the lock (or the lock backend
//!    failed) and polls the store on a bounded backoff until the winner's
//!    record appears.
//!
//! Across any number of concurrent callers and processes the generator runs at
//! most once per key while the lease is respected, and every successful caller
//! receives the same stored record.
//!
//! ## State Machine
//!
//! ```text
//! CheckCache ──hit──────────────────────────────────────────────▶ Done
//!     │ miss
//!     ▼
//! AcquireLock ──denied / backend error──▶ WaitAndPoll ──found──▶ Done
//!     │ granted                               │ exhausted
//!     ▼                                       ▼
//! DoubleCheck ──found──▶ (release) ──▶ Done  Failed
//!     │ missing
//!     ▼
//! Generate ──error──▶ (release) ──▶ Failed
//!     │ ok
//!     ▼
//! Persist ──▶ (release) ──▶ Done
//! ```
//!
//! The lock is released on every path out of `DoubleCheck`, `Generate` and
//! `Persist`, including cancellation of the caller's future.

pub mod clock;
pub mod poll;
pub mod state;
pub mod stats;

pub use clock::{Clock, FixedClock, SystemClock};
pub use poll::PollSchedule;
pub use state::{CoordinatorState, Outcome};
pub use stats::{CoordinatorStats, StatsSnapshot};

use crate::config::CoordinatorSettings;
use crate::constants::{DEFAULT_LOCK_LEASE_TIME, DEFAULT_LOCK_NAMESPACE, DEFAULT_LOCK_WAIT_TIME};
use crate::error::{CoordinatorError, CoordinatorResult, GenerationFailure, GeneratorError};
use crate::generator::ContentGenerator;
use crate::lock::{LockGuard, LockHandle, LockProvider};
use crate::logging::log_coordination_event;
use crate::models::{ContentKey, ContentRecord, NewContentRecord};
use crate::store::RecordStore;
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Tunables for one coordinator instance
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorOptions {
    /// Prefix of every lock key
    pub namespace: String,
    /// How long a caller competes for the lock before falling back to polling
    pub wait_time: Duration,
    /// How long a winner's lock survives without release
    pub lease_time: Duration,
    pub poll: PollSchedule,
}

impl CoordinatorOptions {
    pub fn from_settings(settings: &CoordinatorSettings) -> Self {
        Self {
            namespace: settings.lock.namespace.clone(),
            wait_time: settings.lock.wait_time(),
            lease_time: settings.lock.lease_time(),
            poll: PollSchedule::from_settings(&settings.poll),
        }
    }
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_LOCK_NAMESPACE.to_string(),
            wait_time: DEFAULT_LOCK_WAIT_TIME,
            lease_time: DEFAULT_LOCK_LEASE_TIME,
            poll: PollSchedule::default(),
        }
    }
}

/// Single-flight coordinator over a record store, a lock provider and a generator
#[derive(Clone)]
pub struct ContentCoordinator {
    store: Arc<dyn RecordStore>,
    lock: Arc<dyn LockProvider>,
    generator: Arc<dyn ContentGenerator>,
    options: CoordinatorOptions,
    clock: Arc<dyn Clock>,
    stats: Arc<CoordinatorStats>,
}

impl std::fmt::Debug for ContentCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentCoordinator")
            .field("store", &self.store.store_name())
            .field("lock", &self.lock.provider_name())
            .field("generator", &self.generator.generator_name())
            .field("options", &self.options)
            .finish()
    }
}

impl ContentCoordinator {
    pub fn new(
        store: Arc<dyn RecordStore>,
        lock: Arc<dyn LockProvider>,
        generator: Arc<dyn ContentGenerator>,
        options: CoordinatorOptions,
    ) -> Self {
        Self {
            store,
            lock,
            generator,
            options,
            clock: Arc::new(SystemClock),
            stats: Arc::new(CoordinatorStats::new()),
        }
    }

    /// Replace the clock used by [`get_daily`](Self::get_daily)
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn options(&self) -> &CoordinatorOptions {
        &self.options
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Return the record for `(category, date)`, generating it at most once
    /// across all concurrent callers.
    ///
    /// `requester` is recorded as the author if this call generates the record.
    /// Fails with [`CoordinatorError::GenerationFailed`] when this caller's
    /// generation failed or no record appeared within the poll budget, and with
    /// [`CoordinatorError::Storage`] when the store itself fails.
    #[instrument(skip_all, fields(category = %category, date = %date, requester = %requester))]
    pub async fn get_or_generate(
        &self,
        category: &str,
        date: NaiveDate,
        requester: &str,
    ) -> CoordinatorResult<(ContentRecord, Outcome)> {
        let key = ContentKey::new(category, date);
        let started = Instant::now();

        let result = self.resolve(&key, requester).await;
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match &result {
            Ok((record, outcome)) => {
                log_coordination_event(&key, requester, Some(*outcome), Some(record.id), duration_ms, None)
            }
            Err(e) => {
                if matches!(e, CoordinatorError::Storage(_)) {
                    self.stats.record_store_error();
                }
                log_coordination_event(&key, requester, None, None, duration_ms, Some(&e.to_string()))
            }
        }

        result
    }

    /// [`get_or_generate`](Self::get_or_generate) for today's date
    pub async fn get_daily(
        &self,
        category: &str,
        requester: &str,
    ) -> CoordinatorResult<(ContentRecord, Outcome)> {
        let today = self.clock.today();
        self.get_or_generate(category, today, requester).await
    }

    async fn resolve(&self, key: &ContentKey, requester: &str) -> CoordinatorResult<(ContentRecord, Outcome)> {
        if let Some(record) = self.lookup(key).await? {
            self.stats.record_cache_hit();
            transition(CoordinatorState::CheckCache, CoordinatorState::Done);
            return Ok((record, Outcome::FoundExisting));
        }

        transition(CoordinatorState::CheckCache, CoordinatorState::AcquireLock);
        match self.acquire_lock(key).await {
            Some(guard) => {
                transition(CoordinatorState::AcquireLock, CoordinatorState::DoubleCheck);
                let result = self.generate_under_lock(key, requester).await;
                self.release_lock(guard).await;
                result
            }
            None => {
                transition(CoordinatorState::AcquireLock, CoordinatorState::WaitAndPoll);
                self.wait_and_poll(key).await
            }
        }
    }

    async fn lookup(&self, key: &ContentKey) -> CoordinatorResult<Option<ContentRecord>> {
        Ok(self.store.lookup(&key.category, key.effective_date).await?)
    }

    /// `None` both when the wait elapsed and when the lock backend failed
    async fn acquire_lock(&self, key: &ContentKey) -> Option<LockGuard> {
        let handle = LockHandle::new(
            key.lock_key(&self.options.namespace),
            self.options.wait_time,
            self.options.lease_time,
        );

        match LockGuard::acquire(Arc::clone(&self.lock), handle).await {
            Ok(Some(guard)) => Some(guard),
            Ok(None) => {
                debug!(key = %key, "Lock held elsewhere; waiting for the holder's record");
                None
            }
            Err(e) => {
                self.stats.record_lock_backend_error();
                warn!(
                    key = %key,
                    provider = self.lock.provider_name(),
                    error = %e,
                    "Lock backend failed; falling back to polling"
                );
                None
            }
        }
    }

    /// Double-check, generate and persist. The caller owns the lock throughout.
    async fn generate_under_lock(
        &self,
        key: &ContentKey,
        requester: &str,
    ) -> CoordinatorResult<(ContentRecord, Outcome)> {
        if let Some(record) = self.lookup(key).await? {
            self.stats.record_double_check_hit();
            debug!(key = %key, record_id = record.id, "Record appeared before generation");
            transition(CoordinatorState::DoubleCheck, CoordinatorState::Done);
            return Ok((record, Outcome::FoundExisting));
        }

        transition(CoordinatorState::DoubleCheck, CoordinatorState::Generate);
        let generated = self
            .generator
            .generate(&key.category)
            .await
            .and_then(|raw| self.generator.parse(&raw))
            .map_err(|e| self.generation_failed(key, e))?;

        transition(CoordinatorState::Generate, CoordinatorState::Persist);
        let record = self
            .store
            .insert(NewContentRecord::from_generated(key, generated, requester))
            .await?;

        self.stats.record_generation();
        info!(
            key = %key,
            record_id = record.id,
            generator = self.generator.generator_name(),
            "Generated and stored new record"
        );
        transition(CoordinatorState::Persist, CoordinatorState::Done);
        Ok((record, Outcome::GeneratedNew))
    }

    fn generation_failed(&self, key: &ContentKey, error: GeneratorError) -> CoordinatorError {
        self.stats.record_generation_failure();
        warn!(
            key = %key,
            generator = self.generator.generator_name(),
            error = %error,
            "Generation failed; releasing lock for a later retry"
        );
        transition(CoordinatorState::Generate, CoordinatorState::Failed);
        CoordinatorError::generation_failed(
            key.category.clone(),
            key.effective_date,
            GenerationFailure::Generator(error),
        )
    }

    async fn release_lock(&self, guard: LockGuard) {
        let lock_key = guard.handle().key().to_string();
        if let Err(e) = guard.release().await {
            warn!(
                lock_key = %lock_key,
                error = %e,
                "Failed to release lock; lease expiry will reclaim it"
            );
        }
    }

    async fn wait_and_poll(&self, key: &ContentKey) -> CoordinatorResult<(ContentRecord, Outcome)> {
        let schedule = &self.options.poll;

        for (round, delay) in schedule.delays().enumerate() {
            tokio::time::sleep(delay).await;

            if let Some(record) = self.lookup(key).await? {
                self.stats.record_wait_resolved();
                debug!(key = %key, round = round + 1, record_id = record.id, "Record appeared while polling");
                transition(CoordinatorState::WaitAndPoll, CoordinatorState::Done);
                return Ok((record, Outcome::FoundExistingAfterWait));
            }
        }

        self.stats.record_wait_exhausted();
        transition(CoordinatorState::WaitAndPoll, CoordinatorState::Failed);
        Err(CoordinatorError::generation_failed(
            key.category.clone(),
            key.effective_date,
            GenerationFailure::WaitExhausted {
                rounds: schedule.max_rounds(),
            },
        ))
    }
}

fn transition(from: CoordinatorState, to: CoordinatorState) {
    debug!(from = %from, to = %to, "Coordinator state transition");
}
