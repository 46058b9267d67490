//! Shared test doubles for coordinator integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use content_coordinator::coordinator::{ContentCoordinator, CoordinatorOptions, PollSchedule};
use content_coordinator::error::{
    GeneratorError, GeneratorResult, LockError, LockResult, StoreError, StoreResult,
};
use content_coordinator::generator::{ContentGenerator, RawOutput};
use content_coordinator::lock::{InMemoryLockProvider, LockHandle, LockProvider};
use content_coordinator::models::{ContentKey, ContentRecord, GeneratedContent, NewContentRecord};
use content_coordinator::store::{InMemoryRecordStore, RecordStore};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const NAMESPACE: &str = "lock:test";

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
}

pub fn lock_key(category: &str, effective_date: NaiveDate) -> String {
    ContentKey::new(category, effective_date).lock_key(NAMESPACE)
}

/// Options sized so that losers keep competing for the lock past the
/// generator's delay, then fall back to polling
pub fn options() -> CoordinatorOptions {
    CoordinatorOptions {
        namespace: NAMESPACE.to_string(),
        wait_time: Duration::from_millis(500),
        lease_time: Duration::from_secs(30),
        poll: PollSchedule::fixed(5, Duration::from_millis(200)),
    }
}

pub fn payload(category: &str) -> String {
    serde_json::json!({
        "title": format!("{category} reading"),
        "content": format!("A passage for {category} learners."),
        "keyExpressions": [
            {"expression": "break the ice", "meaning": "start a conversation"},
            {"expression": "on the fence", "meaning": "undecided"}
        ]
    })
    .to_string()
}

/// Record a separate writer would have produced for `key`
pub fn external_record(key: &ContentKey) -> NewContentRecord {
    NewContentRecord::from_generated(
        key,
        GeneratedContent {
            title: "Written elsewhere".to_string(),
            body: "Stored by another process.".to_string(),
            annotations: Vec::new(),
        },
        "other-process",
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorBehavior {
    Succeed,
    Fail,
    Malformed,
}

/// Generator that counts calls and optionally sleeps before answering
#[derive(Debug)]
pub struct MockGenerator {
    behavior: GeneratorBehavior,
    delay: Duration,
    calls: AtomicU32,
    in_flight: AtomicU32,
    max_in_flight: AtomicU32,
}

impl MockGenerator {
    pub fn new(behavior: GeneratorBehavior, delay: Duration) -> Self {
        Self {
            behavior,
            delay,
            calls: AtomicU32::new(0),
            in_flight: AtomicU32::new(0),
            max_in_flight: AtomicU32::new(0),
        }
    }

    pub fn succeeding(delay: Duration) -> Self {
        Self::new(GeneratorBehavior::Succeed, delay)
    }

    pub fn failing() -> Self {
        Self::new(GeneratorBehavior::Fail, Duration::from_millis(10))
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of `generate` calls that were running at once
    pub fn max_in_flight(&self) -> u32 {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentGenerator for MockGenerator {
    async fn generate(&self, category: &str) -> GeneratorResult<RawOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.behavior {
            GeneratorBehavior::Succeed => Ok(RawOutput::new(payload(category))),
            GeneratorBehavior::Fail => Err(GeneratorError::upstream(500, "model overloaded")),
            GeneratorBehavior::Malformed => Ok(RawOutput::from("Sorry, I can't help with that.")),
        }
    }

    fn generator_name(&self) -> &'static str {
        "mock"
    }
}

/// Record store wrapper that counts calls and can be told to fail inserts
#[derive(Debug, Default)]
pub struct CountingStore {
    inner: InMemoryRecordStore,
    lookups: AtomicU32,
    inserts: AtomicU32,
    fail_inserts: bool,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_inserts() -> Self {
        Self {
            fail_inserts: true,
            ..Self::default()
        }
    }

    pub fn inner(&self) -> &InMemoryRecordStore {
        &self.inner
    }

    pub fn lookups(&self) -> u32 {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn inserts(&self) -> u32 {
        self.inserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for CountingStore {
    async fn lookup(&self, category: &str, date: NaiveDate) -> StoreResult<Option<ContentRecord>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.lookup(category, date).await
    }

    async fn insert(&self, record: NewContentRecord) -> StoreResult<ContentRecord> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts {
            return Err(StoreError::query("insert", "connection reset by peer"));
        }
        self.inner.insert(record).await
    }

    fn store_name(&self) -> &'static str {
        "counting"
    }
}

/// Lock provider that never grants, after waiting out the full `wait_time`
#[derive(Debug, Default)]
pub struct DenyingLockProvider;

#[async_trait]
impl LockProvider for DenyingLockProvider {
    async fn try_acquire(&self, handle: &LockHandle) -> LockResult<bool> {
        tokio::time::sleep(handle.wait_time()).await;
        Ok(false)
    }

    async fn release(&self, _handle: &LockHandle) -> LockResult<bool> {
        Ok(false)
    }

    async fn is_held_by_current_caller(&self, _handle: &LockHandle) -> LockResult<bool> {
        Ok(false)
    }

    fn provider_name(&self) -> &'static str {
        "denying"
    }
}

/// Lock provider whose backend is unreachable
#[derive(Debug, Default)]
pub struct UnreachableLockProvider;

#[async_trait]
impl LockProvider for UnreachableLockProvider {
    async fn try_acquire(&self, handle: &LockHandle) -> LockResult<bool> {
        Err(LockError::backend("acquire", handle.key(), "connection refused"))
    }

    async fn release(&self, handle: &LockHandle) -> LockResult<bool> {
        Err(LockError::backend("release", handle.key(), "connection refused"))
    }

    async fn is_held_by_current_caller(&self, handle: &LockHandle) -> LockResult<bool> {
        Err(LockError::backend("check", handle.key(), "connection refused"))
    }

    fn provider_name(&self) -> &'static str {
        "unreachable"
    }
}

/// In-memory lock that, right after granting, lets another writer store a
/// record for the key: the window between acquire and double-check
#[derive(Debug)]
pub struct RacingLockProvider {
    inner: InMemoryLockProvider,
    store: Arc<InMemoryRecordStore>,
    key: ContentKey,
}

impl RacingLockProvider {
    pub fn new(store: Arc<InMemoryRecordStore>, key: ContentKey) -> Self {
        Self {
            inner: InMemoryLockProvider::new(),
            store,
            key,
        }
    }

    pub fn inner(&self) -> &InMemoryLockProvider {
        &self.inner
    }
}

#[async_trait]
impl LockProvider for RacingLockProvider {
    async fn try_acquire(&self, handle: &LockHandle) -> LockResult<bool> {
        let acquired = self.inner.try_acquire(handle).await?;
        if acquired {
            self.store
                .insert(external_record(&self.key))
                .await
                .map_err(|e| LockError::backend("acquire", handle.key(), e.to_string()))?;
        }
        Ok(acquired)
    }

    async fn release(&self, handle: &LockHandle) -> LockResult<bool> {
        self.inner.release(handle).await
    }

    async fn is_held_by_current_caller(&self, handle: &LockHandle) -> LockResult<bool> {
        self.inner.is_held_by_current_caller(handle).await
    }

    fn provider_name(&self) -> &'static str {
        "racing"
    }
}

/// Whether nobody currently holds the lock on `key`
pub async fn lock_is_free(provider: &dyn LockProvider, key: &str) -> bool {
    let probe = LockHandle::new(key, Duration::ZERO, Duration::from_millis(1));
    let acquired = provider.try_acquire(&probe).await.expect("probe acquire");
    if acquired {
        provider.release(&probe).await.expect("probe release");
    }
    acquired
}

pub fn coordinator(
    store: Arc<dyn RecordStore>,
    lock: Arc<dyn LockProvider>,
    generator: Arc<dyn ContentGenerator>,
) -> ContentCoordinator {
    ContentCoordinator::new(store, lock, generator, options())
}
