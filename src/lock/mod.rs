//! # Distributed Lock
//!
//! Lease-based mutual exclusion over string keys, visible across processes.
//!
//! A [`LockHandle`] is one acquisition *attempt*: it carries the key, a fresh
//! ownership token, how long the caller is willing to wait, and how long the
//! lease lives before it expires on its own. Providers only ever release or
//! report ownership for the token in the handle, so a holder whose lease
//! already expired can never release the next holder's lock.
//!
//! ## Providers
//!
//! - [`InMemoryLockProvider`]: process-local, for tests and single instances
//! - [`PgLockProvider`]: lease rows in PostgreSQL (`postgres` feature)
//! - [`RedisLockProvider`]: `SET NX PX` with compare-and-delete (`lock-redis` feature)

use crate::error::LockResult;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

pub mod guard;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "lock-redis")]
pub mod redis;

pub use guard::LockGuard;
pub use memory::InMemoryLockProvider;
#[cfg(feature = "postgres")]
pub use postgres::PgLockProvider;
#[cfg(feature = "lock-redis")]
pub use self::redis::RedisLockProvider;

/// One attempt to hold exclusive rights over `key`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockHandle {
    key: String,
    token: String,
    wait_time: Duration,
    lease_time: Duration,
}

impl LockHandle {
    /// Create a handle with a fresh, unique ownership token
    pub fn new(key: impl Into<String>, wait_time: Duration, lease_time: Duration) -> Self {
        Self {
            key: key.into(),
            token: Uuid::new_v4().to_string(),
            wait_time,
            lease_time,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn wait_time(&self) -> Duration {
        self.wait_time
    }

    pub fn lease_time(&self) -> Duration {
        self.lease_time
    }
}

/// Cross-process mutual exclusion with bounded waiting and lease expiry
#[async_trait]
pub trait LockProvider: Send + Sync {
    /// Try to take ownership of `handle.key()`, waiting at most `handle.wait_time()`.
    ///
    /// Returns `Ok(false)` when the wait elapses without success. Ownership
    /// expires after `handle.lease_time()` even if never released.
    async fn try_acquire(&self, handle: &LockHandle) -> LockResult<bool>;

    /// Release the lock if, and only if, `handle` still owns it.
    ///
    /// Returns whether anything was released; releasing a lock held by someone
    /// else (or by nobody) is `Ok(false)`, never an error.
    async fn release(&self, handle: &LockHandle) -> LockResult<bool>;

    /// Whether `handle` currently owns an unexpired lease on its key
    async fn is_held_by_current_caller(&self, handle: &LockHandle) -> LockResult<bool>;

    /// Name used in logs
    fn provider_name(&self) -> &'static str;
}

/// Repeat `attempt` every `retry_interval` until it succeeds or `wait_time` elapses.
///
/// Always makes at least one attempt, so a zero `wait_time` means "try once".
pub(crate) async fn acquire_with_retry<F, Fut>(
    wait_time: Duration,
    retry_interval: Duration,
    mut attempt: F,
) -> LockResult<bool>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = LockResult<bool>>,
{
    let deadline = Instant::now() + wait_time;

    loop {
        if attempt().await? {
            return Ok(true);
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(false);
        }

        let pause = retry_interval.min(deadline - now);
        tokio::time::sleep(pause).await;
    }
}
