//! RAII ownership of an acquired lock.
//!
//! Call [`LockGuard::release`] on every normal path. If the guard is dropped
//! while still held (the owning future was cancelled, or a panic unwound
//! through it) a best-effort release is spawned on the current Tokio runtime.
//! Without a runtime nothing can be done and the lease expiry reclaims the key.

use super::{LockHandle, LockProvider};
use crate::error::LockResult;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct LockGuard {
    provider: Arc<dyn LockProvider>,
    handle: LockHandle,
    released: bool,
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard")
            .field("provider", &self.provider.provider_name())
            .field("handle", &self.handle)
            .field("released", &self.released)
            .finish()
    }
}

impl LockGuard {
    /// Attempt to acquire `handle`, returning a guard on success and `None`
    /// when the wait elapsed without obtaining the lock.
    pub async fn acquire(
        provider: Arc<dyn LockProvider>,
        handle: LockHandle,
    ) -> LockResult<Option<LockGuard>> {
        if provider.try_acquire(&handle).await? {
            debug!(lock_key = handle.key(), "Lock acquired");
            Ok(Some(LockGuard {
                provider,
                handle,
                released: false,
            }))
        } else {
            Ok(None)
        }
    }

    pub fn handle(&self) -> &LockHandle {
        &self.handle
    }

    /// Release the lock if this guard still owns it.
    ///
    /// Ownership is checked first so a lease that already expired (and may now
    /// belong to another caller) is left alone. Returns whether a release happened.
    pub async fn release(mut self) -> LockResult<bool> {
        let result = self.release_owned().await;
        self.released = true;
        result
    }

    async fn release_owned(&self) -> LockResult<bool> {
        if !self.provider.is_held_by_current_caller(&self.handle).await? {
            warn!(
                lock_key = self.handle.key(),
                "Lock lease expired before release; leaving key to its current holder"
            );
            return Ok(false);
        }

        let released = self.provider.release(&self.handle).await?;
        if released {
            debug!(lock_key = self.handle.key(), "Lock released");
        }
        Ok(released)
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(
                lock_key = self.handle.key(),
                "Lock guard dropped outside a runtime; lease expiry will reclaim it"
            );
            return;
        };

        let provider = Arc::clone(&self.provider);
        let handle = self.handle.clone();
        runtime.spawn(async move {
            match provider.release(&handle).await {
                Ok(released) => {
                    debug!(lock_key = handle.key(), released, "Lock released on drop")
                }
                Err(e) => warn!(
                    lock_key = handle.key(),
                    error = %e,
                    "Failed to release lock on drop; lease expiry will reclaim it"
                ),
            }
        });
    }
}
