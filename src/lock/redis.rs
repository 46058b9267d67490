//! Redis lock provider.
//!
//! Uses `redis::aio::ConnectionManager` for async multiplexed connections.
//! Acquisition is `SET key token NX PX lease`; release is a compare-and-delete
//! Lua script so an expired holder never deletes its successor's key.
//! Requires the `lock-redis` feature flag.

use super::{acquire_with_retry, LockHandle, LockProvider};
use crate::error::{LockError, LockResult};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

const COMPARE_AND_DELETE: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

#[derive(Clone)]
pub struct RedisLockProvider {
    connection_manager: redis::aio::ConnectionManager,
    retry_interval: Duration,
}

impl std::fmt::Debug for RedisLockProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisLockProvider")
            .field("connection_manager", &"ConnectionManager")
            .field("retry_interval", &self.retry_interval)
            .finish()
    }
}

impl RedisLockProvider {
    /// Connect to the Redis server at `url`
    pub async fn connect(url: &str, retry_interval: Duration) -> LockResult<Self> {
        let client = redis::Client::open(url).map_err(|e| {
            LockError::connection(format!("Failed to create Redis client: {}", e))
        })?;

        let connection_manager = redis::aio::ConnectionManager::new(client)
            .await
            .map_err(|e| LockError::connection(format!("Failed to connect to Redis: {}", e)))?;

        debug!(url = %crate::config::redact_url(url), "Redis lock provider connected");

        Ok(Self {
            connection_manager,
            retry_interval,
        })
    }

    async fn try_acquire_once(&self, handle: &LockHandle) -> LockResult<bool> {
        let mut conn = self.connection_manager.clone();
        let lease_ms = u64::try_from(handle.lease_time().as_millis())
            .unwrap_or(u64::MAX)
            .max(1);

        let reply: Option<String> = redis::cmd("SET")
            .arg(handle.key())
            .arg(handle.token())
            .arg("NX")
            .arg("PX")
            .arg(lease_ms)
            .query_async(&mut conn)
            .await
            .map_err(|e| LockError::backend("SET NX", handle.key(), e.to_string()))?;

        Ok(reply.is_some())
    }
}

#[async_trait]
impl LockProvider for RedisLockProvider {
    #[instrument(skip(self, handle), fields(lock_key = handle.key()))]
    async fn try_acquire(&self, handle: &LockHandle) -> LockResult<bool> {
        acquire_with_retry(handle.wait_time(), self.retry_interval, move || {
            self.try_acquire_once(handle)
        })
        .await
    }

    #[instrument(skip(self, handle), fields(lock_key = handle.key()))]
    async fn release(&self, handle: &LockHandle) -> LockResult<bool> {
        let mut conn = self.connection_manager.clone();
        let deleted: i64 = redis::cmd("EVAL")
            .arg(COMPARE_AND_DELETE)
            .arg(1)
            .arg(handle.key())
            .arg(handle.token())
            .query_async(&mut conn)
            .await
            .map_err(|e| LockError::backend("EVAL compare-and-delete", handle.key(), e.to_string()))?;

        debug!(deleted = deleted, "Lock DEL");
        Ok(deleted > 0)
    }

    async fn is_held_by_current_caller(&self, handle: &LockHandle) -> LockResult<bool> {
        let mut conn = self.connection_manager.clone();
        let holder: Option<String> = redis::cmd("GET")
            .arg(handle.key())
            .query_async(&mut conn)
            .await
            .map_err(|e| LockError::backend("GET", handle.key(), e.to_string()))?;

        Ok(holder.as_deref() == Some(handle.token()))
    }

    fn provider_name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(all(test, feature = "test-services"))]
mod integration {
    use super::*;
    use tracing::warn;

    async fn provider() -> Option<RedisLockProvider> {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        match RedisLockProvider::connect(&url, Duration::from_millis(10)).await {
            Ok(provider) => Some(provider),
            Err(e) => {
                warn!("Skipping Redis test (not available): {}", e);
                None
            }
        }
    }

    #[tokio::test]
    async fn test_redis_lock_exclusion_and_release() {
        let Some(provider) = provider().await else {
            return;
        };

        let key = format!("lock:test:{}", uuid::Uuid::new_v4());
        let owner = LockHandle::new(key.clone(), Duration::ZERO, Duration::from_secs(30));
        let other = LockHandle::new(key, Duration::ZERO, Duration::from_secs(30));

        assert!(provider.try_acquire(&owner).await.unwrap());
        assert!(!provider.try_acquire(&other).await.unwrap());
        assert!(!provider.release(&other).await.unwrap());
        assert!(provider.is_held_by_current_caller(&owner).await.unwrap());
        assert!(provider.release(&owner).await.unwrap());
    }

    #[tokio::test]
    async fn test_redis_lease_expiry() {
        let Some(provider) = provider().await else {
            return;
        };

        let key = format!("lock:test:{}", uuid::Uuid::new_v4());
        let crashed = LockHandle::new(key.clone(), Duration::ZERO, Duration::from_millis(200));
        let successor = LockHandle::new(key, Duration::from_secs(1), Duration::from_secs(30));

        assert!(provider.try_acquire(&crashed).await.unwrap());
        assert!(provider.try_acquire(&successor).await.unwrap());
        assert!(!provider.is_held_by_current_caller(&crashed).await.unwrap());
    }
}
