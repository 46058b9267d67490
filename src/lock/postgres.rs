//! PostgreSQL lease-table lock provider.
//!
//! One row per lock key. Acquisition is a single atomic upsert that only
//! overwrites a row whose lease has expired, so at most one token holds an
//! unexpired row at any time. Release deletes the row only when the token matches.

use super::{acquire_with_retry, LockHandle, LockProvider};
use crate::error::{LockError, LockResult};
use async_trait::async_trait;
use sqlx::PgPool;
use std::time::Duration;
use tracing::{debug, error, instrument};

const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS content_locks (
        lock_key TEXT PRIMARY KEY,
        holder_token VARCHAR(64) NOT NULL,
        acquired_at TIMESTAMPTZ NOT NULL,
        expires_at TIMESTAMPTZ NOT NULL
    )
"#;

#[derive(Debug, Clone)]
pub struct PgLockProvider {
    pool: PgPool,
    retry_interval: Duration,
}

impl PgLockProvider {
    pub fn new(pool: PgPool, retry_interval: Duration) -> Self {
        Self {
            pool,
            retry_interval,
        }
    }

    /// Create the `content_locks` table if absent
    pub async fn migrate(&self) -> LockResult<()> {
        sqlx::query(CREATE_TABLE_SQL)
            .execute(&self.pool)
            .await
            .map_err(|e| LockError::backend("migrate", "content_locks", e.to_string()))?;
        Ok(())
    }

    async fn try_acquire_once(&self, handle: &LockHandle) -> LockResult<bool> {
        let query = r#"
            INSERT INTO content_locks (lock_key, holder_token, acquired_at, expires_at)
            VALUES ($1, $2, NOW(), NOW() + make_interval(secs => $3::float8 / 1000.0))
            ON CONFLICT (lock_key) DO UPDATE
                SET holder_token = EXCLUDED.holder_token,
                    acquired_at = EXCLUDED.acquired_at,
                    expires_at = EXCLUDED.expires_at
                WHERE content_locks.expires_at <= NOW()
            RETURNING holder_token
        "#;

        let row: Option<(String,)> = sqlx::query_as(query)
            .bind(handle.key())
            .bind(handle.token())
            .bind(lease_millis(handle.lease_time()))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to acquire lock {}: {}", handle.key(), e);
                LockError::backend("acquire", handle.key(), e.to_string())
            })?;

        Ok(row.is_some_and(|(token,)| token == handle.token()))
    }
}

fn lease_millis(lease: Duration) -> i64 {
    i64::try_from(lease.as_millis()).unwrap_or(i64::MAX)
}

#[async_trait]
impl LockProvider for PgLockProvider {
    #[instrument(skip(self, handle), fields(lock_key = handle.key()))]
    async fn try_acquire(&self, handle: &LockHandle) -> LockResult<bool> {
        acquire_with_retry(handle.wait_time(), self.retry_interval, move || {
            self.try_acquire_once(handle)
        })
        .await
    }

    #[instrument(skip(self, handle), fields(lock_key = handle.key()))]
    async fn release(&self, handle: &LockHandle) -> LockResult<bool> {
        let result = sqlx::query("DELETE FROM content_locks WHERE lock_key = $1 AND holder_token = $2")
            .bind(handle.key())
            .bind(handle.token())
            .execute(&self.pool)
            .await
            .map_err(|e| LockError::backend("release", handle.key(), e.to_string()))?;

        let released = result.rows_affected() > 0;
        debug!(released, "Lock release");
        Ok(released)
    }

    async fn is_held_by_current_caller(&self, handle: &LockHandle) -> LockResult<bool> {
        let query = r#"
            SELECT EXISTS (
                SELECT 1 FROM content_locks
                WHERE lock_key = $1 AND holder_token = $2 AND expires_at > NOW()
            )
        "#;

        let (held,): (bool,) = sqlx::query_as(query)
            .bind(handle.key())
            .bind(handle.token())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| LockError::backend("is_held", handle.key(), e.to_string()))?;

        Ok(held)
    }

    fn provider_name(&self) -> &'static str {
        "postgres"
    }
}
