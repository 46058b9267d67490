//! # Coordinator Bootstrap
//!
//! Builds a ready-to-use [`ContentCoordinator`] from [`CoordinatorSettings`]:
//! validates the settings, connects the selected store and lock backends,
//! creates their tables where needed, and wraps the HTTP generator in a
//! deadline.

use crate::config::{CoordinatorSettings, LockBackend, StoreBackend};
use crate::coordinator::{ContentCoordinator, CoordinatorOptions};
use crate::error::{BootstrapResult, ConfigurationError};
use crate::generator::{ContentGenerator, HttpContentGenerator, TimeoutGenerator};
use crate::lock::{InMemoryLockProvider, LockProvider};
use crate::store::{InMemoryRecordStore, RecordStore};
use std::sync::Arc;
use tracing::info;

#[cfg(feature = "postgres")]
use crate::{lock::PgLockProvider, store::PgRecordStore};

/// Validate `settings` and connect every configured backend
pub async fn build_coordinator(settings: &CoordinatorSettings) -> BootstrapResult<ContentCoordinator> {
    settings.validate()?;

    let store = build_store(settings).await?;
    let lock = build_lock(settings).await?;

    let http = HttpContentGenerator::from_settings(&settings.generator)?;
    let generator: Arc<dyn ContentGenerator> =
        Arc::new(TimeoutGenerator::new(http, settings.generator.request_timeout()));

    info!(
        store = store.store_name(),
        lock = lock.provider_name(),
        generator = generator.generator_name(),
        namespace = %settings.lock.namespace,
        "Content coordinator bootstrapped"
    );

    Ok(ContentCoordinator::new(
        store,
        lock,
        generator,
        CoordinatorOptions::from_settings(settings),
    ))
}

async fn build_store(settings: &CoordinatorSettings) -> BootstrapResult<Arc<dyn RecordStore>> {
    match settings.store.backend {
        StoreBackend::Memory => Ok(Arc::new(InMemoryRecordStore::new())),
        StoreBackend::Postgres => postgres_store(settings).await,
    }
}

async fn build_lock(settings: &CoordinatorSettings) -> BootstrapResult<Arc<dyn LockProvider>> {
    match settings.lock.backend {
        LockBackend::Memory => Ok(Arc::new(InMemoryLockProvider::with_retry_interval(
            settings.lock.retry_interval(),
        ))),
        LockBackend::Postgres => postgres_lock(settings).await,
        LockBackend::Redis => redis_lock(settings).await,
    }
}

#[cfg(feature = "postgres")]
async fn postgres_store(settings: &CoordinatorSettings) -> BootstrapResult<Arc<dyn RecordStore>> {
    let store = PgRecordStore::connect(database_url(settings)?, settings.store.max_connections).await?;
    store.migrate().await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "postgres"))]
async fn postgres_store(_settings: &CoordinatorSettings) -> BootstrapResult<Arc<dyn RecordStore>> {
    Err(feature_disabled("store.backend", "postgres", "postgres").into())
}

#[cfg(feature = "postgres")]
async fn postgres_lock(settings: &CoordinatorSettings) -> BootstrapResult<Arc<dyn LockProvider>> {
    // The lock table lives next to the records; it gets its own small pool
    let pool = PgRecordStore::connect(database_url(settings)?, 2).await?.pool().clone();
    let provider = PgLockProvider::new(pool, settings.lock.retry_interval());
    provider.migrate().await?;
    Ok(Arc::new(provider))
}

#[cfg(not(feature = "postgres"))]
async fn postgres_lock(_settings: &CoordinatorSettings) -> BootstrapResult<Arc<dyn LockProvider>> {
    Err(feature_disabled("lock.backend", "postgres", "postgres").into())
}

#[cfg(feature = "lock-redis")]
async fn redis_lock(settings: &CoordinatorSettings) -> BootstrapResult<Arc<dyn LockProvider>> {
    let url = settings
        .redis
        .url
        .as_deref()
        .ok_or_else(|| ConfigurationError::missing("redis.url"))?;
    let provider = crate::lock::RedisLockProvider::connect(url, settings.lock.retry_interval()).await?;
    Ok(Arc::new(provider))
}

#[cfg(not(feature = "lock-redis"))]
async fn redis_lock(_settings: &CoordinatorSettings) -> BootstrapResult<Arc<dyn LockProvider>> {
    Err(feature_disabled("lock.backend", "redis", "lock-redis").into())
}

#[cfg(feature = "postgres")]
fn database_url(settings: &CoordinatorSettings) -> Result<&str, ConfigurationError> {
    settings
        .store
        .database_url
        .as_deref()
        .ok_or_else(|| ConfigurationError::missing("store.database_url"))
}

#[allow(dead_code)]
fn feature_disabled(field: &str, value: &str, feature: &str) -> ConfigurationError {
    ConfigurationError::invalid_value(
        field,
        value,
        format!("this build does not include the '{feature}' feature"),
    )
}
