//! Losers of the lock race: polling, backoff and exhaustion.

mod common;

use common::*;
use content_coordinator::coordinator::{ContentCoordinator, CoordinatorOptions, Outcome, PollSchedule};
use content_coordinator::generator::ContentGenerator;
use content_coordinator::error::{CoordinatorError, GenerationFailure};
use content_coordinator::lock::{InMemoryLockProvider, LockHandle, LockProvider};
use content_coordinator::models::ContentKey;
use content_coordinator::store::RecordStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_denied_lock_fails_only_after_full_poll_budget() {
    let store = Arc::new(CountingStore::new());
    let generator = Arc::new(MockGenerator::succeeding(Duration::ZERO));
    let schedule = PollSchedule::new(4, Duration::from_millis(100), 2.0, Duration::from_secs(1));
    let options = CoordinatorOptions {
        poll: schedule.clone(),
        ..options()
    };
    let coordinator = ContentCoordinator::new(
        Arc::clone(&store) as Arc<dyn RecordStore>,
        Arc::new(DenyingLockProvider),
        Arc::clone(&generator) as Arc<dyn ContentGenerator>,
        options.clone(),
    );

    let started = Instant::now();
    let err = coordinator
        .get_or_generate("native", date(2024, 1, 1), "user-1")
        .await
        .unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(
        err,
        CoordinatorError::GenerationFailed {
            reason: GenerationFailure::WaitExhausted { rounds: 4 },
            ..
        }
    ));
    assert_eq!(store.lookups(), 1 + schedule.max_rounds());
    assert_eq!(schedule.total_delay(), Duration::from_millis(100 + 200 + 400 + 800));
    assert!(elapsed >= options.wait_time + schedule.total_delay());
    assert_eq!(generator.calls(), 0);
    assert_eq!(store.inserts(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_loser_returns_winner_record_after_wait() {
    let store = Arc::new(CountingStore::new());
    let lock: Arc<dyn LockProvider> = Arc::new(InMemoryLockProvider::new());
    let generator = Arc::new(MockGenerator::succeeding(Duration::ZERO));
    let day = date(2024, 1, 1);
    let key = ContentKey::new("native", day);

    // Another process holds the lock well past our wait_time and stores its
    // record after 1.2s
    let holder = LockHandle::new(lock_key("native", day), Duration::ZERO, Duration::from_secs(30));
    assert!(lock.try_acquire(&holder).await.unwrap());
    let writer = {
        let store = Arc::clone(&store);
        let key = key.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1_200)).await;
            store.insert(external_record(&key)).await.unwrap()
        })
    };

    let coordinator = coordinator(
        Arc::clone(&store) as Arc<dyn RecordStore>,
        Arc::clone(&lock),
        Arc::clone(&generator) as Arc<dyn ContentGenerator>,
    );
    let (record, outcome) = coordinator.get_or_generate("native", day, "user-1").await.unwrap();

    let written = writer.await.unwrap();
    assert_eq!(outcome, Outcome::FoundExistingAfterWait);
    assert_eq!(record, written);
    assert_eq!(record.generated_by, "other-process");
    assert_eq!(generator.calls(), 0);
    assert_eq!(coordinator.stats().waits_resolved, 1);
}

#[tokio::test(start_paused = true)]
async fn test_lock_backend_error_degrades_to_polling() {
    let store = Arc::new(CountingStore::new());
    let generator = Arc::new(MockGenerator::succeeding(Duration::ZERO));
    let day = date(2024, 5, 5);
    let key = ContentKey::new("native", day);

    let writer = {
        let store = Arc::clone(&store);
        let key = key.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            store.insert(external_record(&key)).await.unwrap()
        })
    };

    let coordinator = coordinator(
        Arc::clone(&store) as Arc<dyn RecordStore>,
        Arc::new(UnreachableLockProvider),
        Arc::clone(&generator) as Arc<dyn ContentGenerator>,
    );
    let (record, outcome) = coordinator.get_or_generate("native", day, "user-1").await.unwrap();

    assert_eq!(outcome, Outcome::FoundExistingAfterWait);
    assert_eq!(record, writer.await.unwrap());
    assert_eq!(generator.calls(), 0);

    let stats = coordinator.stats();
    assert_eq!(stats.lock_backend_errors, 1);
    assert_eq!(stats.waits_resolved, 1);
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_lock_and_empty_store_exhausts() {
    let store = Arc::new(CountingStore::new());
    let coordinator = coordinator(
        Arc::clone(&store) as Arc<dyn RecordStore>,
        Arc::new(UnreachableLockProvider),
        Arc::new(MockGenerator::succeeding(Duration::ZERO)),
    );

    let err = coordinator
        .get_or_generate("native", date(2024, 5, 6), "user-1")
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(store.lookups(), 1 + options().poll.max_rounds());
    assert_eq!(coordinator.stats().waits_exhausted, 1);
}

#[tokio::test(start_paused = true)]
async fn test_polling_composes_with_caller_timeout() {
    let store = Arc::new(CountingStore::new());
    let coordinator = coordinator(
        Arc::clone(&store) as Arc<dyn RecordStore>,
        Arc::new(DenyingLockProvider),
        Arc::new(MockGenerator::succeeding(Duration::ZERO)),
    );

    // wait_time is 500ms and the first poll is due at 700ms
    let result = tokio::time::timeout(
        Duration::from_millis(600),
        coordinator.get_or_generate("native", date(2024, 1, 1), "user-1"),
    )
    .await;

    assert!(result.is_err());
    assert_eq!(store.lookups(), 1);
}
