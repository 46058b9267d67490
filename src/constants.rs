//! # System Constants
//!
//! Defaults for the coordinator's operational boundaries and the sentinel values
//! substituted for missing generated fields. Every default here can be
//! overridden through [`CoordinatorSettings`](crate::config::CoordinatorSettings).

use std::time::Duration;

/// Default prefix for lock keys; the full key is `<namespace>:<category>:<date>`
pub const DEFAULT_LOCK_NAMESPACE: &str = "lock:content";

/// How long a caller queues for the generation lock before falling through to polling
pub const DEFAULT_LOCK_WAIT_TIME: Duration = Duration::from_secs(3);

/// Lease on the generation lock; must comfortably exceed generator latency
pub const DEFAULT_LOCK_LEASE_TIME: Duration = Duration::from_secs(120);

/// Pause between set-if-absent attempts while waiting for a lock
pub const DEFAULT_LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Poll rounds a non-winner performs before giving up
pub const DEFAULT_POLL_MAX_ROUNDS: u32 = 5;

/// Delay before the first poll round
pub const DEFAULT_POLL_INITIAL_DELAY: Duration = Duration::from_millis(500);

/// Upper bound for a single poll delay once backoff applies
pub const DEFAULT_POLL_MAX_DELAY: Duration = Duration::from_secs(5);

/// Bound on one generator round trip
pub const DEFAULT_GENERATOR_TIMEOUT: Duration = Duration::from_secs(30);

/// Generated-output sentinels
pub mod sentinels {
    pub const MISSING_TITLE: &str = "No Title Provided";
    pub const MISSING_BODY: &str = "No content available.";
}

/// Keys of the generated JSON document
pub mod fields {
    pub const TITLE: &str = "title";
    pub const BODY: &str = "content";
    pub const ANNOTATIONS: &str = "keyExpressions";
    pub const ANNOTATION_TERM: &str = "expression";
    pub const ANNOTATION_NOTE: &str = "meaning";
}
