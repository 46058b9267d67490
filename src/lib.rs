#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Content Coordinator
//!
//! Single-flight, cache-aside generation of expensive per-day content.
//!
//! ## Overview
//!
//! Many callers, possibly in different processes, ask for the same
//! `(category, date)` record at roughly the same time. Producing a record is
//! slow and costly (an external generator call), so the coordinator makes sure
//! it happens at most once per key and that every caller converges on the same
//! stored record.
//!
//! ## Module Organization
//!
//! - [`coordinator`] - The cache-aside state machine and its outcome types
//! - [`store`] - Persistent record store (in-memory and PostgreSQL)
//! - [`lock`] - Lease-based distributed lock (in-memory, PostgreSQL, Redis)
//! - [`generator`] - External content generator and output parsing
//! - [`models`] - Content keys and records
//! - [`config`] - Layered, validated configuration
//! - [`bootstrap`] - Builds a coordinator from configuration
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use content_coordinator::coordinator::{ContentCoordinator, CoordinatorOptions};
//! use content_coordinator::generator::HttpContentGenerator;
//! use content_coordinator::config::GeneratorSettings;
//! use content_coordinator::lock::InMemoryLockProvider;
//! use content_coordinator::store::InMemoryRecordStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let generator = HttpContentGenerator::from_settings(&GeneratorSettings::default())?;
//! let coordinator = ContentCoordinator::new(
//!     Arc::new(InMemoryRecordStore::new()),
//!     Arc::new(InMemoryLockProvider::new()),
//!     Arc::new(generator),
//!     CoordinatorOptions::default(),
//! );
//!
//! let (record, outcome) = coordinator.get_daily("native", "user-42").await?;
//! println!("{} ({outcome})", record.title);
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod config;
pub mod constants;
pub mod coordinator;
pub mod error;
pub mod generator;
pub mod lock;
pub mod logging;
pub mod models;
pub mod store;

pub use bootstrap::build_coordinator;
pub use config::CoordinatorSettings;
pub use coordinator::{ContentCoordinator, CoordinatorOptions, Outcome};
pub use error::{
    BootstrapError, ConfigurationError, CoordinatorError, CoordinatorResult, GenerationFailure,
    GeneratorError, LockError, StoreError,
};
pub use generator::ContentGenerator;
pub use lock::{LockHandle, LockProvider};
pub use models::{Annotation, ContentKey, ContentRecord};
pub use store::RecordStore;
