//! # Record Store
//!
//! Durable keyed storage for generated records. A store offers a pure point
//! lookup and an insert that assigns identity. Inserts never check for an
//! existing row: de-duplication is the coordinator's job, enforced through the
//! distributed lock and its double-check, not through a unique constraint.

use crate::error::StoreResult;
use crate::models::{ContentRecord, NewContentRecord};
use async_trait::async_trait;
use chrono::NaiveDate;

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::InMemoryRecordStore;
#[cfg(feature = "postgres")]
pub use postgres::PgRecordStore;

/// Keyed persistence for [`ContentRecord`]s
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Find the record for `(category, date)`, if one has been persisted
    async fn lookup(&self, category: &str, date: NaiveDate) -> StoreResult<Option<ContentRecord>>;

    /// Persist a new record and return it with its assigned identity
    async fn insert(&self, record: NewContentRecord) -> StoreResult<ContentRecord>;

    /// Name used in logs
    fn store_name(&self) -> &'static str;
}
