//! Process-local record store.
//!
//! Rows are kept per key in insertion order so duplicate inserts stay visible
//! (`rows_for`), which is what the single-flight tests assert against.

use super::RecordStore;
use crate::error::StoreResult;
use crate::models::{ContentKey, ContentRecord, NewContentRecord};
use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::debug;

#[derive(Debug)]
pub struct InMemoryRecordStore {
    rows: RwLock<HashMap<ContentKey, Vec<ContentRecord>>>,
    next_id: AtomicI64,
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Every row stored under `key`, oldest first
    pub fn rows_for(&self, key: &ContentKey) -> Vec<ContentRecord> {
        self.rows.read().get(key).cloned().unwrap_or_default()
    }

    /// Total number of rows across all keys
    pub fn len(&self) -> usize {
        self.rows.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn lookup(&self, category: &str, date: NaiveDate) -> StoreResult<Option<ContentRecord>> {
        let key = ContentKey::new(category, date);
        Ok(self
            .rows
            .read()
            .get(&key)
            .and_then(|rows| rows.first())
            .cloned())
    }

    async fn insert(&self, record: NewContentRecord) -> StoreResult<ContentRecord> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let record = record.with_id(id);

        self.rows
            .write()
            .entry(record.key())
            .or_default()
            .push(record.clone());

        debug!(id = id, key = %record.key(), "Inserted content record");
        Ok(record)
    }

    fn store_name(&self) -> &'static str {
        "memory"
    }
}
