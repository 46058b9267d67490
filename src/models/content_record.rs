use super::ContentKey;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A `(term, note)` pair extracted from generated output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub term: String,
    pub note: String,
}

impl Annotation {
    pub fn new(term: impl Into<String>, note: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            note: note.into(),
        }
    }
}

/// Fields produced by a generator, before the record is keyed and persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub title: String,
    pub body: String,
    pub annotations: Vec<Annotation>,
}

/// ContentRecord is the persisted, immutable result of one generation.
/// Maps to the `content_records` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: i64,
    pub category: String,
    pub title: String,
    pub body: String,
    pub annotations: Vec<Annotation>,
    pub generated_by: String,
    pub effective_date: NaiveDate,
}

/// New ContentRecord for insertion; the store assigns `id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewContentRecord {
    pub category: String,
    pub title: String,
    pub body: String,
    pub annotations: Vec<Annotation>,
    pub generated_by: String,
    pub effective_date: NaiveDate,
}

impl NewContentRecord {
    /// Key generated content under `key`, attributing it to `requester`
    pub fn from_generated(key: &ContentKey, generated: GeneratedContent, requester: &str) -> Self {
        Self {
            category: key.category.clone(),
            title: generated.title,
            body: generated.body,
            annotations: generated.annotations,
            generated_by: requester.to_string(),
            effective_date: key.effective_date,
        }
    }

    pub fn key(&self) -> ContentKey {
        ContentKey::new(self.category.clone(), self.effective_date)
    }

    /// Attach the identity assigned by a store
    pub fn with_id(self, id: i64) -> ContentRecord {
        ContentRecord {
            id,
            category: self.category,
            title: self.title,
            body: self.body,
            annotations: self.annotations,
            generated_by: self.generated_by,
            effective_date: self.effective_date,
        }
    }
}

impl ContentRecord {
    pub fn key(&self) -> ContentKey {
        ContentKey::new(self.category.clone(), self.effective_date)
    }
}
