use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Composite key of a content record: `(category, effective_date)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentKey {
    pub category: String,
    pub effective_date: NaiveDate,
}

impl ContentKey {
    pub fn new(category: impl Into<String>, effective_date: NaiveDate) -> Self {
        Self {
            category: category.into(),
            effective_date,
        }
    }

    /// Derive the lock key for this content key under `namespace`.
    ///
    /// The mapping is deterministic so every process contends on the same string:
    /// `lock_key("lock:content")` for `("native", 2024-01-01)` is
    /// `"lock:content:native:2024-01-01"`.
    pub fn lock_key(&self, namespace: &str) -> String {
        format!(
            "{}:{}:{}",
            namespace.trim_end_matches(':'),
            self.category,
            self.effective_date.format("%Y-%m-%d")
        )
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.effective_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_key_is_deterministic() {
        let key = ContentKey::new("native", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(key.lock_key("lock:content"), "lock:content:native:2024-01-01");
        assert_eq!(key.lock_key("lock:content:"), "lock:content:native:2024-01-01");
    }

    #[test]
    fn test_namespaces_isolate_lock_keys() {
        let key = ContentKey::new("beginner", NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
        assert_ne!(key.lock_key("test-a"), key.lock_key("test-b"));
    }

    #[test]
    fn test_display() {
        let key = ContentKey::new("beginner", NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
        assert_eq!(key.to_string(), "beginner/2024-03-09");
    }
}
