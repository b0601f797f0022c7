//! Local cache entries with access metadata

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A value held by the local backend
#[derive(Debug, Clone)]
pub struct LocalEntry<V> {
    /// The cached value
    pub value: V,

    /// Entry metadata
    pub metadata: EntryMetadata,
}

impl<V> LocalEntry<V> {
    pub fn new(value: V) -> Self {
        let now = Utc::now();

        Self {
            value,
            metadata: EntryMetadata {
                created_at: now,
                accessed_at: now,
                access_count: 0,
            },
        }
    }

    /// Mark the entry as accessed (updates access time and count)
    pub fn mark_accessed(&mut self) {
        self.metadata.accessed_at = Utc::now();
        self.metadata.access_count += 1;
    }

    /// Get the age of the entry
    pub fn age(&self) -> Duration {
        (Utc::now() - self.metadata.created_at)
            .to_std()
            .unwrap_or(Duration::from_secs(0))
    }

    /// Get time since last access
    pub fn time_since_access(&self) -> Duration {
        (Utc::now() - self.metadata.accessed_at)
            .to_std()
            .unwrap_or(Duration::from_secs(0))
    }
}

/// Metadata associated with a local entry
///
/// Entries never expire; timestamps are informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// When the entry was stored
    pub created_at: DateTime<Utc>,

    /// Last hit
    pub accessed_at: DateTime<Utc>,

    /// Number of hits served from this entry
    pub access_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_entry_creation() {
        let entry = LocalEntry::new("value");
        assert_eq!(entry.value, "value");
        assert_eq!(entry.metadata.access_count, 0);
        assert_eq!(entry.metadata.created_at, entry.metadata.accessed_at);
    }

    #[test]
    fn test_mark_accessed() {
        let mut entry = LocalEntry::new(42);
        let initial_time = entry.metadata.accessed_at;

        sleep(Duration::from_millis(10));
        entry.mark_accessed();
        entry.mark_accessed();

        assert_eq!(entry.metadata.access_count, 2);
        assert!(entry.metadata.accessed_at > initial_time);
        assert!(entry.time_since_access() < entry.age());
    }

    #[test]
    fn test_age() {
        let entry = LocalEntry::new(());
        sleep(Duration::from_millis(10));
        assert!(entry.age() >= Duration::from_millis(10));
    }
}
