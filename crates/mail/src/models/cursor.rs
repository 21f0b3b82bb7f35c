//! Sync cursor tracking for incremental sync
//!
//! The cursor records the Gmail historyId committed by the last successful
//! run, so the next run can ask only for changes since that point.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Committed sync position for one account
///
/// Persisted as one JSON file per account by `CursorStore`. The account
/// name is the file name, not part of the record. External consumers (a
/// status display, for example) only ever read this record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncCursor {
    /// Provider sequence number (Gmail historyId), opaque but numeric
    pub sequence: String,
    /// When the owning run committed this cursor
    pub last_sync_at: DateTime<Utc>,
    /// Labels covered by the committed run
    pub synced_labels: Vec<String>,
}

impl SyncCursor {
    /// Create a cursor stamped with the current time
    pub fn new(sequence: impl Into<String>, synced_labels: Vec<String>) -> Self {
        Self {
            sequence: sequence.into(),
            last_sync_at: Utc::now(),
            synced_labels,
        }
    }

    /// Check if this cursor is recent enough to be worth trying.
    /// Gmail history IDs typically expire after about a week.
    pub fn is_recent(&self) -> bool {
        let age = Utc::now() - self.last_sync_at;
        age.num_days() < 7
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_cursor() {
        let cursor = SyncCursor::new("12345", vec!["INBOX".to_string()]);
        assert_eq!(cursor.sequence, "12345");
        assert_eq!(cursor.synced_labels, vec!["INBOX"]);
        assert!(cursor.is_recent());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let cursor = SyncCursor::new("12345", vec!["INBOX".to_string(), "SENT".to_string()]);
        let json = serde_json::to_string(&cursor).unwrap();
        let deserialized: SyncCursor = serde_json::from_str(&json).unwrap();
        assert_eq!(cursor, deserialized);
    }

    #[test]
    fn test_timestamp_serializes_as_rfc3339() {
        let cursor = SyncCursor::new("7", vec![]);
        let json = serde_json::to_value(&cursor).unwrap();
        let stamp = json["last_sync_at"].as_str().unwrap();
        assert!(stamp.contains('T'));
        assert!(DateTime::parse_from_rfc3339(stamp).is_ok());
    }
}
