//! Persistent sync cursors, one JSON file per account
//!
//! Cursor files use the same write-then-rename discipline as message
//! delivery: a crash mid-save leaves the previously committed cursor
//! intact. A missing or unparseable file reads as "no cursor", which
//! forces the next run to be a full sync.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::warn;

use crate::models::SyncCursor;

/// Store for per-account sync cursors
pub struct CursorStore {
    dir: PathBuf,
}

impl CursorStore {
    /// Open a cursor store, creating the state directory if needed
    ///
    /// On Unix the directory is restricted to the owner (0700).
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create state directory {}", dir.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&dir, fs::Permissions::from_mode(0o700))
                .with_context(|| format!("failed to restrict {}", dir.display()))?;
        }

        Ok(Self { dir })
    }

    /// Path of the cursor file for an account
    pub fn cursor_path(&self, account: &str) -> PathBuf {
        self.dir.join(format!("{account}.json"))
    }

    /// Load the committed cursor for an account
    ///
    /// Absent and corrupted files both read as `None`.
    pub fn load(&self, account: &str) -> Option<SyncCursor> {
        let path = self.cursor_path(account);
        let data = fs::read_to_string(&path).ok()?;

        match serde_json::from_str(&data) {
            Ok(cursor) => Some(cursor),
            Err(e) => {
                warn!(
                    "ignoring unreadable cursor file {}: {}",
                    path.display(),
                    e
                );
                None
            }
        }
    }

    /// Commit a new cursor for an account
    ///
    /// Writes to a temporary name in the same directory, fsyncs, then
    /// renames over the previous file. On Unix the file is mode 0600.
    pub fn save(&self, account: &str, sequence: &str, labels: &[String]) -> Result<SyncCursor> {
        let cursor = SyncCursor::new(sequence, labels.to_vec());

        let path = self.cursor_path(account);
        let tmp_path = self.dir.join(format!("{account}.json.tmp"));
        let data = serde_json::to_vec_pretty(&cursor).context("failed to serialize cursor")?;

        {
            let mut file = fs::File::create(&tmp_path)
                .with_context(|| format!("failed to create {}", tmp_path.display()))?;
            file.write_all(&data)?;
            file.sync_all()?;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o600))?;
        }

        fs::rename(&tmp_path, &path)
            .with_context(|| format!("failed to commit cursor for account {account}"))?;

        Ok(cursor)
    }

    /// Delete the stored cursor, forcing the next run to be full
    pub fn clear(&self, account: &str) -> Result<()> {
        let path = self.cursor_path(account);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("failed to clear cursor for account {account}"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_load_returns_none_when_no_file() {
        let dir = tempdir().unwrap();
        let store = CursorStore::open(dir.path().join("sync-state")).unwrap();
        assert!(store.load("personal").is_none());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let store = CursorStore::open(dir.path().join("sync-state")).unwrap();

        store
            .save("personal", "12345", &labels(&["INBOX", "SENT"]))
            .unwrap();

        let loaded = store.load("personal").unwrap();
        assert_eq!(loaded.sequence, "12345");
        assert_eq!(loaded.synced_labels, vec!["INBOX", "SENT"]);
    }

    #[test]
    fn test_sequence_kept_verbatim() {
        let dir = tempdir().unwrap();
        let store = CursorStore::open(dir.path().join("sync-state")).unwrap();

        // Sequences are opaque strings; leading zeros must survive
        store.save("personal", "0042", &[]).unwrap();
        assert_eq!(store.load("personal").unwrap().sequence, "0042");
    }

    #[test]
    fn test_corrupted_file_reads_as_absent() {
        let dir = tempdir().unwrap();
        let store = CursorStore::open(dir.path().join("sync-state")).unwrap();

        fs::write(store.cursor_path("personal"), "not valid json").unwrap();
        assert!(store.load("personal").is_none());
    }

    #[test]
    fn test_clear_removes_file() {
        let dir = tempdir().unwrap();
        let store = CursorStore::open(dir.path().join("sync-state")).unwrap();

        store.save("personal", "1", &[]).unwrap();
        store.clear("personal").unwrap();

        assert!(!store.cursor_path("personal").exists());
        assert!(store.load("personal").is_none());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = CursorStore::open(dir.path().join("sync-state")).unwrap();
        store.clear("never-saved").unwrap();
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let state_dir = dir.path().join("sync-state");
        let store = CursorStore::open(&state_dir).unwrap();

        store.save("personal", "1", &[]).unwrap();

        let names: Vec<String> = fs::read_dir(&state_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["personal.json"]);
    }

    #[test]
    fn test_save_overwrites_previous_cursor() {
        let dir = tempdir().unwrap();
        let store = CursorStore::open(dir.path().join("sync-state")).unwrap();

        let first = store.save("personal", "100", &labels(&["INBOX"])).unwrap();
        let second = store.save("personal", "200", &labels(&["INBOX"])).unwrap();

        assert!(second.last_sync_at >= first.last_sync_at);
        assert_eq!(store.load("personal").unwrap().sequence, "200");
    }

    #[test]
    fn test_accounts_are_independent() {
        let dir = tempdir().unwrap();
        let store = CursorStore::open(dir.path().join("sync-state")).unwrap();

        store.save("personal", "1", &[]).unwrap();
        store.save("work", "2", &[]).unwrap();
        store.clear("personal").unwrap();

        assert!(store.load("personal").is_none());
        assert_eq!(store.load("work").unwrap().sequence, "2");
    }
}
