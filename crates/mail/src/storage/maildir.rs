//! Maildir storage for synced messages
//!
//! One file per message in the standard Maildir layout, compatible with
//! notmuch and other Maildir-consuming tools. Each folder carries the
//! `cur/`, `new/`, `tmp/` triad; writes land in `tmp/` and are renamed into
//! place so a crash can never leave a partial file visible.
//!
//! Message filenames follow Maildir info2 format:
//! `<timestamp>.<message-id>.<hostname>:2,<flags>`
//!
//! Flags are single uppercase letters, alphabetically sorted:
//! - D: Draft
//! - F: Flagged (starred)
//! - S: Seen (read)
//! - T: Trashed
//!
//! The filename is the only index: existence checks scan `cur/` and `new/`
//! for the embedded message ID. That is adequate at personal-mailbox scale;
//! a larger deployment would keep an id-to-path map rebuilt at startup
//! behind the same surface.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use log::debug;

use crate::models::MessageId;

/// Gmail system labels mapped to canonical Maildir folder names
const LABEL_FOLDER_MAP: [(&str, &str); 5] = [
    ("INBOX", "INBOX"),
    ("SENT", "Sent"),
    ("DRAFT", "Drafts"),
    ("TRASH", "Trash"),
    ("SPAM", "Spam"),
];

/// Priority order for picking the primary folder of a multi-label message
const FOLDER_PRIORITY: [&str; 5] = ["INBOX", "SENT", "DRAFT", "TRASH", "SPAM"];

/// Labels that never determine folder placement
const VIRTUAL_LABELS: [&str; 8] = [
    "UNREAD",
    "STARRED",
    "IMPORTANT",
    "CATEGORY_PERSONAL",
    "CATEGORY_SOCIAL",
    "CATEGORY_PROMOTIONS",
    "CATEGORY_UPDATES",
    "CATEGORY_FORUMS",
];

/// Maildir-format message store rooted at a base directory
///
/// Holds no internal locks: concurrent runs against the same account must
/// be serialized by the caller.
pub struct MaildirStore {
    base: PathBuf,
    host: String,
}

impl MaildirStore {
    /// Open a store, creating the base directory if needed
    ///
    /// Fails if the base directory cannot be created, which doubles as the
    /// unwritable-storage-root setup check.
    pub fn open(base: impl AsRef<Path>) -> Result<Self> {
        let base = base.as_ref().to_path_buf();
        fs::create_dir_all(&base)
            .with_context(|| format!("failed to create mail directory {}", base.display()))?;

        let host = hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "localhost".to_string());

        Ok(Self { base, host })
    }

    pub fn base_path(&self) -> &Path {
        &self.base
    }

    /// Create a Maildir folder with its cur/new/tmp triad
    ///
    /// Idempotent; nested names like `Labels/Projects` are allowed.
    pub fn ensure_folder(&self, name: &str) -> Result<PathBuf> {
        let folder = self.base.join(name);
        for subdir in ["cur", "new", "tmp"] {
            fs::create_dir_all(folder.join(subdir))
                .with_context(|| format!("failed to create maildir folder {name}"))?;
        }
        Ok(folder)
    }

    /// Map a single label to its Maildir folder name
    ///
    /// System labels use the canonical names; user labels go under
    /// `Labels/<name>`.
    pub fn folder_for_label(&self, label: &str) -> String {
        for (system, folder) in LABEL_FOLDER_MAP {
            if label == system {
                return folder.to_string();
            }
        }
        format!("Labels/{label}")
    }

    /// Pick the primary folder for a message carrying multiple labels
    ///
    /// System labels win in fixed priority order; otherwise the first label
    /// that is neither a system nor a virtual label; otherwise `INBOX`.
    pub fn primary_folder(&self, labels: &[String]) -> String {
        for candidate in FOLDER_PRIORITY {
            if labels.iter().any(|l| l == candidate) {
                return self.folder_for_label(candidate);
            }
        }

        for label in labels {
            let system = LABEL_FOLDER_MAP.iter().any(|(s, _)| label == s);
            let virtual_label = VIRTUAL_LABELS.iter().any(|v| label == v);
            if !system && !virtual_label {
                return self.folder_for_label(label);
            }
        }

        "INBOX".to_string()
    }

    /// Derive the Maildir flag string from a label set
    ///
    /// Absence of UNREAD means the message has been seen. The result is
    /// sorted alphabetically per the Maildir spec.
    pub fn derive_flags(&self, labels: &[String]) -> String {
        let mut flags: Vec<char> = Vec::new();

        if !labels.iter().any(|l| l == "UNREAD") {
            flags.push('S');
        }
        if labels.iter().any(|l| l == "STARRED") {
            flags.push('F');
        }
        if labels.iter().any(|l| l == "DRAFT") {
            flags.push('D');
        }
        if labels.iter().any(|l| l == "TRASH") {
            flags.push('T');
        }

        flags.sort_unstable();
        flags.into_iter().collect()
    }

    /// Build the Maildir filename for a message
    ///
    /// The `2,` before the flags marks info2 format, the standard way of
    /// keeping flags in the filename.
    fn generate_filename(&self, id: &MessageId, flags: &str) -> String {
        let timestamp = Utc::now().timestamp();
        format!("{}.{}.{}:2,{}", timestamp, id.as_str(), self.host, flags)
    }

    /// Write a message atomically into its folder
    ///
    /// The content goes to `tmp/` first and is fsynced, then renamed into
    /// `new/` (unread) or `cur/` (seen). Rename is atomic within one
    /// filesystem, so a reader never observes a partial message.
    pub fn write_message(
        &self,
        folder: &str,
        bytes: &[u8],
        labels: &[String],
        id: &MessageId,
    ) -> Result<PathBuf> {
        let folder_path = self.ensure_folder(folder)?;

        let flags = self.derive_flags(labels);
        let filename = self.generate_filename(id, &flags);

        let tmp_path = folder_path.join("tmp").join(&filename);
        {
            let mut tmp_file = fs::File::create(&tmp_path)
                .with_context(|| format!("failed to create {}", tmp_path.display()))?;
            tmp_file.write_all(bytes)?;
            tmp_file.sync_all()?;
        }

        let dest_dir = if labels.iter().any(|l| l == "UNREAD") {
            "new"
        } else {
            "cur"
        };
        let dest_path = folder_path.join(dest_dir).join(&filename);

        fs::rename(&tmp_path, &dest_path)
            .with_context(|| format!("failed to deliver {}", dest_path.display()))?;

        debug!("wrote message {} to {}/{}", id, folder, dest_dir);
        Ok(dest_path)
    }

    /// Check whether a message is already stored
    ///
    /// Scans `cur/` and `new/` across all folders; `tmp/` is never
    /// consulted, so in-flight writes do not count as stored.
    pub fn message_exists(&self, id: &MessageId) -> Result<bool> {
        Ok(self.message_path(id)?.is_some())
    }

    /// Find the stored path of a message, if any
    pub fn message_path(&self, id: &MessageId) -> Result<Option<PathBuf>> {
        if !self.base.exists() {
            return Ok(None);
        }
        scan_folder(&self.base, id.as_str())
    }
}

/// Recursively search a directory tree for a delivered message
///
/// Only files directly under a `cur/` or `new/` directory count; `tmp/`
/// subtrees are skipped entirely.
fn scan_folder(dir: &Path, id: &str) -> Result<Option<PathBuf>> {
    for entry in fs::read_dir(dir)
        .with_context(|| format!("failed to read directory {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        match entry.file_name().to_str() {
            Some("cur") | Some("new") => {
                if let Some(found) = scan_delivery_dir(&path, id)? {
                    return Ok(Some(found));
                }
            }
            Some("tmp") => {}
            _ => {
                if let Some(found) = scan_folder(&path, id)? {
                    return Ok(Some(found));
                }
            }
        }
    }
    Ok(None)
}

fn scan_delivery_dir(dir: &Path, id: &str) -> Result<Option<PathBuf>> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if let Some(name) = entry.file_name().to_str()
            && filename_matches(name, id)
        {
            return Ok(Some(entry.path()));
        }
    }
    Ok(None)
}

/// Match a message ID inside a Maildir filename
///
/// The ID sits between the first two dots (`<ts>.<id>.<host>:2,<flags>`),
/// so the check is structural rather than a substring search; an ID that is
/// a prefix or suffix of another never matches.
fn filename_matches(filename: &str, id: &str) -> bool {
    let Some((_, rest)) = filename.split_once('.') else {
        return false;
    };
    match rest.strip_prefix(id) {
        Some(tail) => tail.starts_with('.'),
        None => false,
    }
}
