//! magpie-mail - Gmail-to-Maildir synchronization engine
//!
//! This crate synchronizes messages from a Gmail mailbox into a local
//! Maildir tree, one file per message, with a resumable per-account sync
//! cursor. It provides:
//! - A provider boundary ([`RemoteMailClient`]) with a Gmail implementation
//! - Durable Maildir storage with atomic, crash-safe message delivery
//! - A per-account cursor store for incremental sync
//! - A sync engine that picks full or incremental mode and aggregates
//!   per-message failures without aborting a run
//!
//! The crate has no UI, CLI, or OAuth-flow dependencies; hosts supply
//! credentials through the [`TokenProvider`] seam and drive runs through
//! [`sync::sync`]. Runs for the same account must be serialized by the
//! caller.

pub mod config;
pub mod gmail;
pub mod models;
pub mod remote;
pub mod storage;
pub mod sync;

pub use config::{AccountConfig, Config, Defaults};
pub use gmail::{GmailClient, StaticTokenProvider, TokenFileProvider, TokenProvider};
pub use models::{MessageId, SyncCursor};
pub use remote::{ChangeSet, FetchedMessage, RemoteError, RemoteMailClient};
pub use storage::{CursorStore, MaildirStore};
pub use sync::{
    full_sync, incremental_sync, sync, ProgressFn, SyncOptions, SyncReport,
    INCREMENTAL_PROGRESS_LABEL,
};
