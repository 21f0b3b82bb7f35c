//! Remote mailbox provider interface
//!
//! The sync engine consumes exactly one network boundary: a client that can
//! list message IDs, fetch full messages, and list changes since a cursor.
//! Vendor SDK types, OAuth refresh, and pagination all live behind this
//! trait, reduced to the closed error set below.

use thiserror::Error;

use crate::models::MessageId;

/// Errors a remote client can surface to the sync engine
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The message vanished between listing and fetching
    #[error("message not found")]
    NotFound,
    /// The change cursor is older than the provider's retention window
    #[error("change cursor expired")]
    CursorExpired,
    /// Retryable network or API failure; retry policy is the client's job
    #[error("{0}")]
    Transient(String),
}

/// A fully fetched message, ready for storage
#[derive(Debug, Clone)]
pub struct FetchedMessage {
    pub id: MessageId,
    /// Labels applied to the message at fetch time
    pub labels: Vec<String>,
    /// Provider sequence number (monotonic per account)
    pub sequence: String,
    /// Raw RFC 2822 bytes
    pub raw: Vec<u8>,
}

/// Changes reported for one label since a given sequence
#[derive(Debug, Clone)]
pub struct ChangeSet {
    /// IDs of messages added, in the order the provider reported them
    pub added: Vec<MessageId>,
    /// Sequence number to commit once the changes are processed
    pub sequence: String,
}

/// Client for a remote mailbox provider
///
/// Implementations own authentication, pagination, and retry/backoff; the
/// engine performs no retries of its own beyond the expired-cursor
/// fallback to full sync.
pub trait RemoteMailClient {
    /// List up to `max_results` message IDs for a label, most recent first
    fn list_message_ids(
        &self,
        label: &str,
        query: Option<&str>,
        max_results: usize,
    ) -> Result<Vec<MessageId>, RemoteError>;

    /// Fetch one message with its labels, sequence number, and raw bytes
    fn fetch_message(&self, id: &MessageId) -> Result<FetchedMessage, RemoteError>;

    /// List messages added to a label since `since_sequence`
    ///
    /// Fails with [`RemoteError::CursorExpired`] when the provider no
    /// longer retains history back to `since_sequence`.
    fn list_changes(&self, since_sequence: &str, label: &str) -> Result<ChangeSet, RemoteError>;
}
