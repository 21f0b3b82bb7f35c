//! Gmail API HTTP client
//!
//! Implements [`RemoteMailClient`] against the Gmail REST API.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use base64::prelude::*;

use super::api::{HistoryResponse, ListLabelsResponse, ListMessagesResponse, RawMessage};
use super::TokenProvider;
use crate::models::MessageId;
use crate::remote::{ChangeSet, FetchedMessage, RemoteError, RemoteMailClient};

/// Gmail API client
///
/// Owns pagination and the mapping of HTTP failures onto the closed
/// [`RemoteError`] set. Callers should check [`GmailClient::verify_credentials`]
/// once at setup time so a missing token aborts before any fetch.
pub struct GmailClient {
    token: Box<dyn TokenProvider>,
}

impl GmailClient {
    /// Gmail API base URL
    const BASE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1";

    /// API maximum page size for list calls
    const PAGE_SIZE: usize = 500;

    pub fn new(token: Box<dyn TokenProvider>) -> Self {
        Self { token }
    }

    /// Confirm a token is obtainable; the "missing credentials" setup check
    pub fn verify_credentials(&self) -> anyhow::Result<()> {
        self.token.access_token()?;
        Ok(())
    }

    fn bearer(&self) -> Result<String, RemoteError> {
        let token = self
            .token
            .access_token()
            .map_err(|e| RemoteError::Transient(format!("failed to obtain access token: {e}")))?;
        Ok(format!("Bearer {token}"))
    }

    /// Fetch one page of the message list
    fn list_messages_page(
        &self,
        label: &str,
        query: Option<&str>,
        page_size: usize,
        page_token: Option<&str>,
    ) -> Result<ListMessagesResponse, RemoteError> {
        let mut url = format!(
            "{}/users/me/messages?maxResults={}&labelIds={}",
            Self::BASE_URL,
            page_size.min(Self::PAGE_SIZE),
            urlencoding::encode(label),
        );
        if let Some(q) = query {
            url.push_str(&format!("&q={}", urlencoding::encode(q)));
        }
        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={}", token));
        }

        let mut response = ureq::get(&url)
            .header("Authorization", &self.bearer()?)
            .call()
            .map_err(|e| RemoteError::Transient(format!("failed to list messages: {e}")))?;

        response
            .body_mut()
            .read_json()
            .map_err(|e| RemoteError::Transient(format!("failed to parse list response: {e}")))
    }

    /// Fetch one page of the history list
    fn list_history_page(
        &self,
        start_sequence: &str,
        label: &str,
        page_token: Option<&str>,
    ) -> Result<HistoryResponse, RemoteError> {
        let mut url = format!(
            "{}/users/me/history?startHistoryId={}&historyTypes=messageAdded&labelId={}",
            Self::BASE_URL,
            urlencoding::encode(start_sequence),
            urlencoding::encode(label),
        );
        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={}", token));
        }

        let response = ureq::get(&url)
            .header("Authorization", &self.bearer()?)
            .call();

        match response {
            Ok(mut resp) => resp
                .body_mut()
                .read_json()
                .map_err(|e| RemoteError::Transient(format!("failed to parse history response: {e}"))),
            // 404 from the history API means the start ID fell out of the
            // provider's retention window
            Err(ureq::Error::StatusCode(404)) => Err(RemoteError::CursorExpired),
            Err(e) => Err(RemoteError::Transient(format!(
                "failed to fetch history: {e}"
            ))),
        }
    }

    /// List all labels in the user's mailbox
    pub fn list_labels(&self) -> Result<ListLabelsResponse, RemoteError> {
        let url = format!("{}/users/me/labels", Self::BASE_URL);

        let mut response = ureq::get(&url)
            .header("Authorization", &self.bearer()?)
            .call()
            .map_err(|e| RemoteError::Transient(format!("failed to list labels: {e}")))?;

        response
            .body_mut()
            .read_json()
            .map_err(|e| RemoteError::Transient(format!("failed to parse labels response: {e}")))
    }
}

impl RemoteMailClient for GmailClient {
    fn list_message_ids(
        &self,
        label: &str,
        query: Option<&str>,
        max_results: usize,
    ) -> Result<Vec<MessageId>, RemoteError> {
        let mut ids: Vec<MessageId> = Vec::new();
        let mut page_token: Option<String> = None;

        while ids.len() < max_results {
            let remaining = max_results - ids.len();
            let response =
                self.list_messages_page(label, query, remaining, page_token.as_deref())?;

            for msg in response.messages.unwrap_or_default() {
                ids.push(MessageId::new(msg.id));
                if ids.len() >= max_results {
                    break;
                }
            }

            match response.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(ids)
    }

    fn fetch_message(&self, id: &MessageId) -> Result<FetchedMessage, RemoteError> {
        let url = format!(
            "{}/users/me/messages/{}?format=raw",
            Self::BASE_URL,
            id.as_str()
        );

        let response = ureq::get(&url)
            .header("Authorization", &self.bearer()?)
            .call();

        let mut resp = match response {
            Ok(resp) => resp,
            Err(ureq::Error::StatusCode(404)) => return Err(RemoteError::NotFound),
            Err(e) => {
                return Err(RemoteError::Transient(format!(
                    "failed to fetch message {id}: {e}"
                )));
            }
        };

        let message: RawMessage = resp
            .body_mut()
            .read_json()
            .map_err(|e| RemoteError::Transient(format!("failed to parse message response: {e}")))?;

        let raw = decode_raw(&message.raw).ok_or_else(|| {
            RemoteError::Transient(format!("message {id} carried undecodable raw content"))
        })?;

        Ok(FetchedMessage {
            id: MessageId::new(message.id),
            labels: message.label_ids.unwrap_or_default(),
            sequence: message.history_id,
            raw,
        })
    }

    fn list_changes(&self, since_sequence: &str, label: &str) -> Result<ChangeSet, RemoteError> {
        let mut added: Vec<MessageId> = Vec::new();
        let mut sequence = since_sequence.to_string();
        let mut page_token: Option<String> = None;

        loop {
            let response = self.list_history_page(since_sequence, label, page_token.as_deref())?;

            for record in response.history.unwrap_or_default() {
                for entry in record.messages_added.unwrap_or_default() {
                    added.push(MessageId::new(entry.message.id));
                }
            }

            // The response may omit historyId on empty pages; keep the last
            // one seen, falling back to the start position
            if let Some(id) = response.history_id {
                sequence = id;
            }

            match response.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(ChangeSet { added, sequence })
    }
}

/// Decode Gmail's RAW message content
///
/// Gmail uses URL-safe base64 but padding can vary, so we try multiple
/// decoders.
fn decode_raw(data: &str) -> Option<Vec<u8>> {
    let decoders: &[&base64::engine::GeneralPurpose] = &[
        &BASE64_URL_SAFE,
        &BASE64_URL_SAFE_NO_PAD,
        &BASE64_STANDARD,
        &BASE64_STANDARD_NO_PAD,
    ];

    for decoder in decoders {
        if let Ok(decoded) = decoder.decode(data) {
            return Some(decoded);
        }
    }

    None
}
