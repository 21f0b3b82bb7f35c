//! Gmail API integration
//!
//! This module provides:
//! - An access-token seam so OAuth stays outside the crate
//! - A Gmail API client implementing [`crate::remote::RemoteMailClient`]

mod auth;
mod client;

pub use auth::{StaticTokenProvider, TokenFileProvider, TokenProvider};
pub use client::GmailClient;

/// Gmail API response types
pub mod api {
    use serde::Deserialize;

    /// Response from listing messages
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ListMessagesResponse {
        pub messages: Option<Vec<MessageRef>>,
        pub next_page_token: Option<String>,
        pub result_size_estimate: Option<u32>,
    }

    /// Reference to a message (just ID and thread ID)
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessageRef {
        pub id: String,
        pub thread_id: Option<String>,
    }

    /// Message fetched in RAW format
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RawMessage {
        pub id: String,
        pub label_ids: Option<Vec<String>>,
        pub history_id: String,
        /// base64url-encoded RFC 2822 content
        pub raw: String,
    }

    /// Response from the history API
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct HistoryResponse {
        pub history: Option<Vec<HistoryRecord>>,
        pub history_id: Option<String>,
        pub next_page_token: Option<String>,
    }

    /// One change record in the history stream
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct HistoryRecord {
        pub messages_added: Option<Vec<MessageAdded>>,
    }

    /// A message-added history entry
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessageAdded {
        pub message: MessageRef,
    }

    /// Response from listing labels
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ListLabelsResponse {
        pub labels: Option<Vec<LabelInfo>>,
    }

    /// Label metadata
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct LabelInfo {
        pub id: String,
        pub name: String,
        /// "system" or "user"
        #[serde(rename = "type")]
        pub label_type: Option<String>,
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_parse_list_messages_response() {
            let json = r#"{
                "messages": [
                    {"id": "m1", "threadId": "t1"},
                    {"id": "m2", "threadId": "t1"}
                ],
                "nextPageToken": "tok",
                "resultSizeEstimate": 2
            }"#;

            let parsed: ListMessagesResponse = serde_json::from_str(json).unwrap();
            let messages = parsed.messages.unwrap();
            assert_eq!(messages.len(), 2);
            assert_eq!(messages[0].id, "m1");
            assert_eq!(parsed.next_page_token.as_deref(), Some("tok"));
        }

        #[test]
        fn test_parse_empty_list_response() {
            let parsed: ListMessagesResponse = serde_json::from_str("{}").unwrap();
            assert!(parsed.messages.is_none());
            assert!(parsed.next_page_token.is_none());
        }

        #[test]
        fn test_parse_raw_message() {
            let json = r#"{
                "id": "m1",
                "threadId": "t1",
                "labelIds": ["INBOX", "UNREAD"],
                "historyId": "4711",
                "raw": "RnJvbTogYUBiLmM="
            }"#;

            let parsed: RawMessage = serde_json::from_str(json).unwrap();
            assert_eq!(parsed.history_id, "4711");
            assert_eq!(parsed.label_ids.unwrap(), vec!["INBOX", "UNREAD"]);
        }

        #[test]
        fn test_parse_history_response() {
            let json = r#"{
                "history": [
                    {"messagesAdded": [{"message": {"id": "m1", "threadId": "t1"}}]},
                    {"id": "9", "messages": [{"id": "m2", "threadId": "t2"}]}
                ],
                "historyId": "102"
            }"#;

            let parsed: HistoryResponse = serde_json::from_str(json).unwrap();
            let records = parsed.history.unwrap();
            assert_eq!(records.len(), 2);
            // Records without messagesAdded (label changes etc.) parse but carry nothing
            assert!(records[1].messages_added.is_none());
            assert_eq!(parsed.history_id.as_deref(), Some("102"));
        }

        #[test]
        fn test_parse_labels_response() {
            let json = r#"{
                "labels": [
                    {"id": "INBOX", "name": "INBOX", "type": "system"},
                    {"id": "Label_7", "name": "Receipts", "type": "user"}
                ]
            }"#;

            let parsed: ListLabelsResponse = serde_json::from_str(json).unwrap();
            let labels = parsed.labels.unwrap();
            assert_eq!(labels[1].name, "Receipts");
            assert_eq!(labels[0].label_type.as_deref(), Some("system"));
        }
    }
}
