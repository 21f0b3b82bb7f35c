//! Access tokens for the Gmail API
//!
//! Token acquisition and refresh (the OAuth browser dance) happen outside
//! this crate; the client only needs something that can hand it a bearer
//! token on demand. A failing provider surfaces before any fetch is
//! attempted, as a setup error.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Source of bearer tokens for API requests
pub trait TokenProvider: Send + Sync {
    /// Return a currently valid access token
    fn access_token(&self) -> Result<String>;
}

/// Fixed token, handed in by the caller
///
/// Useful when an external credential helper already holds a fresh token.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl TokenProvider for StaticTokenProvider {
    fn access_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

/// Stored token file written by an external OAuth helper
#[derive(Debug, Deserialize)]
struct StoredToken {
    access_token: String,
    #[serde(default)]
    expires_at: Option<i64>,
}

/// Reads the access token from a JSON token file on every request
///
/// The file is re-read each time so an external refresher can rotate it
/// underneath a long sync run. An expired or missing token is an error;
/// this provider never refreshes anything itself.
pub struct TokenFileProvider {
    token_path: PathBuf,
}

impl TokenFileProvider {
    pub fn new(token_path: impl AsRef<Path>) -> Self {
        Self {
            token_path: token_path.as_ref().to_path_buf(),
        }
    }
}

impl TokenProvider for TokenFileProvider {
    fn access_token(&self) -> Result<String> {
        let data = std::fs::read_to_string(&self.token_path).with_context(|| {
            format!("failed to read token file {}", self.token_path.display())
        })?;
        let token: StoredToken = serde_json::from_str(&data).with_context(|| {
            format!("failed to parse token file {}", self.token_path.display())
        })?;

        if let Some(expires_at) = token.expires_at {
            let now = chrono::Utc::now().timestamp();
            // 5 minute buffer so a token does not expire mid-run
            if expires_at <= now + 300 {
                anyhow::bail!(
                    "access token in {} is expired; re-run the credential helper",
                    self.token_path.display()
                );
            }
        }

        Ok(token.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_provider() {
        let provider = StaticTokenProvider::new("tok-123");
        assert_eq!(provider.access_token().unwrap(), "tok-123");
    }

    #[test]
    fn test_file_provider_reads_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gmail-tokens.json");
        let expires = chrono::Utc::now().timestamp() + 3600;
        std::fs::write(
            &path,
            format!(r#"{{"access_token": "tok-456", "expires_at": {expires}}}"#),
        )
        .unwrap();

        let provider = TokenFileProvider::new(&path);
        assert_eq!(provider.access_token().unwrap(), "tok-456");
    }

    #[test]
    fn test_file_provider_rejects_expired_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gmail-tokens.json");
        std::fs::write(&path, r#"{"access_token": "tok", "expires_at": 1000}"#).unwrap();

        let provider = TokenFileProvider::new(&path);
        assert!(provider.access_token().is_err());
    }

    #[test]
    fn test_file_provider_missing_file_is_error() {
        let provider = TokenFileProvider::new("/nonexistent/tokens.json");
        assert!(provider.access_token().is_err());
    }

    #[test]
    fn test_file_provider_without_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gmail-tokens.json");
        std::fs::write(&path, r#"{"access_token": "tok-789"}"#).unwrap();

        let provider = TokenFileProvider::new(&path);
        assert_eq!(provider.access_token().unwrap(), "tok-789");
    }
}
