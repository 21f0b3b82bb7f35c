//! Configuration for sync runs
//!
//! Everything here is an explicitly constructed object handed to the
//! engine's collaborators at setup time; there is no process-wide cached
//! configuration. The JSON loaders exist for hosts that keep a config
//! file, but tests and embedders can build the structs directly.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::sync::SyncOptions;

/// Application directory name under the platform config root
const APP_DIR: &str = "magpie";

/// Default settings applied to every account unless overridden
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// Maximum messages to sync per label in full sync
    pub max_messages: Option<usize>,
    /// Only sync messages from the last N days
    pub days: Option<u32>,
}

/// One account's configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    /// Mail provider; only "gmail" is supported
    pub provider: String,
    /// Local Maildir root for this account
    pub mail_dir: PathBuf,
    #[serde(default)]
    pub max_messages: Option<usize>,
    #[serde(default)]
    pub days: Option<u32>,
}

impl AccountConfig {
    /// Reject configurations this crate cannot sync
    ///
    /// Runs as a setup check, before any credentials are touched or any
    /// fetch attempted.
    pub fn validate(&self) -> Result<()> {
        if self.provider != "gmail" {
            anyhow::bail!("unsupported account provider: {}", self.provider);
        }
        Ok(())
    }

    /// Assemble the sync options for this account, filling gaps from the
    /// defaults section
    pub fn sync_options(&self, defaults: &Defaults) -> SyncOptions {
        let mut opts = SyncOptions::default();
        if let Some(max) = self.max_messages.or(defaults.max_messages) {
            opts.max_messages = max;
        }
        opts.days = self.days.or(defaults.days);
        opts
    }
}

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub accounts: HashMap<String, AccountConfig>,
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_json(&data)
    }

    /// Parse configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("failed to parse configuration")
    }

    /// Look up an account by name
    pub fn account(&self, name: &str) -> Result<&AccountConfig> {
        self.accounts
            .get(name)
            .with_context(|| format!("no account named {name:?} in configuration"))
    }
}

/// Default configuration directory (`~/.config/magpie` on Linux)
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR))
}

/// Default configuration file path
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|dir| dir.join("config.json"))
}

/// Default directory for per-account sync cursors
pub fn default_state_dir() -> Option<PathBuf> {
    default_config_dir().map(|dir| dir.join("sync-state"))
}
