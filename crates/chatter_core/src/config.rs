//! Chatter configuration.
//!
//! Loaded from a TOML file; every field has a default so a missing or
//! partial file still yields a working configuration. Load failures are
//! logged, never fatal.

use crate::dictionary::DEFAULT_BASE_URL;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Top-level chatbot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Conversation rule file (XML)
    #[serde(default = "default_data_file")]
    pub data_file: String,

    /// Minimum interval between accepted submissions (milliseconds)
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,

    /// Quiet period before an accepted submission is processed (milliseconds)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Reply used when no rule matches
    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: String,

    /// Transcript prefix for echoed user lines
    #[serde(default = "default_user_label")]
    pub user_label: String,

    /// Transcript prefix for bot replies
    #[serde(default = "default_bot_label")]
    pub bot_label: String,

    #[serde(default)]
    pub dictionary: DictionarySettings,
}

/// Dictionary API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DictionarySettings {
    /// Endpoint the looked-up word is appended to
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_data_file() -> String {
    "data/conversation_data.xml".to_string()
}

fn default_throttle_ms() -> u64 {
    500
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_fallback_reply() -> String {
    "Sorry I didn't understand.".to_string()
}

fn default_user_label() -> String {
    "You: ".to_string()
}

fn default_bot_label() -> String {
    "Bot: ".to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            throttle_ms: default_throttle_ms(),
            debounce_ms: default_debounce_ms(),
            fallback_reply: default_fallback_reply(),
            user_label: default_user_label(),
            bot_label: default_bot_label(),
            dictionary: DictionarySettings::default(),
        }
    }
}

impl Default for DictionarySettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ChatConfig {
    /// Load from a TOML file, falling back to defaults on any failure.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => match toml::from_str(&raw) {
                Ok(config) => config,
                Err(err) => {
                    warn!("Invalid config {}: {err}; using defaults", path.display());
                    Self::default()
                }
            },
            Err(err) => {
                warn!("Could not read config {}: {err}; using defaults", path.display());
                Self::default()
            }
        }
    }
}
