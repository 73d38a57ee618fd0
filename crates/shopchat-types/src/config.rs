//! Application configuration types for Shopchat.
//!
//! `AppConfig` represents the top-level `config.toml`. Every field has a
//! default so an empty or missing file yields a working configuration;
//! environment overrides are applied on top by the infra loader.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
///
/// Loaded from `~/.shopchat/config.toml`. The model API key is never part
/// of this struct; it comes from the environment only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the product-search tool server.
    #[serde(default = "default_mcp_server_url")]
    pub mcp_server_url: String,

    /// Model identifier sent with every request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Output token ceiling per model request.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of conversations returned by the sidebar list.
    #[serde(default = "default_max_conversations_per_user")]
    pub max_conversations_per_user: u32,

    /// Conversations inactive for longer than this are removed by the sweep.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Owner used when a request carries no identity.
    #[serde(default = "default_owner_id")]
    pub default_owner_id: i64,

    /// Default tracing filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub turn: TurnSettings,
}

fn default_mcp_server_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_model() -> String {
    "claude-sonnet-4-5-20250929".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_max_conversations_per_user() -> u32 {
    100
}

fn default_retention_days() -> u32 {
    90
}

fn default_owner_id() -> i64 {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mcp_server_url: default_mcp_server_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            host: default_host(),
            port: default_port(),
            max_conversations_per_user: default_max_conversations_per_user(),
            retention_days: default_retention_days(),
            default_owner_id: default_owner_id(),
            log_level: default_log_level(),
            turn: TurnSettings::default(),
        }
    }
}

/// Settings consumed by the turn orchestrator.
///
/// Lives under the `[turn]` table of `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnSettings {
    /// Longest accepted utterance, in characters.
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,

    /// Characters of the first utterance kept in an auto-derived title.
    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,

    /// Delay before the first "preparing response" animation frame.
    #[serde(default = "default_progress_warmup_ms")]
    pub progress_warmup_ms: u64,

    /// Delay between animation frames.
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,

    /// Retry a failed user-message write against a fresh conversation.
    #[serde(default = "default_recover_on_persist_failure")]
    pub recover_on_persist_failure: bool,
}

fn default_max_message_length() -> usize {
    10_000
}

fn default_title_max_chars() -> usize {
    50
}

fn default_progress_warmup_ms() -> u64 {
    3_000
}

fn default_progress_interval_ms() -> u64 {
    3_000
}

fn default_recover_on_persist_failure() -> bool {
    true
}

impl Default for TurnSettings {
    fn default() -> Self {
        Self {
            max_message_length: default_max_message_length(),
            title_max_chars: default_title_max_chars(),
            progress_warmup_ms: default_progress_warmup_ms(),
            progress_interval_ms: default_progress_interval_ms(),
            recover_on_persist_failure: default_recover_on_persist_failure(),
        }
    }
}
