// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Solace conversation engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use serde::{Deserialize, Serialize};

/// Top-level Solace configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SolaceConfig {
    /// Agent identity and behavior settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Network bind settings for the gateway.
    #[serde(default)]
    pub server: ServerConfig,

    /// Credential verification settings.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Anthropic API settings.
    #[serde(default)]
    pub anthropic: AnthropicConfig,

    /// Admission control (rate limit) settings.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Message pipeline settings.
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Agent identity and behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the agent.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// System message seeded into every new conversation.
    #[serde(default = "default_greeting")]
    pub greeting: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            greeting: default_greeting(),
        }
    }
}

fn default_agent_name() -> String {
    "solace".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_greeting() -> String {
    "Hello! I'm here to listen and support you. How are you feeling today?".to_string()
}

/// Network bind configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8040
}

/// Credential verification configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// HMAC secret for signing and verifying bearer tokens.
    /// `None` makes the gateway refuse all connections (fail-closed).
    #[serde(default)]
    pub token_secret: Option<String>,

    /// Lifetime of minted tokens in seconds.
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: None,
            token_ttl_secs: default_token_ttl_secs(),
        }
    }
}

fn default_token_ttl_secs() -> u64 {
    // 15 minutes, matching short-lived access tokens.
    900
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("solace").join("solace.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("solace.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Anthropic API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnthropicConfig {
    /// Anthropic API key. `None` requires environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model to use for analysis and reply generation.
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum tokens to generate per response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Anthropic API version string.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            api_version: default_api_version(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

/// Admission control configuration.
///
/// Two independent fixed-window limiters: a coarse per-identity (or per-IP)
/// API limiter, and a stricter per-identity limiter on conversation sends.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    /// Maximum general API requests per window.
    #[serde(default = "default_api_max_requests")]
    pub api_max_requests: u32,

    /// General API window length in seconds.
    #[serde(default = "default_api_window_secs")]
    pub api_window_secs: u64,

    /// Maximum conversation messages per window.
    #[serde(default = "default_message_max")]
    pub message_max: u32,

    /// Message window length in seconds.
    #[serde(default = "default_message_window_secs")]
    pub message_window_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            api_max_requests: default_api_max_requests(),
            api_window_secs: default_api_window_secs(),
            message_max: default_message_max(),
            message_window_secs: default_message_window_secs(),
        }
    }
}

fn default_api_max_requests() -> u32 {
    100
}

fn default_api_window_secs() -> u64 {
    // 15 minutes.
    900
}

fn default_message_max() -> u32 {
    30
}

fn default_message_window_secs() -> u64 {
    60
}

/// Message pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Number of recent messages included in the reply-context window.
    #[serde(default = "default_history_window")]
    pub history_window: i64,

    /// Timeout for each analysis call in seconds.
    #[serde(default = "default_analysis_timeout_secs")]
    pub analysis_timeout_secs: u64,

    /// Timeout for the reply generation call in seconds.
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,

    /// Capacity of each per-conversation pipeline queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            analysis_timeout_secs: default_analysis_timeout_secs(),
            generation_timeout_secs: default_generation_timeout_secs(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_history_window() -> i64 {
    20
}

fn default_analysis_timeout_secs() -> u64 {
    10
}

fn default_generation_timeout_secs() -> u64 {
    30
}

fn default_queue_capacity() -> usize {
    64
}
