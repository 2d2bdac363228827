// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key is
//! reported at startup instead of being silently ignored.

use kontext_core::SummaryStyle;
use serde::{Deserialize, Serialize};

/// Top-level Kontext configuration. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KontextConfig {
    #[serde(default)]
    pub app: AppConfig,

    /// Defaults seeded into new conversations.
    #[serde(default)]
    pub chat: ChatConfig,

    /// When and how history is compressed.
    #[serde(default)]
    pub auto_summarization: AutoSummarizationConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    /// Credential vault settings.
    #[serde(default)]
    pub vault: VaultConfig,

    /// Provider endpoint overrides.
    #[serde(default)]
    pub providers: ProvidersConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Generation defaults for new conversations.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChatConfig {
    /// Registry key of the model used for new conversations.
    #[serde(default = "default_model")]
    pub default_model: String,

    #[serde(default = "default_temperature")]
    pub default_temperature: f64,

    /// Maximum tokens to generate per reply.
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
        }
    }
}

fn default_model() -> String {
    kontext_core::DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    4096
}

/// Auto-summarization policy.
///
/// Serialized with camelCase aliases accepted so that snapshots written by
/// older clients (`keepRecentCount`) still load.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AutoSummarizationConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Usage ratio in (0, 1] at which compression triggers.
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Number of most recent messages kept verbatim.
    #[serde(default = "default_keep_recent_count", alias = "keepRecentCount")]
    pub keep_recent_count: usize,

    #[serde(default)]
    pub style: SummaryStyle,
}

impl Default for AutoSummarizationConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            threshold: default_threshold(),
            keep_recent_count: default_keep_recent_count(),
            style: SummaryStyle::default(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_threshold() -> f64 {
    0.7
}

fn default_keep_recent_count() -> usize {
    10
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database holding the snapshot and the vault.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Quiet period before a state change is written, in milliseconds.
    #[serde(default = "default_save_debounce_ms")]
    pub save_debounce_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            save_debounce_ms: default_save_debounce_ms(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("kontext").join("kontext.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("kontext.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_save_debounce_ms() -> u64 {
    500
}

/// Argon2id parameters protecting the vault master key.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VaultConfig {
    /// Memory cost in KiB (default: 64 MiB).
    #[serde(default = "default_kdf_memory_cost")]
    pub kdf_memory_cost: u32,

    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    #[serde(default = "default_kdf_parallelism")]
    pub kdf_parallelism: u32,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            kdf_memory_cost: default_kdf_memory_cost(),
            kdf_iterations: default_kdf_iterations(),
            kdf_parallelism: default_kdf_parallelism(),
        }
    }
}

fn default_kdf_memory_cost() -> u32 {
    65536
}

fn default_kdf_iterations() -> u32 {
    3
}

fn default_kdf_parallelism() -> u32 {
    4
}

/// Base URLs and timeout for the HTTP transport.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProvidersConfig {
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,

    #[serde(default = "default_anthropic_base_url")]
    pub anthropic_base_url: String,

    #[serde(default = "default_google_base_url")]
    pub google_base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            openai_base_url: default_openai_base_url(),
            anthropic_base_url: default_anthropic_base_url(),
            google_base_url: default_google_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_google_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}
