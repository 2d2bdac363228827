// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Merge order, later wins: compiled defaults, `/etc/kontext/kontext.toml`,
//! `~/.config/kontext/kontext.toml`, `./kontext.toml`, then `KONTEXT_*`
//! environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::KontextConfig;

/// Top-level sections, longest first so `auto_summarization_` wins over shorter prefixes.
const SECTIONS: &[&str] = &[
    "auto_summarization",
    "providers",
    "storage",
    "vault",
    "chat",
    "app",
];

pub const SYSTEM_CONFIG_PATH: &str = "/etc/kontext/kontext.toml";
pub const LOCAL_CONFIG_PATH: &str = "kontext.toml";

/// Path of the per-user config file, if a config directory exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("kontext").join("kontext.toml"))
}

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<KontextConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only. No files, no environment.
pub fn load_config_from_str(toml_content: &str) -> Result<KontextConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KontextConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from an explicit file with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<KontextConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KontextConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The figment behind [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(KontextConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

/// Maps `KONTEXT_<SECTION>_<KEY>` to `<section>.<key>`.
///
/// Keys contain underscores, so the split point is found by matching the
/// known section names rather than splitting on every `_`.
fn env_provider() -> Env {
    Env::prefixed("KONTEXT_")
        .ignore(&["VAULT_KEY"])
        .map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(
            map_env_key("auto_summarization_keep_recent_count"),
            "auto_summarization.keep_recent_count"
        );
        assert_eq!(map_env_key("app_log_level"), "app.log_level");
        assert_eq!(
            map_env_key("storage_save_debounce_ms"),
            "storage.save_debounce_ms"
        );
        assert_eq!(map_env_key("chat_default_model"), "chat.default_model");
        assert_eq!(map_env_key("unrelated"), "unrelated");
    }

    #[test]
    fn env_overrides_file_values() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "custom.toml",
                "[auto_summarization]\nthreshold = 0.5\nkeep_recent_count = 6\n",
            )?;
            jail.set_env("KONTEXT_AUTO_SUMMARIZATION_THRESHOLD", "0.9");
            jail.set_env("KONTEXT_VAULT_KEY", "not-a-config-value");

            let config = load_config_from_path(Path::new("custom.toml"))?;
            assert_eq!(config.auto_summarization.threshold, 0.9);
            assert_eq!(config.auto_summarization.keep_recent_count, 6);
            Ok(())
        });
    }
}
