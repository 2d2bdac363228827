// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic checks that serde attributes cannot express.

use kontext_core::models;

use crate::diagnostic::{ConfigError, suggest_key};
use crate::model::{AutoSummarizationConfig, KontextConfig};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const MAX_DEBOUNCE_MS: u64 = 10_000;

/// Validates a deserialized configuration, collecting every violation.
pub fn validate_config(config: &KontextConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.app.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "app.log_level must be one of {}, got `{}`",
                LOG_LEVELS.join(", "),
                config.app.log_level
            ),
        });
    }

    if let Err(err) = validate_model_key("chat.default_model", &config.chat.default_model) {
        errors.push(err);
    }

    if !(0.0..=2.0).contains(&config.chat.default_temperature) {
        errors.push(ConfigError::Validation {
            message: format!(
                "chat.default_temperature must be between 0 and 2, got {}",
                config.chat.default_temperature
            ),
        });
    }

    if config.chat.default_max_tokens == 0 {
        errors.push(ConfigError::Validation {
            message: "chat.default_max_tokens must be greater than 0".to_string(),
        });
    }

    errors.extend(validate_auto_summarization(&config.auto_summarization));

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.storage.save_debounce_ms > MAX_DEBOUNCE_MS {
        errors.push(ConfigError::Validation {
            message: format!(
                "storage.save_debounce_ms must be at most {MAX_DEBOUNCE_MS}, got {}",
                config.storage.save_debounce_ms
            ),
        });
    }

    if config.vault.kdf_memory_cost < 32768 {
        errors.push(ConfigError::Validation {
            message: format!(
                "vault.kdf_memory_cost must be at least 32768 (32 MiB), got {}",
                config.vault.kdf_memory_cost
            ),
        });
    }
    if config.vault.kdf_iterations < 2 {
        errors.push(ConfigError::Validation {
            message: format!(
                "vault.kdf_iterations must be at least 2, got {}",
                config.vault.kdf_iterations
            ),
        });
    }
    if config.vault.kdf_parallelism < 1 {
        errors.push(ConfigError::Validation {
            message: "vault.kdf_parallelism must be at least 1".to_string(),
        });
    }

    if config.providers.request_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "providers.request_timeout_secs must be greater than 0".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Threshold must lie in (0, 1]. Shared with runtime settings merges.
pub fn validate_auto_summarization(config: &AutoSummarizationConfig) -> Vec<ConfigError> {
    let mut errors = Vec::new();
    if !(config.threshold > 0.0 && config.threshold <= 1.0) {
        errors.push(ConfigError::Validation {
            message: format!(
                "auto_summarization.threshold must be in (0, 1], got {}",
                config.threshold
            ),
        });
    }
    errors
}

/// Checks that `model` is a registry key, suggesting the closest one if not.
pub fn validate_model_key(field: &str, model: &str) -> Result<(), ConfigError> {
    if models::lookup(model).is_some() {
        return Ok(());
    }
    let keys: Vec<&str> = models::keys().collect();
    Err(ConfigError::UnknownModel {
        key: field.to_string(),
        model: model.to_string(),
        suggestion: suggest_key(model, &keys),
        valid_models: keys.join(", "),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&KontextConfig::default()).is_ok());
    }

    #[test]
    fn collects_all_violations() {
        let mut config = KontextConfig::default();
        config.auto_summarization.threshold = 0.0;
        config.chat.default_temperature = 3.5;
        config.storage.database_path = "  ".to_string();
        config.storage.save_debounce_ms = 60_000;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn threshold_of_one_is_allowed() {
        let config = AutoSummarizationConfig {
            threshold: 1.0,
            ..Default::default()
        };
        assert!(validate_auto_summarization(&config).is_empty());

        let config = AutoSummarizationConfig {
            threshold: 1.01,
            ..Default::default()
        };
        assert_eq!(validate_auto_summarization(&config).len(), 1);
    }

    #[test]
    fn unknown_model_gets_a_suggestion() {
        match validate_model_key("chat.default_model", "gpt-4oo") {
            Err(ConfigError::UnknownModel { suggestion, .. }) => {
                assert_eq!(suggestion.as_deref(), Some("gpt-4o"));
            }
            other => panic!("expected UnknownModel, got {other:?}"),
        }
    }
}
