// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime settings and their explicit merge.
//!
//! Settings are seeded from [`KontextConfig`] and afterwards only change
//! through [`Settings::merge`], which validates the merged result before it
//! can be applied. API keys live alongside but are never serialized.

use std::collections::HashMap;
use std::fmt;

use kontext_config::validation::{validate_auto_summarization, validate_model_key};
use kontext_config::{AutoSummarizationConfig, KontextConfig};
use kontext_core::{Credentials, KontextError, Provider};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Provider API keys held in memory. Empty keys are never stored.
#[derive(Default)]
pub struct ApiKeys(HashMap<Provider, SecretString>);

impl ApiKeys {
    pub fn from_credentials(credentials: Credentials) -> Self {
        Self(
            credentials
                .into_iter()
                .filter(|(_, key)| !key.expose_secret().is_empty())
                .collect(),
        )
    }

    pub fn get(&self, provider: Provider) -> Option<&SecretString> {
        self.0.get(&provider)
    }

    /// Providers with a key, in stable order.
    pub fn configured(&self) -> Vec<Provider> {
        let mut providers: Vec<Provider> = self.0.keys().copied().collect();
        providers.sort();
        providers
    }

    /// Overwrites the given providers. An empty secret removes the key.
    fn apply(&mut self, update: &Credentials) {
        for (provider, key) in update {
            if key.expose_secret().is_empty() {
                self.0.remove(provider);
            } else {
                self.0.insert(*provider, rewrap(key));
            }
        }
    }
}

fn rewrap(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_owned())
}

impl Clone for ApiKeys {
    fn clone(&self) -> Self {
        Self(self.0.iter().map(|(p, k)| (*p, rewrap(k))).collect())
    }
}

impl fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.configured()).finish()
    }
}

/// Global settings persisted in the application snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(skip)]
    pub api_keys: ApiKeys,
    /// Registry key of the model for new conversations.
    pub default_model: String,
    pub default_temperature: f64,
    pub default_max_tokens: u32,
    pub auto_summarization: AutoSummarizationConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_config(&KontextConfig::default())
    }
}

/// A partial settings update. `None` fields keep their current value.
#[derive(Debug, Default)]
pub struct SettingsPatch {
    /// Keys to overwrite; an empty secret clears that provider.
    pub api_keys: Option<Credentials>,
    pub default_model: Option<String>,
    pub default_temperature: Option<f64>,
    pub default_max_tokens: Option<u32>,
    /// Replaces the whole auto-summarization block.
    pub auto_summarization: Option<AutoSummarizationConfig>,
}

impl Settings {
    pub fn from_config(config: &KontextConfig) -> Self {
        Self {
            api_keys: ApiKeys::default(),
            default_model: config.chat.default_model.clone(),
            default_temperature: config.chat.default_temperature,
            default_max_tokens: config.chat.default_max_tokens,
            auto_summarization: config.auto_summarization.clone(),
        }
    }

    /// Returns `self` with `patch` applied, or every violation found in the result.
    pub fn merge(&self, patch: &SettingsPatch) -> Result<Settings, KontextError> {
        let mut merged = self.clone();
        if let Some(keys) = &patch.api_keys {
            merged.api_keys.apply(keys);
        }
        if let Some(model) = &patch.default_model {
            merged.default_model.clone_from(model);
        }
        if let Some(temperature) = patch.default_temperature {
            merged.default_temperature = temperature;
        }
        if let Some(max_tokens) = patch.default_max_tokens {
            merged.default_max_tokens = max_tokens;
        }
        if let Some(auto) = &patch.auto_summarization {
            merged.auto_summarization = auto.clone();
        }
        merged.validate()?;
        Ok(merged)
    }

    pub fn validate(&self) -> Result<(), KontextError> {
        let mut problems: Vec<String> = Vec::new();
        if let Err(err) = validate_model_key("default_model", &self.default_model) {
            problems.push(err.to_string());
        }
        if !(0.0..=2.0).contains(&self.default_temperature) {
            problems.push(format!(
                "default_temperature must be between 0 and 2, got {}",
                self.default_temperature
            ));
        }
        if self.default_max_tokens == 0 {
            problems.push("default_max_tokens must be greater than 0".to_string());
        }
        problems.extend(
            validate_auto_summarization(&self.auto_summarization)
                .into_iter()
                .map(|e| e.to_string()),
        );

        if problems.is_empty() {
            Ok(())
        } else {
            Err(KontextError::Config(problems.join("; ")))
        }
    }
}
