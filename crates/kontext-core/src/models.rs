// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Static registry of supported chat models.

use serde::Serialize;

use crate::types::Provider;

/// Registry key of the model new conversations use when nothing else is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Immutable description of a chat model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    /// Registry key used in settings and conversation metadata.
    pub key: &'static str,
    /// Model identifier sent to the provider API.
    pub id: &'static str,
    pub name: &'static str,
    pub provider: Provider,
    pub context_window: u32,
    pub max_output_tokens: u32,
    pub api_endpoint: &'static str,
    pub requires_api_key: bool,
}

const OPENAI_CHAT: &str = "https://api.openai.com/v1/chat/completions";
const ANTHROPIC_MESSAGES: &str = "https://api.anthropic.com/v1/messages";

static MODELS: &[ModelConfig] = &[
    ModelConfig {
        key: "gpt-4o",
        id: "gpt-4o",
        name: "GPT-4o",
        provider: Provider::OpenAi,
        context_window: 128_000,
        max_output_tokens: 16_384,
        api_endpoint: OPENAI_CHAT,
        requires_api_key: true,
    },
    ModelConfig {
        key: "gpt-4",
        id: "gpt-4",
        name: "GPT-4",
        provider: Provider::OpenAi,
        context_window: 8_192,
        max_output_tokens: 4_096,
        api_endpoint: OPENAI_CHAT,
        requires_api_key: true,
    },
    ModelConfig {
        key: "gpt-4-turbo",
        id: "gpt-4-turbo-preview",
        name: "GPT-4 Turbo",
        provider: Provider::OpenAi,
        context_window: 128_000,
        max_output_tokens: 4_096,
        api_endpoint: OPENAI_CHAT,
        requires_api_key: true,
    },
    ModelConfig {
        key: "gpt-3.5-turbo",
        id: "gpt-3.5-turbo",
        name: "GPT-3.5 Turbo",
        provider: Provider::OpenAi,
        context_window: 16_385,
        max_output_tokens: 4_096,
        api_endpoint: OPENAI_CHAT,
        requires_api_key: true,
    },
    ModelConfig {
        key: "claude-3-opus",
        id: "claude-3-opus-20240229",
        name: "Claude 3 Opus",
        provider: Provider::Anthropic,
        context_window: 200_000,
        max_output_tokens: 4_096,
        api_endpoint: ANTHROPIC_MESSAGES,
        requires_api_key: true,
    },
    ModelConfig {
        key: "claude-3-sonnet",
        id: "claude-3-sonnet-20240229",
        name: "Claude 3 Sonnet",
        provider: Provider::Anthropic,
        context_window: 200_000,
        max_output_tokens: 4_096,
        api_endpoint: ANTHROPIC_MESSAGES,
        requires_api_key: true,
    },
    ModelConfig {
        key: "claude-3.5-sonnet",
        id: "claude-3-5-sonnet-20241022",
        name: "Claude 3.5 Sonnet",
        provider: Provider::Anthropic,
        context_window: 200_000,
        max_output_tokens: 8_192,
        api_endpoint: ANTHROPIC_MESSAGES,
        requires_api_key: true,
    },
    ModelConfig {
        key: "gemini-pro",
        id: "gemini-pro",
        name: "Gemini Pro",
        provider: Provider::Google,
        context_window: 32_768,
        max_output_tokens: 8_192,
        api_endpoint: "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent",
        requires_api_key: true,
    },
];

/// Looks up a model by registry key.
pub fn lookup(key: &str) -> Option<&'static ModelConfig> {
    MODELS.iter().find(|m| m.key == key)
}

/// The model behind [`DEFAULT_MODEL`].
pub fn default_model() -> &'static ModelConfig {
    &MODELS[0]
}

/// All registered models, in display order.
pub fn all() -> &'static [ModelConfig] {
    MODELS
}

/// Registry keys, for diagnostics and suggestions.
pub fn keys() -> impl Iterator<Item = &'static str> {
    MODELS.iter().map(|m| m.key)
}
