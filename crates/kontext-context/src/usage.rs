// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context-window usage and the auto-summarization trigger.
//!
//! Both functions are pure and never fail. An unknown model degrades to a
//! zeroed, healthy reading so a stale model reference cannot break callers.

use kontext_core::{Message, ModelConfig, models};
use serde::Serialize;

use crate::tokens::estimate_for_messages;

/// Context window reported when the model is not in the registry.
pub const FALLBACK_CONTEXT_WINDOW: u32 = 8192;

/// Health classification of a usage percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UsageState {
    /// Below 50%.
    Healthy,
    /// 50% up to 70%.
    Warning,
    /// 70% up to 90%.
    Critical,
    /// 90% and above.
    Danger,
}

impl UsageState {
    pub fn from_percent(percent: f64) -> Self {
        if percent < 50.0 {
            Self::Healthy
        } else if percent < 70.0 {
            Self::Warning
        } else if percent < 90.0 {
            Self::Critical
        } else {
            Self::Danger
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextUsage {
    pub total_tokens: u32,
    pub context_window: u32,
    pub usage_percent: f64,
    pub state: UsageState,
}

impl ContextUsage {
    /// The reading used for models that cannot be resolved.
    pub fn unknown_model() -> Self {
        Self {
            total_tokens: 0,
            context_window: FALLBACK_CONTEXT_WINDOW,
            usage_percent: 0.0,
            state: UsageState::Healthy,
        }
    }

    pub fn remaining_tokens(&self) -> u32 {
        self.context_window.saturating_sub(self.total_tokens)
    }
}

/// Usage of `messages` against `model`'s context window.
pub fn usage(messages: &[Message], model: Option<&ModelConfig>) -> ContextUsage {
    let Some(model) = model.filter(|m| m.context_window > 0) else {
        return ContextUsage::unknown_model();
    };

    let total_tokens = estimate_for_messages(messages);
    let usage_percent = f64::from(total_tokens) / f64::from(model.context_window) * 100.0;
    ContextUsage {
        total_tokens,
        context_window: model.context_window,
        usage_percent,
        state: UsageState::from_percent(usage_percent),
    }
}

/// [`usage`] for a registry key.
pub fn usage_for_key(messages: &[Message], model_key: &str) -> ContextUsage {
    let model = models::lookup(model_key);
    if model.is_none() {
        tracing::debug!(model = model_key, "usage requested for unknown model");
    }
    usage(messages, model)
}

/// True iff `total / context_window >= threshold`. False for unknown models.
pub fn should_auto_summarize(
    messages: &[Message],
    model: Option<&ModelConfig>,
    threshold: f64,
) -> bool {
    let Some(model) = model.filter(|m| m.context_window > 0) else {
        return false;
    };
    let ratio = f64::from(estimate_for_messages(messages)) / f64::from(model.context_window);
    ratio >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use kontext_core::{MessageMetadata, Provider};

    fn model_with_window(context_window: u32) -> ModelConfig {
        ModelConfig {
            key: "test-model",
            id: "test-model",
            name: "Test",
            provider: Provider::OpenAi,
            context_window,
            max_output_tokens: 100,
            api_endpoint: "http://localhost",
            requires_api_key: true,
        }
    }

    fn history_with_tokens(total: u32) -> Vec<Message> {
        vec![Message::user("x").with_metadata(MessageMetadata {
            tokens: Some(total),
            ..Default::default()
        })]
    }

    #[test]
    fn state_breakpoints() {
        assert_eq!(UsageState::from_percent(0.0), UsageState::Healthy);
        assert_eq!(UsageState::from_percent(49.99), UsageState::Healthy);
        assert_eq!(UsageState::from_percent(50.0), UsageState::Warning);
        assert_eq!(UsageState::from_percent(69.99), UsageState::Warning);
        assert_eq!(UsageState::from_percent(70.0), UsageState::Critical);
        assert_eq!(UsageState::from_percent(89.99), UsageState::Critical);
        assert_eq!(UsageState::from_percent(90.0), UsageState::Danger);
        assert_eq!(UsageState::from_percent(150.0), UsageState::Danger);
    }

    #[test]
    fn usage_reports_percent_and_state() {
        let model = model_with_window(1000);
        let reading = usage(&history_with_tokens(550), Some(&model));
        assert_eq!(reading.total_tokens, 550);
        assert_eq!(reading.context_window, 1000);
        assert!((reading.usage_percent - 55.0).abs() < 1e-9);
        assert_eq!(reading.state, UsageState::Warning);
        assert_eq!(reading.remaining_tokens(), 450);
    }

    #[test]
    fn unknown_model_is_zeroed_and_healthy() {
        let reading = usage_for_key(&history_with_tokens(50_000), "no-such-model");
        assert_eq!(reading, ContextUsage::unknown_model());
        assert_eq!(reading.context_window, 8192);
        assert!(!should_auto_summarize(&history_with_tokens(50_000), None, 0.1));
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        let model = model_with_window(1000);
        assert!(should_auto_summarize(&history_with_tokens(700), Some(&model), 0.7));
        assert!(!should_auto_summarize(&history_with_tokens(699), Some(&model), 0.7));
    }

    #[test]
    fn usage_is_deterministic() {
        let model = model_with_window(4096);
        let messages = vec![Message::user("hello there"), Message::assistant("hi!")];
        assert_eq!(usage(&messages, Some(&model)), usage(&messages, Some(&model)));
    }

    #[test]
    fn registry_models_resolve_by_key() {
        let reading = usage_for_key(&[Message::user("abcd")], "gpt-4");
        assert_eq!(reading.context_window, 8192);
        assert_eq!(reading.total_tokens, 5);
    }
}
