// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Summarization engine: folds the older part of a history into a single
//! synthetic system message while keeping the most recent messages verbatim.
//!
//! Every function here is side-effect free apart from the transport call.
//! On failure nothing is returned that a caller could half-apply.

use chrono::Utc;
use kontext_core::{
    ChatRequest, CompletionTransport, KontextError, Message, MessageKind, MessageMetadata,
    ModelConfig, SummaryStyle,
};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use crate::prompts::{MANUAL_SUMMARY_PROMPT, summary_request};
use crate::tokens::{estimate, estimate_for_messages};

/// Prefix of the content of every auto-summary message.
pub const SUMMARY_HEADER: &str = "[CONVERSATION SUMMARY]\n\n";

const SUMMARY_TEMPERATURE: f64 = 0.7;
const SUMMARY_MAX_TOKENS: u32 = 2000;

/// Everything the engine needs to reach the model.
pub struct SummaryTarget<'a> {
    pub model: &'static ModelConfig,
    pub credential: &'a SecretString,
}

impl SummaryTarget<'_> {
    fn request(&self, messages: Vec<Message>, temperature: f64, max_tokens: u32) -> ChatRequest {
        ChatRequest {
            model: self.model,
            messages,
            credential: SecretString::from(self.credential.expose_secret().to_owned()),
            temperature,
            max_output_tokens: max_tokens,
        }
    }
}

/// Result of a successful [`auto_summarize`].
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryOutcome {
    /// `[summary, ...recent]`.
    pub messages: Vec<Message>,
    /// Raw summary text as returned by the model.
    pub summary: String,
    pub summarized_count: usize,
    /// Ids of the folded messages, in their original order.
    pub summarized_ids: Vec<String>,
    /// `old_tokens - summary_tokens`; negative when the summary is longer.
    pub tokens_saved: i64,
    /// Token total of `messages`.
    pub new_token_total: u32,
}

/// Splits `messages` into the prefix to fold and the suffix to keep.
pub fn split_history(
    messages: &[Message],
    keep_recent_count: usize,
) -> Result<(&[Message], &[Message]), KontextError> {
    if messages.len() <= keep_recent_count {
        return Err(KontextError::InsufficientHistory {
            available: messages.len(),
            keep_recent: keep_recent_count,
        });
    }
    Ok(messages.split_at(messages.len() - keep_recent_count))
}

/// Asks the model to summarize `messages` in the given style.
///
/// The request is standalone; it is never appended to a conversation.
pub async fn generate_summary(
    transport: &dyn CompletionTransport,
    target: &SummaryTarget<'_>,
    messages: &[Message],
    style: SummaryStyle,
) -> Result<String, KontextError> {
    if messages.is_empty() {
        return Err(KontextError::InsufficientHistory {
            available: 0,
            keep_recent: 0,
        });
    }

    let request = target.request(
        summary_request(messages, style),
        SUMMARY_TEMPERATURE,
        SUMMARY_MAX_TOKENS,
    );
    let response = transport
        .send_chat(request)
        .await
        .map_err(summarization_failed)?;

    debug!(
        model = target.model.key,
        tokens_used = ?response.tokens_used,
        input_messages = messages.len(),
        "summary generated"
    );
    Ok(response.content)
}

/// Folds all but the last `keep_recent_count` messages into one summary message.
///
/// Fails with [`KontextError::InsufficientHistory`] without touching the
/// transport when there is nothing to fold.
pub async fn auto_summarize(
    transport: &dyn CompletionTransport,
    target: &SummaryTarget<'_>,
    messages: &[Message],
    keep_recent_count: usize,
    style: SummaryStyle,
) -> Result<SummaryOutcome, KontextError> {
    let (old, recent) = split_history(messages, keep_recent_count)?;

    let summary = generate_summary(transport, target, old, style).await?;

    let old_tokens = estimate_for_messages(old);
    let summary_tokens = estimate(&summary);
    let tokens_saved = i64::from(old_tokens) - i64::from(summary_tokens);
    if tokens_saved < 0 {
        warn!(
            old_tokens,
            summary_tokens, "summary is larger than the history it replaces"
        );
    }

    let summarized_ids: Vec<String> = old.iter().map(|m| m.id.clone()).collect();
    let summary_message = Message::system(format!("{SUMMARY_HEADER}{summary}")).with_metadata(
        MessageMetadata {
            model: Some(target.model.key.to_string()),
            temperature: Some(0.0),
            tokens: Some(summary_tokens),
            kind: Some(MessageKind::AutoSummary),
            original_message_count: Some(old.len()),
            summarized_message_ids: Some(summarized_ids.clone()),
            created_at: Some(Utc::now()),
            summary_style: Some(style),
            ..Default::default()
        },
    );

    let mut new_messages = Vec::with_capacity(recent.len() + 1);
    new_messages.push(summary_message);
    new_messages.extend_from_slice(recent);
    let new_token_total = summary_tokens.saturating_add(estimate_for_messages(recent));

    info!(
        model = target.model.key,
        summarized = old.len(),
        kept = recent.len(),
        tokens_saved,
        %style,
        "history summarized"
    );

    Ok(SummaryOutcome {
        messages: new_messages,
        summary,
        summarized_count: old.len(),
        summarized_ids,
        tokens_saved,
        new_token_total,
    })
}

/// Drafts a summary of a whole conversation for the user to edit.
///
/// Sends the full history followed by a fixed "please summarize" user turn,
/// using the conversation's own generation parameters.
pub async fn draft_summary(
    transport: &dyn CompletionTransport,
    target: &SummaryTarget<'_>,
    history: &[Message],
    temperature: f64,
    max_tokens: u32,
) -> Result<String, KontextError> {
    if history.is_empty() {
        return Err(KontextError::InsufficientHistory {
            available: 0,
            keep_recent: 0,
        });
    }

    let mut messages = history.to_vec();
    messages.push(Message::user(MANUAL_SUMMARY_PROMPT));

    let response = transport
        .send_chat(target.request(messages, temperature, max_tokens))
        .await
        .map_err(summarization_failed)?;
    Ok(response.content)
}

fn summarization_failed(err: KontextError) -> KontextError {
    let message = match &err {
        KontextError::Transport { message, .. } => message.clone(),
        other => other.to_string(),
    };
    KontextError::SummarizationFailed {
        message,
        source: Some(Box::new(err)),
    }
}
