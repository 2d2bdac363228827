// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Length-based token estimation.
//!
//! This is a heuristic, not a tokenizer: roughly four characters per token
//! plus a fixed per-message overhead for role and formatting tokens.

use kontext_core::Message;

pub const CHARS_PER_TOKEN: usize = 4;

/// Tokens charged per message for role and formatting.
pub const MESSAGE_OVERHEAD: u32 = 4;

/// Estimated token cost of `text`: `ceil(chars / 4) + 4`.
pub fn estimate(text: &str) -> u32 {
    let base = text.chars().count().div_ceil(CHARS_PER_TOKEN);
    u32::try_from(base)
        .unwrap_or(u32::MAX)
        .saturating_add(MESSAGE_OVERHEAD)
}

/// Token cost of one message: the recorded count when present, else the estimate.
pub fn message_cost(message: &Message) -> u32 {
    message
        .recorded_tokens()
        .unwrap_or_else(|| estimate(&message.content))
}

/// Sum of [`message_cost`] over `messages`.
pub fn estimate_for_messages(messages: &[Message]) -> u32 {
    messages
        .iter()
        .fold(0u32, |total, m| total.saturating_add(message_cost(m)))
}
