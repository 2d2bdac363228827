// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message fixtures.

use kontext_core::{Message, MessageMetadata, Role};

/// `count` alternating user/assistant messages, starting with the user.
pub fn alternating_messages(count: usize) -> Vec<Message> {
    (0..count)
        .map(|i| {
            if i % 2 == 0 {
                Message::user(format!("question {i}"))
            } else {
                Message::assistant(format!("answer {i}"))
            }
        })
        .collect()
}

/// A message whose recorded cost is exactly `tokens`.
pub fn message_with_tokens(role: Role, tokens: u32) -> Message {
    Message::new(role, format!("{role} message worth {tokens} tokens")).with_metadata(
        MessageMetadata {
            tokens: Some(tokens),
            ..Default::default()
        },
    )
}

/// `count` alternating messages each costing `tokens_each`.
pub fn heavy_messages(count: usize, tokens_each: u32) -> Vec<Message> {
    (0..count)
        .map(|i| {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            message_with_tokens(role, tokens_each)
        })
        .collect()
}
