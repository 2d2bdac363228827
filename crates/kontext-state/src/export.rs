// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON export of a single conversation.

use kontext_core::{Conversation, KontextError};

/// A serialized conversation ready to be written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationExport {
    /// `conversation-<id>.json`.
    pub file_name: String,
    /// Pretty-printed conversation JSON.
    pub json: String,
}

pub fn export_conversation(
    conversation: &Conversation,
) -> Result<ConversationExport, KontextError> {
    Ok(ConversationExport {
        file_name: format!("conversation-{}.json", conversation.id),
        json: serde_json::to_string_pretty(conversation)?,
    })
}
