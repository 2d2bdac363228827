// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat-completion transport used by the session and the summarizer.

use async_trait::async_trait;

use crate::error::KontextError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChatRequest, ChatResponse};

/// Sends a message list to a model and returns the generated reply.
///
/// Implementations surface HTTP failures as [`KontextError::Transport`] with a
/// human-readable message and never retry internally.
#[async_trait]
pub trait CompletionTransport: PluginAdapter {
    async fn send_chat(&self, request: ChatRequest) -> Result<ChatResponse, KontextError>;
}
