// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat session orchestration.
//!
//! [`ChatSession`] is the layer between user input and the collaborators: it
//! sends messages through the completion transport, keeps the store
//! consistent when a request fails or is cancelled, and runs the
//! auto-summarization check after every reply.

use std::sync::Arc;

use dashmap::DashSet;
use kontext_context::{
    ContextUsage, SummaryTarget, auto_summarize, draft_summary, estimate, should_auto_summarize,
    split_history, usage,
};
use kontext_core::{
    ChatRequest, CompletionTransport, Conversation, CredentialStore, KontextError, Message,
    MessageMetadata, ModelConfig, models,
};
use secrecy::{ExposeSecret, SecretString};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::settings::SettingsPatch;
use crate::store::ConversationStore;

/// What a completed summarization did.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryReport {
    pub summarized_count: usize,
    /// Negative when the summary is longer than what it replaced.
    pub tokens_saved: i64,
    pub total_tokens: u32,
}

/// Result of the auto-summarization check that follows a reply.
#[derive(Debug)]
pub enum AutoSummary {
    NotTriggered,
    /// Another summarization of the same conversation is still running.
    AlreadyRunning,
    Applied(SummaryReport),
    /// The summarization failed; the conversation is unchanged.
    Failed(KontextError),
}

/// Result of a successful [`ChatSession::send_message`].
#[derive(Debug)]
pub struct SendOutcome {
    pub reply: Message,
    pub auto_summary: AutoSummary,
    pub usage: ContextUsage,
}

/// Marks a conversation as being summarized until dropped.
struct InFlight {
    set: Arc<DashSet<String>>,
    id: String,
}

impl InFlight {
    fn acquire(set: &Arc<DashSet<String>>, id: &str) -> Option<Self> {
        set.insert(id.to_string()).then(|| Self {
            set: Arc::clone(set),
            id: id.to_string(),
        })
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.set.remove(&self.id);
    }
}

#[derive(Clone)]
pub struct ChatSession {
    store: Arc<ConversationStore>,
    transport: Arc<dyn CompletionTransport>,
    credentials: Arc<dyn CredentialStore>,
    summarizing: Arc<DashSet<String>>,
}

impl ChatSession {
    pub fn new(
        store: Arc<ConversationStore>,
        transport: Arc<dyn CompletionTransport>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            store,
            transport,
            credentials,
            summarizing: Arc::new(DashSet::new()),
        }
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    /// Loads stored credentials into the state manager.
    pub async fn load_credentials(&self) -> Result<(), KontextError> {
        let credentials = self.credentials.load_credentials().await?;
        debug!(count = credentials.len(), "credentials loaded");
        self.store.set_credentials(credentials);
        Ok(())
    }

    fn conversation(&self, id: &str) -> Result<Conversation, KontextError> {
        self.store
            .conversation(id)
            .ok_or_else(|| KontextError::ConversationNotFound { id: id.to_string() })
    }

    fn resolve_model(conversation: &Conversation) -> Result<&'static ModelConfig, KontextError> {
        models::lookup(&conversation.metadata.model).ok_or_else(|| KontextError::UnknownModel {
            model_id: conversation.metadata.model.clone(),
        })
    }

    fn resolve_credential(&self, model: &ModelConfig) -> Result<SecretString, KontextError> {
        self.store
            .credential(model.provider)
            .filter(|key| !key.expose_secret().is_empty())
            .ok_or(KontextError::MissingCredential {
                provider: model.provider,
            })
    }

    /// Sends `content` as a user message and appends the model's reply.
    ///
    /// On transport failure or cancellation the user message is removed again,
    /// leaving the conversation as it was before the call.
    pub async fn send_message(
        &self,
        conversation_id: &str,
        content: &str,
        cancel: CancellationToken,
    ) -> Result<SendOutcome, KontextError> {
        if content.trim().is_empty() {
            return Err(KontextError::EmptyMessage);
        }
        let conversation = self.conversation(conversation_id)?;
        let model = Self::resolve_model(&conversation)?;
        let credential = self.resolve_credential(model)?;

        let user_message = Message::user(content);
        let user_message_id = user_message.id.clone();
        self.store.add_message(conversation_id, user_message);

        let history = self.conversation(conversation_id)?.messages;
        let request = ChatRequest {
            model,
            messages: history,
            credential,
            temperature: conversation.metadata.temperature,
            max_output_tokens: conversation.metadata.max_tokens,
        };

        let result = tokio::select! {
            () = cancel.cancelled() => Err(KontextError::Cancelled),
            response = self.transport.send_chat(request) => response,
        };
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                self.store.rollback_message(conversation_id, &user_message_id, &conversation);
                warn!(conversation_id, error = %e, "send failed, user message rolled back");
                return Err(e);
            }
        };

        let reply = Message::assistant(response.content.as_str()).with_metadata(MessageMetadata {
            model: Some(model.key.to_string()),
            provider: Some(model.provider),
            temperature: Some(conversation.metadata.temperature),
            tokens: Some(estimate(&response.content)),
            ..Default::default()
        });
        self.store.add_message(conversation_id, reply.clone());
        debug!(
            conversation_id,
            model = model.key,
            tokens_used = ?response.tokens_used,
            "reply received"
        );

        let auto_summary = self.check_auto_summary(conversation_id).await;
        let usage = self.usage(conversation_id)?;
        Ok(SendOutcome {
            reply,
            auto_summary,
            usage,
        })
    }

    /// Runs auto-summarization when the settings and the usage call for it.
    pub async fn check_auto_summary(&self, conversation_id: &str) -> AutoSummary {
        let settings = self.store.settings().auto_summarization;
        if !settings.enabled {
            return AutoSummary::NotTriggered;
        }
        let Some(conversation) = self.store.conversation(conversation_id) else {
            return AutoSummary::NotTriggered;
        };
        let model = models::lookup(&conversation.metadata.model);
        if model.is_none()
            || conversation.messages.len() <= settings.keep_recent_count
            || !should_auto_summarize(&conversation.messages, model, settings.threshold)
        {
            return AutoSummary::NotTriggered;
        }

        match self.summarize(conversation_id).await {
            Ok(report) => AutoSummary::Applied(report),
            Err(KontextError::SummarizationInProgress { .. }) => {
                debug!(conversation_id, "auto-summarization already running");
                AutoSummary::AlreadyRunning
            }
            Err(e) => {
                warn!(conversation_id, error = %e, "auto-summarization failed");
                AutoSummary::Failed(e)
            }
        }
    }

    /// Summarizes now, regardless of usage.
    pub async fn compress_now(&self, conversation_id: &str) -> Result<SummaryReport, KontextError> {
        self.summarize(conversation_id).await
    }

    async fn summarize(&self, conversation_id: &str) -> Result<SummaryReport, KontextError> {
        let _guard = InFlight::acquire(&self.summarizing, conversation_id).ok_or_else(|| {
            KontextError::SummarizationInProgress {
                id: conversation_id.to_string(),
            }
        })?;

        let conversation = self.conversation(conversation_id)?;
        let settings = self.store.settings().auto_summarization;
        split_history(&conversation.messages, settings.keep_recent_count)?;
        let model = Self::resolve_model(&conversation)?;
        let credential = self.resolve_credential(model)?;
        let target = SummaryTarget {
            model,
            credential: &credential,
        };

        let outcome = auto_summarize(
            self.transport.as_ref(),
            &target,
            &conversation.messages,
            settings.keep_recent_count,
            settings.style,
        )
        .await?;

        let total_tokens = self
            .store
            .apply_summary(conversation_id, &outcome)
            .ok_or_else(|| KontextError::ConversationNotFound {
                id: conversation_id.to_string(),
            })?;

        Ok(SummaryReport {
            summarized_count: outcome.summarized_count,
            tokens_saved: outcome.tokens_saved,
            total_tokens,
        })
    }

    /// Asks the model for an editable summary of the whole conversation.
    pub async fn draft_summary(&self, conversation_id: &str) -> Result<String, KontextError> {
        let conversation = self.conversation(conversation_id)?;
        let model = Self::resolve_model(&conversation)?;
        let credential = self.resolve_credential(model)?;
        let target = SummaryTarget {
            model,
            credential: &credential,
        };
        draft_summary(
            self.transport.as_ref(),
            &target,
            &conversation.messages,
            conversation.metadata.temperature,
            conversation.metadata.max_tokens,
        )
        .await
    }

    pub fn save_summary(&self, conversation_id: &str, summary: &str) -> Result<(), KontextError> {
        if self.store.summarize_conversation(conversation_id, summary) {
            Ok(())
        } else {
            Err(KontextError::ConversationNotFound {
                id: conversation_id.to_string(),
            })
        }
    }

    /// Saves the edited summary and branches a new conversation from it.
    pub fn start_fresh(
        &self,
        conversation_id: &str,
        summary: &str,
    ) -> Result<String, KontextError> {
        self.save_summary(conversation_id, summary)?;
        self.store
            .start_fresh_with_summary(conversation_id)
            .ok_or_else(|| KontextError::ConversationNotFound {
                id: conversation_id.to_string(),
            })
    }

    /// Persists new credentials first, then applies the merged settings.
    pub async fn update_settings(&self, patch: SettingsPatch) -> Result<(), KontextError> {
        self.store.settings().merge(&patch)?;
        if let Some(keys) = &patch.api_keys {
            self.credentials.save_credentials(keys).await?;
            info!(providers = keys.len(), "credentials saved");
        }
        self.store.update_settings(&patch)
    }

    /// Context usage of the conversation's current history and model.
    pub fn usage(&self, conversation_id: &str) -> Result<ContextUsage, KontextError> {
        let conversation = self.conversation(conversation_id)?;
        Ok(usage(
            &conversation.messages,
            models::lookup(&conversation.metadata.model),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_flight_guard_releases_on_drop() {
        let set = Arc::new(DashSet::new());
        let guard = InFlight::acquire(&set, "a").unwrap();
        assert!(InFlight::acquire(&set, "a").is_none());
        assert!(InFlight::acquire(&set, "b").is_some());
        drop(guard);
        assert!(InFlight::acquire(&set, "a").is_some());
    }
}
