// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The conversation state manager.
//!
//! [`ConversationStore`] owns every conversation, the active-conversation
//! pointer, settings and UI preferences. The whole [`AppState`] sits inside a
//! `tokio::sync::watch` channel: each operation mutates it under one write
//! lock, so readers only ever see states from before or after an operation,
//! and subscribers (the persistence writer) are woken once per change.

use std::collections::{BTreeMap, HashSet};

use kontext_context::{SummaryOutcome, estimate_for_messages, message_cost};
use kontext_core::{
    Conversation, ConversationMetadata, Credentials, KontextError, Message, ModelConfig, Provider,
    Role, models,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::export::{ConversationExport, export_conversation};
use crate::settings::{ApiKeys, Settings, SettingsPatch};
use crate::ui::{UiPreferences, UiPreferencesPatch};

/// Number of characters of the first user message used as the title.
pub const TITLE_MAX_CHARS: usize = 50;

/// Everything that is persisted between runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppState {
    pub conversations: BTreeMap<String, Conversation>,
    /// Credentials inside are skipped by serde.
    pub settings: Settings,
    pub active_conversation_id: Option<String>,
    #[serde(rename = "uiPreferences")]
    pub ui_preferences: UiPreferences,
}

/// Title for a conversation whose first user message is `content`.
pub fn derive_title(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

fn seed_metadata(settings: &Settings) -> ConversationMetadata {
    let model = models::lookup(&settings.default_model).unwrap_or_else(models::default_model);
    metadata_for(model, settings.default_temperature, settings.default_max_tokens)
}

fn metadata_for(model: &ModelConfig, temperature: f64, max_tokens: u32) -> ConversationMetadata {
    ConversationMetadata {
        model: model.key.to_string(),
        provider: model.provider,
        temperature,
        max_tokens,
        context_window: model.context_window,
    }
}

pub struct ConversationStore {
    state: watch::Sender<AppState>,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(AppState::default())
    }
}

impl ConversationStore {
    pub fn new(state: AppState) -> Self {
        Self {
            state: watch::Sender::new(state),
        }
    }

    /// Receiver that is notified after every state change.
    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.state.subscribe()
    }

    /// Applies `f` atomically. Subscribers are notified only when `f` returns `Some`.
    fn mutate<R>(&self, f: impl FnOnce(&mut AppState) -> Option<R>) -> Option<R> {
        let mut result = None;
        self.state.send_if_modified(|state| {
            result = f(state);
            result.is_some()
        });
        result
    }

    fn mutate_conversation<R>(
        &self,
        id: &str,
        f: impl FnOnce(&mut Conversation) -> Option<R>,
    ) -> Option<R> {
        self.mutate(|state| state.conversations.get_mut(id).and_then(f))
    }

    // --- Queries ---

    pub fn snapshot(&self) -> AppState {
        self.state.borrow().clone()
    }

    pub fn conversation(&self, id: &str) -> Option<Conversation> {
        self.state.borrow().conversations.get(id).cloned()
    }

    /// All conversations, newest first.
    pub fn conversations(&self) -> Vec<Conversation> {
        let mut list: Vec<Conversation> =
            self.state.borrow().conversations.values().cloned().collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        list
    }

    pub fn active_conversation_id(&self) -> Option<String> {
        self.state.borrow().active_conversation_id.clone()
    }

    pub fn active_conversation(&self) -> Option<Conversation> {
        let state = self.state.borrow();
        state
            .active_conversation_id
            .as_ref()
            .and_then(|id| state.conversations.get(id))
            .cloned()
    }

    pub fn settings(&self) -> Settings {
        self.state.borrow().settings.clone()
    }

    /// The API key for `provider`, if one is configured.
    pub fn credential(&self, provider: Provider) -> Option<SecretString> {
        self.state
            .borrow()
            .settings
            .api_keys
            .get(provider)
            .map(|key| SecretString::from(key.expose_secret().to_owned()))
    }

    pub fn ui_preferences(&self) -> UiPreferences {
        self.state.borrow().ui_preferences.clone()
    }

    // --- Conversation lifecycle ---

    /// Creates an empty conversation from the default settings and makes it active.
    pub fn create_conversation(&self) -> String {
        self.mutate(|state| {
            let conversation = Conversation::new(seed_metadata(&state.settings));
            let id = conversation.id.clone();
            state.conversations.insert(id.clone(), conversation);
            state.active_conversation_id = Some(id.clone());
            Some(id)
        })
        .unwrap_or_default()
    }

    /// Makes `id` the active conversation. Unknown ids are ignored.
    pub fn load_conversation(&self, id: &str) -> bool {
        self.mutate(|state| {
            if !state.conversations.contains_key(id) {
                return None;
            }
            state.active_conversation_id = Some(id.to_string());
            Some(())
        })
        .is_some()
    }

    /// Removes a conversation, clearing the active pointer if it pointed there.
    pub fn delete_conversation(&self, id: &str) -> bool {
        let deleted = self
            .mutate(|state| {
                state.conversations.remove(id)?;
                if state.active_conversation_id.as_deref() == Some(id) {
                    state.active_conversation_id = None;
                }
                Some(())
            })
            .is_some();
        if deleted {
            info!(conversation_id = id, "conversation deleted");
        }
        deleted
    }

    pub fn rename_conversation(&self, id: &str, title: &str) -> bool {
        self.mutate_conversation(id, |conv| {
            conv.title = title.to_string();
            Some(())
        })
        .is_some()
    }

    /// Switches the model, re-seeding provider and context window.
    pub fn set_conversation_model(&self, id: &str, model_key: &str) -> Result<(), KontextError> {
        let model = models::lookup(model_key).ok_or_else(|| KontextError::UnknownModel {
            model_id: model_key.to_string(),
        })?;
        self.mutate_conversation(id, |conv| {
            conv.metadata =
                metadata_for(model, conv.metadata.temperature, conv.metadata.max_tokens);
            Some(())
        })
        .ok_or_else(|| KontextError::ConversationNotFound { id: id.to_string() })
    }

    // --- Messages ---

    /// Appends a message. Unknown conversation ids are silently ignored.
    ///
    /// The first user message of an untitled conversation becomes its title.
    pub fn add_message(&self, conversation_id: &str, message: Message) {
        let applied = self.mutate_conversation(conversation_id, |conv| {
            conv.total_tokens = conv.total_tokens.saturating_add(message_cost(&message));
            let derive = conv.messages.is_empty()
                && message.role == Role::User
                && conv.has_default_title();
            if derive {
                conv.title = derive_title(&message.content);
            }
            conv.messages.push(message);
            Some(())
        });
        if applied.is_none() {
            debug!(conversation_id, "add_message ignored for unknown conversation");
        }
    }

    /// Replaces the content of one message in place and re-estimates its cost.
    pub fn edit_message(&self, conversation_id: &str, message_id: &str, content: &str) -> bool {
        self.mutate_conversation(conversation_id, |conv| {
            let message = conv.messages.iter_mut().find(|m| m.id == message_id)?;
            message.content = content.to_string();
            if let Some(meta) = message.metadata.as_mut() {
                meta.tokens = None;
            }
            conv.total_tokens = estimate_for_messages(&conv.messages);
            Some(())
        })
        .is_some()
    }

    /// Undoes an [`add_message`](Self::add_message) of `message_id`, given the
    /// conversation as it was before the add.
    ///
    /// Restores the derived title and the token total. Messages added in the
    /// meantime stay, and their costs stay counted.
    pub fn rollback_message(
        &self,
        conversation_id: &str,
        message_id: &str,
        before: &Conversation,
    ) -> bool {
        self.mutate_conversation(conversation_id, |conv| {
            let index = conv.messages.iter().position(|m| m.id == message_id)?;
            let removed = conv.messages.remove(index);

            let known: HashSet<&str> = before.messages.iter().map(|m| m.id.as_str()).collect();
            let arrived = conv
                .messages
                .iter()
                .filter(|m| !known.contains(m.id.as_str()))
                .fold(0u32, |acc, m| acc.saturating_add(message_cost(m)));
            conv.total_tokens = before.total_tokens.saturating_add(arrived);

            let title_was_derived = before.messages.is_empty()
                && before.has_default_title()
                && conv.title == derive_title(&removed.content);
            if title_was_derived {
                conv.title = before.title.clone();
            }
            Some(())
        })
        .is_some()
    }

    /// Removes one message and re-estimates the total.
    pub fn remove_message(&self, conversation_id: &str, message_id: &str) -> bool {
        self.mutate_conversation(conversation_id, |conv| {
            let index = conv.messages.iter().position(|m| m.id == message_id)?;
            conv.messages.remove(index);
            conv.total_tokens = estimate_for_messages(&conv.messages);
            Some(())
        })
        .is_some()
    }

    /// Wholesale replace with a caller-supplied token total.
    pub fn replace_messages(
        &self,
        conversation_id: &str,
        messages: Vec<Message>,
        total_tokens: u32,
    ) -> bool {
        self.mutate_conversation(conversation_id, |conv| {
            conv.messages = messages;
            conv.total_tokens = total_tokens;
            Some(())
        })
        .is_some()
    }

    /// Applies a summarization result computed from an earlier read of the history.
    ///
    /// The folded messages are identified by id, not position: they are
    /// removed from the current list, and the summary is placed first. Any
    /// message that arrived while the summary was generated is kept. When the
    /// history did not change in between, the result equals
    /// `outcome.messages` and `outcome.new_token_total` is used as-is.
    ///
    /// Returns the new token total, or `None` when the conversation is gone or
    /// none of the folded messages are present any more.
    pub fn apply_summary(&self, conversation_id: &str, outcome: &SummaryOutcome) -> Option<u32> {
        let folded: HashSet<&str> = outcome.summarized_ids.iter().map(String::as_str).collect();
        let summary_message = outcome.messages.first()?;

        let result = self.mutate_conversation(conversation_id, |conv| {
            if !conv.messages.iter().any(|m| folded.contains(m.id.as_str())) {
                return None;
            }

            let mut messages = vec![summary_message.clone()];
            messages.extend(
                conv.messages
                    .iter()
                    .filter(|m| !folded.contains(m.id.as_str()))
                    .cloned(),
            );

            let unchanged = messages.len() == outcome.messages.len()
                && messages
                    .iter()
                    .zip(&outcome.messages)
                    .all(|(a, b)| a.id == b.id);
            let total = if unchanged {
                outcome.new_token_total
            } else {
                estimate_for_messages(&messages)
            };

            conv.messages = messages;
            conv.total_tokens = total;
            Some(total)
        });

        match result {
            Some(total) => info!(
                conversation_id,
                summarized = outcome.summarized_count,
                total_tokens = total,
                "summary applied"
            ),
            None => warn!(conversation_id, "summary discarded; history no longer matches"),
        }
        result
    }

    // --- Summaries ---

    /// Stores a user-approved summary. The message list is not touched.
    pub fn summarize_conversation(&self, conversation_id: &str, summary: &str) -> bool {
        self.mutate_conversation(conversation_id, |conv| {
            conv.summary = Some(summary.to_string());
            Some(())
        })
        .is_some()
    }

    /// Branches a new conversation seeded with the stored summary of `conversation_id`.
    ///
    /// The new conversation copies the source's model settings, holds a single
    /// system message, has a zero token count and no summary, and becomes
    /// active. The source is left unchanged. Returns `None` when the source is
    /// unknown or has no summary.
    pub fn start_fresh_with_summary(&self, conversation_id: &str) -> Option<String> {
        let new_id = self.mutate(|state| {
            let source = state.conversations.get(conversation_id)?;
            let summary = source.summary.as_deref()?;

            let mut fresh = Conversation::new(source.metadata.clone());
            fresh.title = format!("{} (continued)", source.title);
            fresh
                .messages
                .push(Message::system(format!("Previous conversation summary: {summary}")));

            let id = fresh.id.clone();
            state.conversations.insert(id.clone(), fresh);
            state.active_conversation_id = Some(id.clone());
            Some(id)
        });
        if let Some(id) = &new_id {
            info!(source = conversation_id, conversation_id = %id, "started fresh conversation");
        }
        new_id
    }

    // --- Settings ---

    /// Merges `patch` into the settings. Nothing changes if the result is invalid.
    pub fn update_settings(&self, patch: &SettingsPatch) -> Result<(), KontextError> {
        let mut outcome = Ok(());
        self.state.send_if_modified(|state| match state.settings.merge(patch) {
            Ok(merged) => {
                state.settings = merged;
                true
            }
            Err(err) => {
                outcome = Err(err);
                false
            }
        });
        outcome
    }

    /// Installs credentials loaded from the credential store.
    ///
    /// Keys are not part of the snapshot, so subscribers are not woken.
    pub fn set_credentials(&self, credentials: Credentials) {
        self.state.send_if_modified(|state| {
            state.settings.api_keys = ApiKeys::from_credentials(credentials);
            false
        });
    }

    // --- UI preferences ---

    pub fn update_ui_preferences(&self, patch: &UiPreferencesPatch) {
        self.state.send_modify(|state| state.ui_preferences.apply(patch));
    }

    pub fn toggle_sidebar(&self) {
        self.state.send_modify(|state| state.ui_preferences.toggle_sidebar());
    }

    pub fn set_sidebar_width(&self, width: u32) {
        self.state
            .send_modify(|state| state.ui_preferences.set_sidebar_width(width));
    }

    pub fn toggle_focus_mode(&self) {
        self.state
            .send_modify(|state| state.ui_preferences.toggle_focus_mode());
    }

    // --- Export ---

    pub fn export_conversation(&self, id: &str) -> Result<ConversationExport, KontextError> {
        let state = self.state.borrow();
        let conversation = state
            .conversations
            .get(id)
            .ok_or_else(|| KontextError::ConversationNotFound { id: id.to_string() })?;
        export_conversation(conversation)
    }
}
