// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Kontext.
//!
//! Provides the conversation data model, the error taxonomy, the static
//! model registry, and the traits for the collaborators the context-window
//! engine talks to: the completion transport, the credential store, and the
//! snapshot store.

pub mod error;
pub mod models;
pub mod traits;
pub mod types;

pub use error::{KontextError, StorageErrorKind};
pub use models::{DEFAULT_MODEL, ModelConfig};
pub use types::{
    AdapterType, ChatRequest, ChatResponse, Conversation, ConversationMetadata, HealthStatus,
    Message, MessageKind, MessageMetadata, Provider, Role, SummaryStyle,
};

pub use traits::{CompletionTransport, CredentialStore, Credentials, PluginAdapter, StateStore};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_type_round_trips() {
        use std::str::FromStr;

        for variant in [
            AdapterType::Transport,
            AdapterType::CredentialStore,
            AdapterType::StateStore,
        ] {
            let parsed = AdapterType::from_str(&variant.to_string()).expect("should parse back");
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn all_traits_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_transport<T: CompletionTransport>() {}
        fn _assert_credentials<T: CredentialStore>() {}
        fn _assert_state_store<T: StateStore>() {}
    }

    #[test]
    fn conversation_serializes_with_snapshot_keys() {
        let model = models::lookup(DEFAULT_MODEL).unwrap();
        let conv = Conversation::new(ConversationMetadata {
            model: model.key.to_string(),
            provider: model.provider,
            temperature: 0.7,
            max_tokens: 4096,
            context_window: model.context_window,
        });
        let value = serde_json::to_value(&conv).unwrap();
        assert_eq!(value["title"], "New Conversation");
        assert_eq!(value["total_tokens"], 0);
        assert!(value["summary"].is_null());
        assert_eq!(value["metadata"]["contextWindow"], 128_000);
        assert_eq!(value["metadata"]["maxTokens"], 4096);
    }
}
