// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for Kontext.

use thiserror::Error;

use crate::types::Provider;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Classification of a persistence failure.
///
/// Only quota and permission problems are something the user can act on;
/// everything else is logged and retried on the next save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum StorageErrorKind {
    QuotaExceeded,
    PermissionDenied,
    Transient,
}

impl StorageErrorKind {
    /// Classifies a backend error message.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if lower.contains("quota") || lower.contains("full") {
            Self::QuotaExceeded
        } else if lower.contains("permission")
            || lower.contains("denied")
            || lower.contains("readonly")
            || lower.contains("read-only")
        {
            Self::PermissionDenied
        } else {
            Self::Transient
        }
    }

    pub fn is_user_actionable(self) -> bool {
        !matches!(self, Self::Transient)
    }
}

/// The primary error type used across all Kontext crates.
#[derive(Debug, Error)]
pub enum KontextError {
    /// The provider required by the selected model has no API key configured.
    #[error("missing API key for provider {provider}")]
    MissingCredential { provider: Provider },

    /// Network or HTTP failure from the completion transport.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        status: Option<u16>,
        source: Option<BoxError>,
    },

    /// Summarization was requested with too few messages.
    #[error("not enough messages to summarize: have {available}, keeping {keep_recent}")]
    InsufficientHistory { available: usize, keep_recent: usize },

    /// The summarization request failed; the conversation was left unchanged.
    #[error("failed to generate summary: {message}")]
    SummarizationFailed {
        message: String,
        source: Option<BoxError>,
    },

    /// Persistence failure.
    #[error("storage error ({kind}): {message}")]
    Storage {
        kind: StorageErrorKind,
        message: String,
        source: Option<BoxError>,
    },

    /// An operation needed a model that is not in the registry.
    #[error("unknown model: {model_id}")]
    UnknownModel { model_id: String },

    #[error("conversation not found: {id}")]
    ConversationNotFound { id: String },

    #[error("message is empty")]
    EmptyMessage,

    /// A summarization for this conversation is already running.
    #[error("summarization already in progress for conversation {id}")]
    SummarizationInProgress { id: String },

    /// The operation was cancelled by the user.
    #[error("operation cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("vault error: {0}")]
    Vault(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl KontextError {
    /// Builds a storage error, classifying it from its message.
    pub fn storage(message: impl Into<String>, source: Option<BoxError>) -> Self {
        let message = message.into();
        Self::Storage {
            kind: StorageErrorKind::classify(&message),
            message,
            source,
        }
    }

    /// Builds a transport error without an underlying source.
    pub fn transport(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Transport {
            message: message.into(),
            status,
            source: None,
        }
    }

    /// Whether this error should be shown to the user rather than only logged.
    pub fn is_user_visible(&self) -> bool {
        match self {
            Self::Storage { kind, .. } => kind.is_user_actionable(),
            Self::InsufficientHistory { .. } => false,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_storage_messages() {
        assert_eq!(
            StorageErrorKind::classify("database or disk is full"),
            StorageErrorKind::QuotaExceeded
        );
        assert_eq!(
            StorageErrorKind::classify("QuotaExceededError: storage quota"),
            StorageErrorKind::QuotaExceeded
        );
        assert_eq!(
            StorageErrorKind::classify("attempt to write a readonly database"),
            StorageErrorKind::PermissionDenied
        );
        assert_eq!(
            StorageErrorKind::classify("Permission denied (os error 13)"),
            StorageErrorKind::PermissionDenied
        );
        assert_eq!(
            StorageErrorKind::classify("database is locked"),
            StorageErrorKind::Transient
        );
    }

    #[test]
    fn only_actionable_storage_errors_are_user_visible() {
        assert!(KontextError::storage("disk full", None).is_user_visible());
        assert!(!KontextError::storage("database is locked", None).is_user_visible());
        assert!(
            !KontextError::InsufficientHistory {
                available: 3,
                keep_recent: 10
            }
            .is_user_visible()
        );
        assert!(KontextError::transport("boom", Some(500)).is_user_visible());
    }

    #[test]
    fn error_messages_are_readable() {
        let err = KontextError::MissingCredential {
            provider: Provider::Anthropic,
        };
        assert_eq!(err.to_string(), "missing API key for provider anthropic");

        let err = KontextError::SummarizationFailed {
            message: "rate limited".into(),
            source: None,
        };
        assert_eq!(err.to_string(), "failed to generate summary: rate limited");
    }
}
