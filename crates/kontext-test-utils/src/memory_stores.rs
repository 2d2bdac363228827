// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory snapshot and credential stores with injectable failures.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;

use kontext_core::{
    AdapterType, CredentialStore, Credentials, HealthStatus, KontextError, PluginAdapter,
    Provider, StateStore,
};

#[derive(Default)]
struct SnapshotInner {
    snapshot: Option<String>,
    saves: usize,
    fail_with: Option<String>,
}

/// Snapshot store backed by a string in memory.
#[derive(Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<Mutex<SnapshotInner>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with an existing snapshot.
    pub fn with_snapshot(snapshot: impl Into<String>) -> Self {
        let store = Self::new();
        if let Ok(mut inner) = store.inner.try_lock() {
            inner.snapshot = Some(snapshot.into());
        }
        store
    }

    /// Makes every following save fail with `message` until cleared.
    pub async fn fail_saves_with(&self, message: Option<&str>) {
        self.inner.lock().await.fail_with = message.map(str::to_string);
    }

    pub async fn snapshot(&self) -> Option<String> {
        self.inner.lock().await.snapshot.clone()
    }

    /// Number of successful saves.
    pub async fn save_count(&self) -> usize {
        self.inner.lock().await.saves
    }
}

#[async_trait]
impl PluginAdapter for MemoryStateStore {
    fn name(&self) -> &str {
        "memory-state-store"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::StateStore
    }

    async fn health_check(&self) -> Result<HealthStatus, KontextError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), KontextError> {
        Ok(())
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load_snapshot(&self) -> Result<Option<String>, KontextError> {
        Ok(self.inner.lock().await.snapshot.clone())
    }

    async fn save_snapshot(&self, snapshot: &str) -> Result<(), KontextError> {
        let mut inner = self.inner.lock().await;
        if let Some(message) = &inner.fail_with {
            return Err(KontextError::storage(message.clone(), None));
        }
        inner.snapshot = Some(snapshot.to_string());
        inner.saves += 1;
        Ok(())
    }
}

/// Credential store holding plain strings in memory.
#[derive(Clone, Default)]
pub struct MemoryCredentialStore {
    keys: Arc<Mutex<HashMap<Provider, String>>>,
    fail_saves: Arc<Mutex<bool>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(provider: Provider, key: &str) -> Self {
        let store = Self::new();
        if let Ok(mut keys) = store.keys.try_lock() {
            keys.insert(provider, key.to_string());
        }
        store
    }

    pub async fn set_fail_saves(&self, fail: bool) {
        *self.fail_saves.lock().await = fail;
    }

    pub async fn key(&self, provider: Provider) -> Option<String> {
        self.keys.lock().await.get(&provider).cloned()
    }
}

#[async_trait]
impl PluginAdapter for MemoryCredentialStore {
    fn name(&self) -> &str {
        "memory-credential-store"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::CredentialStore
    }

    async fn health_check(&self) -> Result<HealthStatus, KontextError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), KontextError> {
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load_credentials(&self) -> Result<Credentials, KontextError> {
        Ok(self
            .keys
            .lock()
            .await
            .iter()
            .map(|(provider, key)| (*provider, SecretString::from(key.clone())))
            .collect())
    }

    async fn save_credentials(&self, credentials: &Credentials) -> Result<(), KontextError> {
        if *self.fail_saves.lock().await {
            return Err(KontextError::Vault("credential store unavailable".into()));
        }
        let mut keys = self.keys.lock().await;
        for (provider, secret) in credentials {
            let secret = secret.expose_secret();
            if secret.is_empty() {
                keys.remove(provider);
            } else {
                keys.insert(*provider, secret.to_string());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn injected_failures_are_classified() {
        let store = MemoryStateStore::new();
        store.save_snapshot("{}").await.unwrap();
        store.fail_saves_with(Some("quota exceeded")).await;

        let err = store.save_snapshot("{\"a\":1}").await.unwrap_err();
        assert!(err.is_user_visible());
        assert_eq!(store.snapshot().await.as_deref(), Some("{}"));
        assert_eq!(store.save_count().await, 1);
    }

    #[tokio::test]
    async fn empty_secret_removes_key() {
        let store = MemoryCredentialStore::with_key(Provider::OpenAi, "sk-1");
        let mut update = Credentials::new();
        update.insert(Provider::OpenAi, SecretString::from(String::new()));
        update.insert(Provider::Google, SecretString::from("AIza-x".to_string()));
        store.save_credentials(&update).await.unwrap();

        assert_eq!(store.key(Provider::OpenAi).await, None);
        assert_eq!(store.key(Provider::Google).await.as_deref(), Some("AIza-x"));
    }
}
