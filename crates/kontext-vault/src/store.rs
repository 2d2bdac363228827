// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider API keys kept in the vault, one entry per provider.

use async_trait::async_trait;
use kontext_core::{
    AdapterType, CredentialStore, Credentials, HealthStatus, KontextError, PluginAdapter, Provider,
};
use secrecy::ExposeSecret;
use tracing::debug;

use crate::vault::Vault;

fn entry_name(provider: Provider) -> String {
    format!("{provider}.api_key")
}

pub struct VaultCredentialStore {
    vault: Vault,
}

impl VaultCredentialStore {
    pub fn new(vault: Vault) -> Self {
        Self { vault }
    }

    pub fn vault(&self) -> &Vault {
        &self.vault
    }
}

#[async_trait]
impl PluginAdapter for VaultCredentialStore {
    fn name(&self) -> &str {
        "vault-credential-store"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::CredentialStore
    }

    async fn health_check(&self) -> Result<HealthStatus, KontextError> {
        self.vault.secret_names().await?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), KontextError> {
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for VaultCredentialStore {
    async fn load_credentials(&self) -> Result<Credentials, KontextError> {
        let mut credentials = Credentials::new();
        for provider in Provider::ALL {
            if let Some(key) = self.vault.retrieve_secret(&entry_name(provider)).await?
                && !key.expose_secret().is_empty()
            {
                credentials.insert(provider, key);
            }
        }
        debug!(count = credentials.len(), "credentials read from vault");
        Ok(credentials)
    }

    async fn save_credentials(&self, credentials: &Credentials) -> Result<(), KontextError> {
        for (provider, key) in credentials {
            let name = entry_name(*provider);
            if key.expose_secret().is_empty() {
                self.vault.delete_secret(&name).await?;
            } else {
                self.vault.store_secret(&name, key.expose_secret()).await?;
            }
        }
        Ok(())
    }
}
