// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Opaque async store for provider API keys.

use std::collections::HashMap;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::KontextError;
use crate::traits::adapter::PluginAdapter;
use crate::types::Provider;

/// Provider API keys keyed by vendor.
pub type Credentials = HashMap<Provider, SecretString>;

/// Loads and saves provider credentials. Encryption is the implementor's concern.
#[async_trait]
pub trait CredentialStore: PluginAdapter {
    /// Returns every stored credential. Providers without a key are absent.
    async fn load_credentials(&self) -> Result<Credentials, KontextError>;

    /// Persists the given credentials. An empty secret removes that provider's key.
    async fn save_credentials(&self, credentials: &Credentials) -> Result<(), KontextError>;
}
