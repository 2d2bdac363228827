// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Encrypted credential store for Kontext.
//!
//! Provider API keys are sealed with AES-256-GCM under a random master key,
//! which is itself wrapped by an Argon2id key derived from the vault
//! passphrase. The tables live in the shared Kontext database.

pub mod crypto;
pub mod kdf;
pub mod prompt;
pub mod store;
pub mod vault;

use kontext_config::VaultConfig;
use kontext_core::KontextError;
use kontext_storage::Database;
use tracing::info;

pub use kdf::KdfParams;
pub use prompt::{VAULT_KEY_ENV_VAR, get_new_vault_passphrase, get_vault_passphrase};
pub use store::VaultCredentialStore;
pub use vault::{Vault, mask_secret};

/// Unlocks the vault in `db`, creating it on first use.
pub async fn open_vault(db: &Database, config: &VaultConfig) -> Result<Vault, KontextError> {
    let conn = db.connection().clone();
    if Vault::exists(&conn).await? {
        let passphrase = get_vault_passphrase()?;
        let vault = Vault::unlock(conn, &passphrase).await?;
        info!("vault unlocked");
        Ok(vault)
    } else {
        let passphrase = get_new_vault_passphrase()?;
        Vault::create(conn, &passphrase, KdfParams::from(config)).await
    }
}
