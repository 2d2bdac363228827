// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential store behavior over a real SQLite vault.

use kontext_config::VaultConfig;
use kontext_core::{CredentialStore, Credentials, Provider};
use kontext_storage::Database;
use kontext_vault::{KdfParams, VAULT_KEY_ENV_VAR, Vault, VaultCredentialStore, open_vault};
use secrecy::{ExposeSecret, SecretString};
use serial_test::serial;
use tempfile::tempdir;

const CHEAP: KdfParams = KdfParams {
    memory_cost: 8192,
    iterations: 1,
    parallelism: 1,
};

fn secret(s: &str) -> SecretString {
    SecretString::from(s.to_string())
}

#[tokio::test]
async fn keys_round_trip_and_empty_deletes() {
    let dir = tempdir().unwrap();
    let db = Database::open(dir.path().join("k.db")).await.unwrap();
    let vault = Vault::create(db.connection().clone(), &secret("pw"), CHEAP)
        .await
        .unwrap();
    let store = VaultCredentialStore::new(vault);

    assert!(store.load_credentials().await.unwrap().is_empty());

    let mut update = Credentials::new();
    update.insert(Provider::OpenAi, secret("sk-openai-1"));
    update.insert(Provider::Google, secret("AIza-2"));
    store.save_credentials(&update).await.unwrap();

    let loaded = store.load_credentials().await.unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[&Provider::OpenAi].expose_secret(), "sk-openai-1");

    let mut clear = Credentials::new();
    clear.insert(Provider::OpenAi, secret(""));
    store.save_credentials(&clear).await.unwrap();

    let loaded = store.load_credentials().await.unwrap();
    assert!(!loaded.contains_key(&Provider::OpenAi));
    assert_eq!(loaded[&Provider::Google].expose_secret(), "AIza-2");
}

#[tokio::test]
async fn ciphertext_does_not_contain_the_key() {
    let dir = tempdir().unwrap();
    let db = Database::open(dir.path().join("k.db")).await.unwrap();
    let vault = Vault::create(db.connection().clone(), &secret("pw"), CHEAP)
        .await
        .unwrap();
    let store = VaultCredentialStore::new(vault);
    let mut update = Credentials::new();
    update.insert(Provider::Anthropic, secret("sk-ant-plaintext-marker"));
    store.save_credentials(&update).await.unwrap();

    let blobs: Vec<Vec<u8>> = db
        .connection()
        .call(|conn| -> Result<Vec<Vec<u8>>, rusqlite::Error> {
            let mut stmt = conn.prepare("SELECT ciphertext FROM vault_entries")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect()
        })
        .await
        .unwrap();
    assert_eq!(blobs.len(), 1);
    let marker = b"plaintext-marker";
    assert!(!blobs[0].windows(marker.len()).any(|w| w == marker));
}

#[tokio::test]
#[serial]
async fn open_vault_creates_then_unlocks_with_env_passphrase() {
    let dir = tempdir().unwrap();
    let db = Database::open(dir.path().join("k.db")).await.unwrap();
    let config = VaultConfig {
        kdf_memory_cost: 8192,
        kdf_iterations: 1,
        kdf_parallelism: 1,
    };

    // SAFETY: serialized test, no concurrent environment access.
    unsafe { std::env::set_var(VAULT_KEY_ENV_VAR, "env-pass") };
    let first = open_vault(&db, &config).await;
    let created = first.is_ok();
    if let Ok(vault) = first {
        vault.store_secret("openai.api_key", "sk-env-123").await.unwrap();
    }
    let second = open_vault(&db, &config).await;
    unsafe { std::env::remove_var(VAULT_KEY_ENV_VAR) };

    assert!(created);
    let vault = second.unwrap();
    assert_eq!(
        vault
            .retrieve_secret("openai.api_key")
            .await
            .unwrap()
            .unwrap()
            .expose_secret(),
        "sk-env-123"
    );
}
