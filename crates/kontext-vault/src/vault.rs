// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vault lifecycle: create, unlock, and named secret storage.
//!
//! A random master key seals every entry in `vault_entries`. The master key
//! itself is sealed under an Argon2id key derived from the passphrase and
//! stored in `vault_meta`. Changing the passphrase re-wraps only the master
//! key.

use std::fmt;

use kontext_core::KontextError;
use kontext_storage::map_tr_err;
use rusqlite::{OptionalExtension, params};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::crypto::{self, KEY_LEN, Sealed};
use crate::kdf::{self, KdfParams, SALT_LEN};

const META_WRAPPED_KEY: &str = "wrapped_master_key";
const META_NONCE: &str = "master_key_nonce";
const META_SALT: &str = "kdf_salt";
const META_PARAMS: &str = "kdf_params";

/// An unlocked vault. The master key only ever lives in memory.
pub struct Vault {
    master_key: Zeroizing<[u8; KEY_LEN]>,
    conn: tokio_rusqlite::Connection,
}

impl fmt::Debug for Vault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vault")
            .field("master_key", &"[REDACTED]")
            .finish()
    }
}

fn corrupt(what: &str) -> KontextError {
    KontextError::Vault(format!("corrupted vault: {what}"))
}

/// Everything needed to unwrap the master key.
struct WrappedKey {
    sealed: Sealed,
    salt: [u8; SALT_LEN],
    params: KdfParams,
}

impl WrappedKey {
    fn new(passphrase: &SecretString, master_key: &[u8; KEY_LEN], params: KdfParams) -> Result<Self, KontextError> {
        let salt = kdf::generate_salt()?;
        let wrapping_key = kdf::derive_key(passphrase.expose_secret().as_bytes(), &salt, params)?;
        Ok(Self {
            sealed: crypto::seal(&wrapping_key, master_key)?,
            salt,
            params,
        })
    }

    async fn write(self, conn: &tokio_rusqlite::Connection) -> Result<(), KontextError> {
        let params = serde_json::to_vec(&self.params)?;
        let rows: [(&'static str, Vec<u8>); 4] = [
            (META_WRAPPED_KEY, self.sealed.ciphertext),
            (META_NONCE, self.sealed.nonce.to_vec()),
            (META_SALT, self.salt.to_vec()),
            (META_PARAMS, params),
        ];
        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            for (key, value) in rows {
                tx.execute(
                    "INSERT OR REPLACE INTO vault_meta (key, value) VALUES (?1, ?2)",
                    params![key, value],
                )?;
            }
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
    }

    async fn read(conn: &tokio_rusqlite::Connection) -> Result<Self, KontextError> {
        let rows = conn
            .call(|conn| -> Result<Vec<(String, Vec<u8>)>, rusqlite::Error> {
                let mut stmt = conn.prepare("SELECT key, value FROM vault_meta")?;
                let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
                rows.collect()
            })
            .await
            .map_err(map_tr_err)?;

        let field = |name: &str| {
            rows.iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone())
                .ok_or_else(|| corrupt(&format!("missing {name}")))
        };

        let nonce = field(META_NONCE)?
            .try_into()
            .map_err(|_| corrupt("nonce has the wrong length"))?;
        let salt = field(META_SALT)?
            .try_into()
            .map_err(|_| corrupt("salt has the wrong length"))?;
        let params: KdfParams = serde_json::from_slice(&field(META_PARAMS)?)
            .map_err(|e| corrupt(&format!("unreadable KDF parameters: {e}")))?;

        Ok(Self {
            sealed: Sealed {
                ciphertext: field(META_WRAPPED_KEY)?,
                nonce,
            },
            salt,
            params,
        })
    }

    fn unwrap_key(&self, passphrase: &SecretString) -> Result<Zeroizing<[u8; KEY_LEN]>, KontextError> {
        let wrapping_key =
            kdf::derive_key(passphrase.expose_secret().as_bytes(), &self.salt, self.params)?;
        let bytes = Zeroizing::new(crypto::open(&wrapping_key, &self.sealed).map_err(|_| {
            KontextError::Vault("invalid passphrase or corrupted vault".to_string())
        })?);
        let key: [u8; KEY_LEN] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| corrupt("master key has the wrong length"))?;
        Ok(Zeroizing::new(key))
    }
}

impl Vault {
    /// Whether a master key has been created in this database.
    pub async fn exists(conn: &tokio_rusqlite::Connection) -> Result<bool, KontextError> {
        conn.call(|conn| -> Result<bool, rusqlite::Error> {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM vault_meta WHERE key = ?1",
                params![META_WRAPPED_KEY],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
        .await
        .map_err(map_tr_err)
    }

    /// Creates a vault with a fresh master key wrapped by `passphrase`.
    pub async fn create(
        conn: tokio_rusqlite::Connection,
        passphrase: &SecretString,
        params: KdfParams,
    ) -> Result<Self, KontextError> {
        let master_key = Zeroizing::new(crypto::random_bytes::<KEY_LEN>()?);
        WrappedKey::new(passphrase, &master_key, params)?
            .write(&conn)
            .await?;
        info!("vault created");
        Ok(Self { master_key, conn })
    }

    /// Unlocks an existing vault. Fails on a wrong passphrase.
    pub async fn unlock(
        conn: tokio_rusqlite::Connection,
        passphrase: &SecretString,
    ) -> Result<Self, KontextError> {
        let master_key = WrappedKey::read(&conn).await?.unwrap_key(passphrase)?;
        debug!("vault unlocked");
        Ok(Self { master_key, conn })
    }

    pub async fn store_secret(&self, name: &str, plaintext: &str) -> Result<(), KontextError> {
        let sealed = crypto::seal(&self.master_key, plaintext.as_bytes())?;
        let name_owned = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT OR REPLACE INTO vault_entries (name, ciphertext, nonce) \
                     VALUES (?1, ?2, ?3)",
                    params![name_owned, sealed.ciphertext, sealed.nonce.to_vec()],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!(name, "secret stored");
        Ok(())
    }

    pub async fn retrieve_secret(&self, name: &str) -> Result<Option<SecretString>, KontextError> {
        let name_owned = name.to_string();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<(Vec<u8>, Vec<u8>)>, rusqlite::Error> {
                conn.query_row(
                    "SELECT ciphertext, nonce FROM vault_entries WHERE name = ?1",
                    params![name_owned],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()
            })
            .await
            .map_err(map_tr_err)?;

        let Some((ciphertext, nonce)) = row else {
            return Ok(None);
        };
        let sealed = Sealed {
            ciphertext,
            nonce: nonce
                .try_into()
                .map_err(|_| corrupt(&format!("nonce of {name}")))?,
        };
        let plaintext = crypto::open(&self.master_key, &sealed)?;
        let value = String::from_utf8(plaintext)
            .map_err(|_| corrupt(&format!("{name} is not valid UTF-8")))?;
        Ok(Some(SecretString::from(value)))
    }

    /// Names of all stored secrets, sorted.
    pub async fn secret_names(&self) -> Result<Vec<String>, KontextError> {
        self.conn
            .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn.prepare("SELECT name FROM vault_entries ORDER BY name")?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.collect()
            })
            .await
            .map_err(map_tr_err)
    }

    pub async fn delete_secret(&self, name: &str) -> Result<(), KontextError> {
        let name_owned = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute("DELETE FROM vault_entries WHERE name = ?1", params![name_owned])?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!(name, "secret deleted");
        Ok(())
    }

    /// Re-wraps the master key under a new passphrase. Entries are untouched.
    pub async fn change_passphrase(
        &self,
        new_passphrase: &SecretString,
        params: KdfParams,
    ) -> Result<(), KontextError> {
        WrappedKey::new(new_passphrase, &self.master_key, params)?
            .write(&self.conn)
            .await?;
        info!("vault passphrase changed");
        Ok(())
    }
}

/// Masks a secret for display: `sk-p...wxyz`. Values under ten characters become `****`.
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() < 10 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use kontext_storage::Database;
    use tempfile::tempdir;

    const CHEAP: KdfParams = KdfParams {
        memory_cost: 8192,
        iterations: 1,
        parallelism: 1,
    };

    fn pass(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    async fn open_db() -> (tokio_rusqlite::Connection, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("vault.db")).await.unwrap();
        (db.connection().clone(), dir)
    }

    #[tokio::test]
    async fn create_store_reopen_retrieve() {
        let (conn, _dir) = open_db().await;
        assert!(!Vault::exists(&conn).await.unwrap());

        let vault = Vault::create(conn.clone(), &pass("correct horse"), CHEAP)
            .await
            .unwrap();
        assert!(Vault::exists(&conn).await.unwrap());
        assert!(format!("{vault:?}").contains("REDACTED"));
        vault.store_secret("openai.api_key", "sk-proj-1234567890").await.unwrap();
        drop(vault);

        let vault = Vault::unlock(conn, &pass("correct horse")).await.unwrap();
        let secret = vault.retrieve_secret("openai.api_key").await.unwrap().unwrap();
        assert_eq!(secret.expose_secret(), "sk-proj-1234567890");
        assert!(vault.retrieve_secret("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn wrong_passphrase_is_rejected() {
        let (conn, _dir) = open_db().await;
        Vault::create(conn.clone(), &pass("right"), CHEAP).await.unwrap();
        let err = Vault::unlock(conn, &pass("wrong")).await.unwrap_err();
        assert!(err.to_string().contains("invalid passphrase"));
    }

    #[tokio::test]
    async fn passphrase_change_keeps_entries() {
        let (conn, _dir) = open_db().await;
        let vault = Vault::create(conn.clone(), &pass("old"), CHEAP).await.unwrap();
        vault.store_secret("google.api_key", "AIza-secret-value").await.unwrap();
        vault.change_passphrase(&pass("new"), CHEAP).await.unwrap();
        drop(vault);

        assert!(Vault::unlock(conn.clone(), &pass("old")).await.is_err());
        let vault = Vault::unlock(conn, &pass("new")).await.unwrap();
        assert_eq!(
            vault
                .retrieve_secret("google.api_key")
                .await
                .unwrap()
                .unwrap()
                .expose_secret(),
            "AIza-secret-value"
        );
    }

    #[tokio::test]
    async fn names_are_listed_and_deletable() {
        let (conn, _dir) = open_db().await;
        let vault = Vault::create(conn, &pass("p"), CHEAP).await.unwrap();
        vault.store_secret("b", "2").await.unwrap();
        vault.store_secret("a", "1").await.unwrap();
        assert_eq!(vault.secret_names().await.unwrap(), vec!["a", "b"]);
        vault.delete_secret("a").await.unwrap();
        assert_eq!(vault.secret_names().await.unwrap(), vec!["b"]);
    }

    #[test]
    fn masking() {
        assert_eq!(mask_secret("sk-proj-abcdwxyz"), "sk-p...wxyz");
        assert_eq!(mask_secret("short"), "****");
        assert_eq!(mask_secret("ключ-секрет-значение"), "ключ...ение");
    }
}
