// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Passphrase acquisition from `KONTEXT_VAULT_KEY` or an interactive prompt.

use std::io::IsTerminal;

use kontext_core::KontextError;
use secrecy::SecretString;

pub const VAULT_KEY_ENV_VAR: &str = "KONTEXT_VAULT_KEY";

fn from_env() -> Option<SecretString> {
    std::env::var(VAULT_KEY_ENV_VAR)
        .ok()
        .filter(|key| !key.is_empty())
        .map(SecretString::from)
}

fn read(prompt: &str) -> Result<String, KontextError> {
    rpassword::prompt_password(prompt)
        .map_err(|e| KontextError::Vault(format!("failed to read passphrase: {e}")))
}

fn no_source() -> KontextError {
    KontextError::Vault(format!(
        "no vault passphrase: set {VAULT_KEY_ENV_VAR} or run in a terminal"
    ))
}

/// Passphrase for unlocking an existing vault.
pub fn get_vault_passphrase() -> Result<SecretString, KontextError> {
    if let Some(key) = from_env() {
        return Ok(key);
    }
    if !std::io::stdin().is_terminal() {
        return Err(no_source());
    }
    let passphrase = read("Vault passphrase: ")?;
    if passphrase.is_empty() {
        return Err(KontextError::Vault("empty passphrase not allowed".to_string()));
    }
    Ok(SecretString::from(passphrase))
}

/// Passphrase for a new vault, asked twice when interactive.
pub fn get_new_vault_passphrase() -> Result<SecretString, KontextError> {
    if let Some(key) = from_env() {
        return Ok(key);
    }
    if !std::io::stdin().is_terminal() {
        return Err(no_source());
    }
    let first = read("New vault passphrase: ")?;
    let second = read("Confirm vault passphrase: ")?;
    if first != second {
        return Err(KontextError::Vault("passphrases do not match".to_string()));
    }
    if first.is_empty() {
        return Err(KontextError::Vault("empty passphrase not allowed".to_string()));
    }
    Ok(SecretString::from(first))
}
