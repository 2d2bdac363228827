// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Argon2id key derivation from the vault passphrase.

use kontext_config::VaultConfig;
use kontext_core::KontextError;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::crypto::{KEY_LEN, random_bytes};

pub const SALT_LEN: usize = 16;

/// Cost parameters stored next to the wrapped master key, so a vault keeps
/// unlocking after the configured costs change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    pub memory_cost: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl From<&VaultConfig> for KdfParams {
    fn from(config: &VaultConfig) -> Self {
        Self {
            memory_cost: config.kdf_memory_cost,
            iterations: config.kdf_iterations,
            parallelism: config.kdf_parallelism,
        }
    }
}

pub fn derive_key(
    passphrase: &[u8],
    salt: &[u8; SALT_LEN],
    params: KdfParams,
) -> Result<Zeroizing<[u8; KEY_LEN]>, KontextError> {
    let argon_params = argon2::Params::new(
        params.memory_cost,
        params.iterations,
        params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| KontextError::Vault(format!("invalid Argon2id parameters: {e}")))?;
    let argon2 = argon2::Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        argon_params,
    );

    let mut output = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(passphrase, salt, output.as_mut())
        .map_err(|e| KontextError::Vault(format!("Argon2id key derivation failed: {e}")))?;
    Ok(output)
}

pub fn generate_salt() -> Result<[u8; SALT_LEN], KontextError> {
    random_bytes::<SALT_LEN>()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHEAP: KdfParams = KdfParams {
        memory_cost: 8192,
        iterations: 1,
        parallelism: 1,
    };

    #[test]
    fn derivation_is_deterministic_per_salt_and_passphrase() {
        let salt = [7u8; SALT_LEN];
        let a = derive_key(b"hunter2", &salt, CHEAP).unwrap();
        let b = derive_key(b"hunter2", &salt, CHEAP).unwrap();
        let c = derive_key(b"hunter3", &salt, CHEAP).unwrap();
        let d = derive_key(b"hunter2", &[8u8; SALT_LEN], CHEAP).unwrap();
        assert_eq!(*a, *b);
        assert_ne!(*a, *c);
        assert_ne!(*a, *d);
    }

    #[test]
    fn params_follow_config() {
        let params = KdfParams::from(&VaultConfig::default());
        assert_eq!(params.memory_cost, 65536);
        assert_eq!(params.iterations, 3);
        assert_eq!(params.parallelism, 4);
    }

    #[test]
    fn salts_are_random() {
        assert_ne!(generate_salt().unwrap(), generate_salt().unwrap());
    }
}
