// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AES-256-GCM sealing with a fresh random 96-bit nonce per call.

use kontext_core::KontextError;
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};

pub const KEY_LEN: usize = 32;

/// Ciphertext (with the 16-byte tag appended) and the nonce it was sealed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; NONCE_LEN],
}

fn vault_err(message: &str) -> KontextError {
    KontextError::Vault(message.to_string())
}

fn aead_key(key: &[u8; KEY_LEN]) -> Result<LessSafeKey, KontextError> {
    UnboundKey::new(&AES_256_GCM, key)
        .map(LessSafeKey::new)
        .map_err(|_| vault_err("failed to create AES-256-GCM key"))
}

/// Fills a fixed-size buffer from the system CSPRNG.
pub fn random_bytes<const N: usize>() -> Result<[u8; N], KontextError> {
    let mut buf = [0u8; N];
    SystemRandom::new()
        .fill(&mut buf)
        .map_err(|_| vault_err("system random generator unavailable"))?;
    Ok(buf)
}

pub fn seal(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<Sealed, KontextError> {
    let nonce = random_bytes::<NONCE_LEN>()?;
    let mut in_out = plaintext.to_vec();
    aead_key(key)?
        .seal_in_place_append_tag(Nonce::assume_unique_for_key(nonce), Aad::empty(), &mut in_out)
        .map_err(|_| vault_err("AES-256-GCM encryption failed"))?;
    Ok(Sealed {
        ciphertext: in_out,
        nonce,
    })
}

/// Fails on a wrong key or any modification of the ciphertext.
pub fn open(key: &[u8; KEY_LEN], sealed: &Sealed) -> Result<Vec<u8>, KontextError> {
    let mut in_out = sealed.ciphertext.clone();
    let plaintext = aead_key(key)?
        .open_in_place(
            Nonce::assume_unique_for_key(sealed.nonce),
            Aad::empty(),
            &mut in_out,
        )
        .map_err(|_| vault_err("decryption failed: wrong key or corrupted data"))?;
    Ok(plaintext.to_vec())
}
