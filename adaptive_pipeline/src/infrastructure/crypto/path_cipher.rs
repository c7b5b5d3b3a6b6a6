// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! AES-SIV deterministic AEAD for per-component path encryption. SIV mode
//! synthesizes its own IV from the key, associated data, and plaintext, so
//! unlike `MultiAlgoEncryption`'s AES-256-GCM adapter there is no nonce to
//! generate or prepend: `encrypt_component` is a pure function of `(key,
//! component)`, which is what path-encryption determinism and prefix
//! preservation require.

use aes_siv::siv::Aes128Siv;
use aes_siv::{KeyInit, KeySizeUser};

use storx_uplink_domain::error::UplinkError;
use storx_uplink_domain::services::PathCipher;
use storx_uplink_domain::value_objects::Key;

pub struct AesSivPathCipher;

impl AesSivPathCipher {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AesSivPathCipher {
    fn default() -> Self {
        Self::new()
    }
}

impl PathCipher for AesSivPathCipher {
    fn encrypt_component(&self, key: &Key, component: &[u8]) -> Result<Vec<u8>, UplinkError> {
        let mut cipher = siv_cipher(key);
        cipher
            .encrypt(&[&[]], component)
            .map_err(|e| UplinkError::crypto(format!("aes-siv path component encryption failed: {e}")))
    }

    fn decrypt_component(&self, key: &Key, ciphertext: &[u8]) -> Result<Vec<u8>, UplinkError> {
        let mut cipher = siv_cipher(key);
        cipher
            .decrypt(&[&[]], ciphertext)
            .map_err(|e| UplinkError::crypto(format!("aes-siv path component decryption failed: {e}")))
    }
}

fn siv_cipher(key: &Key) -> Aes128Siv {
    debug_assert_eq!(Aes128Siv::key_size(), Key::LEN);
    let key_bytes = aes_siv::Key::<Aes128Siv>::from_slice(key.as_bytes());
    Aes128Siv::new(key_bytes)
}
