// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The segment AEAD transformer: streams plaintext through AES-256-GCM or
//! ChaCha20-Poly1305 in fixed-size wire blocks, dispatched by
//! [`CipherSuite`], generalized to per-block streaming so the encrypted
//! size is deterministic from plaintext size and block size alone.
//!
//! Each wire block holds up to [`PLAIN_CHUNK`] plaintext bytes plus a
//! 16-byte AEAD tag, zero-padded up to [`BLOCK_SIZE`] so that
//! `storx_uplink_domain::services::key_hierarchy::encrypted_size` — which
//! only knows `plain_size` and `blockSize` — predicts the wire size exactly
//! without having to inspect the ciphertext.

use aes_gcm::{AeadInPlace, Aes256Gcm, KeyInit as GcmKeyInit, Nonce as GcmNonce};
use chacha20poly1305::{ChaCha20Poly1305, KeyInit as ChaChaKeyInit, Nonce as ChaChaNonce};

use storx_uplink_domain::error::UplinkError;
use storx_uplink_domain::value_objects::{CipherSuite, Key, SegmentPosition};

/// Wire block size: matches the `blockSize` parameter fed to
/// `encrypted_size`.
pub const BLOCK_SIZE: u64 = 32 * 1024;
const TAG_LEN: usize = 16;
const PLAIN_CHUNK: usize = BLOCK_SIZE as usize - TAG_LEN;

pub struct SegmentCipher;

impl SegmentCipher {
    pub fn new() -> Self {
        Self
    }

    /// Encrypts `plaintext` block-by-block under `key`, deriving each
    /// block's nonce from the segment's position nonce perturbed by the
    /// block index so that no two blocks of the same segment, and no two
    /// segments, ever reuse a nonce.
    pub fn encrypt(&self, suite: CipherSuite, key: &Key, position: SegmentPosition, plaintext: &[u8]) -> Result<Vec<u8>, UplinkError> {
        if !suite.is_encrypted() {
            return Ok(plaintext.to_vec());
        }
        let mut out = Vec::with_capacity(block_count(plaintext.len() as u64) as usize * BLOCK_SIZE as usize);
        for (index, chunk) in plaintext.chunks(PLAIN_CHUNK).enumerate() {
            let nonce = block_nonce(position, index as u32);
            let mut block = aead_encrypt(suite, key, &nonce, chunk)?;
            block.resize(BLOCK_SIZE as usize, 0);
            out.extend_from_slice(&block);
        }
        Ok(out)
    }

    /// Inverse of [`Self::encrypt`]. Needs `plain_size` to know how many
    /// real (unpadded) ciphertext bytes each wire block holds, since the
    /// trailing block is zero-padded up to `BLOCK_SIZE` on the wire.
    pub fn decrypt(
        &self,
        suite: CipherSuite,
        key: &Key,
        position: SegmentPosition,
        plain_size: u64,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, UplinkError> {
        if !suite.is_encrypted() {
            return Ok(ciphertext.to_vec());
        }
        let mut out = Vec::with_capacity(plain_size as usize);
        let mut remaining = plain_size;
        for index in 0..block_count(plain_size) {
            let block_plain_len = remaining.min(PLAIN_CHUNK as u64) as usize;
            let real_ct_len = block_plain_len + TAG_LEN;
            let start = index as usize * BLOCK_SIZE as usize;
            let block = ciphertext
                .get(start..start + real_ct_len)
                .ok_or_else(|| UplinkError::crypto("segment ciphertext shorter than expected"))?;
            let nonce = block_nonce(position, index as u32);
            let plain_block = aead_decrypt(suite, key, &nonce, block)?;
            out.extend_from_slice(&plain_block);
            remaining -= block_plain_len as u64;
        }
        Ok(out)
    }
}

impl Default for SegmentCipher {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentCipher {
    /// Wraps a short secret (a segment key or the object metadata key)
    /// under `kek` with an explicit nonce, with no chunking or padding —
    /// unlike [`Self::encrypt`], callers here always know the exact
    /// plaintext length up front and don't need the size-from-plain-size
    /// determinism that wrapping the content-segment key relies on.
    pub fn wrap_key(&self, suite: CipherSuite, kek: &Key, nonce: [u8; 12], plaintext: &[u8]) -> Result<Vec<u8>, UplinkError> {
        if !suite.is_encrypted() {
            return Ok(plaintext.to_vec());
        }
        aead_encrypt(suite, kek, &nonce, plaintext)
    }

    /// Inverse of [`Self::wrap_key`].
    pub fn unwrap_key(&self, suite: CipherSuite, kek: &Key, nonce: [u8; 12], ciphertext: &[u8]) -> Result<Vec<u8>, UplinkError> {
        if !suite.is_encrypted() {
            return Ok(ciphertext.to_vec());
        }
        aead_decrypt(suite, kek, &nonce, ciphertext)
    }

    /// The on-wire ciphertext length [`Self::encrypt`] will produce for
    /// `plain_size` plaintext bytes, needed by the download path to size
    /// the erasure-decoded block before decrypting it.
    pub fn wire_size(&self, plain_size: u64) -> u64 {
        block_count(plain_size) * BLOCK_SIZE
    }
}

fn block_count(plain_size: u64) -> u64 {
    if plain_size == 0 {
        0
    } else {
        plain_size.div_ceil(PLAIN_CHUNK as u64)
    }
}

/// Perturbs the segment-level nonce with the block index in its low 4
/// bytes, which are otherwise always zero for `index < 2^32` segments,
/// leaving the high 8 bytes (carrying `(part_number, index)`) untouched.
fn block_nonce(position: SegmentPosition, block_index: u32) -> [u8; 12] {
    let mut nonce = position.nonce();
    let perturbed = u32::from_le_bytes([nonce[8], nonce[9], nonce[10], nonce[11]]) ^ block_index;
    nonce[8..12].copy_from_slice(&perturbed.to_le_bytes());
    nonce
}

fn aead_encrypt(suite: CipherSuite, key: &Key, nonce: &[u8; 12], plaintext: &[u8]) -> Result<Vec<u8>, UplinkError> {
    let mut buffer = plaintext.to_vec();
    match suite {
        CipherSuite::Aes256GcmAesSiv => {
            let cipher = Aes256Gcm::new(aes_gcm::Key::<Aes256Gcm>::from_slice(key.as_bytes()));
            cipher
                .encrypt_in_place(GcmNonce::from_slice(nonce), b"", &mut buffer)
                .map_err(|e| UplinkError::crypto(format!("aes-256-gcm segment encryption failed: {e}")))?;
        }
        CipherSuite::ChaCha20Poly1305AesSiv => {
            let cipher = ChaCha20Poly1305::new(chacha20poly1305::Key::from_slice(key.as_bytes()));
            cipher
                .encrypt_in_place(ChaChaNonce::from_slice(nonce), b"", &mut buffer)
                .map_err(|e| UplinkError::crypto(format!("chacha20-poly1305 segment encryption failed: {e}")))?;
        }
        CipherSuite::Unencrypted => unreachable!("checked by is_encrypted() in callers"),
    }
    Ok(buffer)
}

fn aead_decrypt(suite: CipherSuite, key: &Key, nonce: &[u8; 12], ciphertext: &[u8]) -> Result<Vec<u8>, UplinkError> {
    let mut buffer = ciphertext.to_vec();
    match suite {
        CipherSuite::Aes256GcmAesSiv => {
            let cipher = Aes256Gcm::new(aes_gcm::Key::<Aes256Gcm>::from_slice(key.as_bytes()));
            cipher
                .decrypt_in_place(GcmNonce::from_slice(nonce), b"", &mut buffer)
                .map_err(|e| UplinkError::crypto(format!("aes-256-gcm segment decryption failed: {e}")))?;
        }
        CipherSuite::ChaCha20Poly1305AesSiv => {
            let cipher = ChaCha20Poly1305::new(chacha20poly1305::Key::from_slice(key.as_bytes()));
            cipher
                .decrypt_in_place(ChaChaNonce::from_slice(nonce), b"", &mut buffer)
                .map_err(|e| UplinkError::crypto(format!("chacha20-poly1305 segment decryption failed: {e}")))?;
        }
        CipherSuite::Unencrypted => unreachable!("checked by is_encrypted() in callers"),
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> Key {
        Key::from_bytes([5; 32])
    }

    #[test]
    fn round_trips_single_block() {
        let cipher = SegmentCipher::new();
        let position = SegmentPosition::first();
        let plaintext = b"hello storx".to_vec();
        let ciphertext = cipher.encrypt(CipherSuite::Aes256GcmAesSiv, &key(), position, &plaintext).unwrap();
        let decrypted = cipher
            .decrypt(CipherSuite::Aes256GcmAesSiv, &key(), position, plaintext.len() as u64, &ciphertext)
            .unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn round_trips_multiple_blocks() {
        let cipher = SegmentCipher::new();
        let position = SegmentPosition::new(0, 3);
        let plaintext = vec![0x42u8; PLAIN_CHUNK * 2 + 100];
        let ciphertext = cipher
            .encrypt(CipherSuite::ChaCha20Poly1305AesSiv, &key(), position, &plaintext)
            .unwrap();
        let expected_blocks = (plaintext.len() as u64).div_ceil(PLAIN_CHUNK as u64);
        assert_eq!(ciphertext.len() as u64, expected_blocks * BLOCK_SIZE);
        let decrypted = cipher
            .decrypt(CipherSuite::ChaCha20Poly1305AesSiv, &key(), position, plaintext.len() as u64, &ciphertext)
            .unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn unencrypted_suite_is_passthrough() {
        let cipher = SegmentCipher::new();
        let position = SegmentPosition::first();
        let plaintext = b"plain".to_vec();
        let ciphertext = cipher.encrypt(CipherSuite::Unencrypted, &key(), position, &plaintext).unwrap();
        assert_eq!(ciphertext, plaintext);
    }

    #[test]
    fn wrap_key_round_trips() {
        let cipher = SegmentCipher::new();
        let kek = key();
        let secret = vec![0x11u8; 32];
        let wrapped = cipher.wrap_key(CipherSuite::Aes256GcmAesSiv, &kek, [7u8; 12], &secret).unwrap();
        let unwrapped = cipher.unwrap_key(CipherSuite::Aes256GcmAesSiv, &kek, [7u8; 12], &wrapped).unwrap();
        assert_eq!(unwrapped, secret);
    }

    #[test]
    fn wire_size_matches_encrypted_output_length() {
        let cipher = SegmentCipher::new();
        let plaintext = vec![0x01u8; PLAIN_CHUNK * 2 + 5];
        let ciphertext = cipher
            .encrypt(CipherSuite::Aes256GcmAesSiv, &key(), SegmentPosition::first(), &plaintext)
            .unwrap();
        assert_eq!(cipher.wire_size(plaintext.len() as u64), ciphertext.len() as u64);
    }

    #[test]
    fn empty_plaintext_round_trips() {
        let cipher = SegmentCipher::new();
        let position = SegmentPosition::first();
        let ciphertext = cipher.encrypt(CipherSuite::Aes256GcmAesSiv, &key(), position, &[]).unwrap();
        assert!(ciphertext.is_empty());
        let decrypted = cipher
            .decrypt(CipherSuite::Aes256GcmAesSiv, &key(), position, 0, &ciphertext)
            .unwrap();
        assert!(decrypted.is_empty());
    }
}
