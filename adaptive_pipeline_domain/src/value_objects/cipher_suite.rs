// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use serde::{Deserialize, Serialize};

/// The AEAD construction used for content and path encryption. Fixed per
/// object at creation time; this library does not negotiate ciphersuites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CipherSuite {
    /// No encryption. Only meaningful for test fixtures and migration
    /// tooling; never selected by a passphrase-backed project.
    Unencrypted,
    /// AES-256-GCM for content, AES-SIV for deterministic path encryption.
    Aes256GcmAesSiv,
    /// ChaCha20-Poly1305 for content, AES-SIV for deterministic path
    /// encryption. Used when the platform lacks AES-NI.
    ChaCha20Poly1305AesSiv,
}

impl CipherSuite {
    pub fn is_encrypted(self) -> bool {
        !matches!(self, Self::Unencrypted)
    }
}

impl Default for CipherSuite {
    fn default() -> Self {
        Self::Aes256GcmAesSiv
    }
}
