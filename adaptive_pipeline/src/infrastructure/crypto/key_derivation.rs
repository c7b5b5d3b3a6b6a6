// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Argon2id password-KDF plus HKDF-SHA256 child derivation, implementing
//! [`KeyDerivationService`]. Goes through `Argon2::hash_password_into`
//! directly (raw salt bytes, fixed 32-byte output) rather than the
//! `PasswordHasher` trait's encoded-string form, since the satellite-supplied
//! salt is arbitrary bytes, not a `SaltString`.

use argon2::{Algorithm, Argon2, Params, Version};
use hkdf::Hkdf;
use sha2::Sha256;

use storx_uplink_domain::error::UplinkError;
use storx_uplink_domain::services::KeyDerivationService;
use storx_uplink_domain::value_objects::Key;

/// Argon2id tuning. `m_cost`/`t_cost` match argon2's own defaults; only
/// `p_cost` (parallelism) varies per call, since it is the one tuning
/// parameter satellites advertise to clients and so the one that must be
/// free to change the derived root key.
const M_COST: u32 = Params::DEFAULT_M_COST;
const T_COST: u32 = Params::DEFAULT_T_COST;

pub struct Argon2HkdfKeyDerivation;

impl Argon2HkdfKeyDerivation {
    pub fn new() -> Self {
        Self
    }
}

impl Default for Argon2HkdfKeyDerivation {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyDerivationService for Argon2HkdfKeyDerivation {
    fn derive_root(&self, passphrase: &str, salt: &[u8], concurrency: u32) -> Result<Key, UplinkError> {
        let p_cost = concurrency.max(1);
        let params = Params::new(M_COST, T_COST, p_cost, Some(Key::LEN))
            .map_err(|e| UplinkError::crypto(format!("invalid argon2 parameters: {e}")))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut out = [0u8; Key::LEN];
        argon2
            .hash_password_into(passphrase.as_bytes(), salt, &mut out)
            .map_err(|e| UplinkError::crypto(format!("argon2id root key derivation failed: {e}")))?;
        Ok(Key::from_bytes(out))
    }

    fn derive_child(&self, parent: &Key, component: &[u8]) -> Result<Key, UplinkError> {
        hkdf_expand(parent, component)
    }

    fn derive_labeled(&self, key: &Key, label: &[u8]) -> Result<Key, UplinkError> {
        hkdf_expand(key, label)
    }
}

fn hkdf_expand(parent: &Key, info: &[u8]) -> Result<Key, UplinkError> {
    let hkdf = Hkdf::<Sha256>::new(None, parent.as_bytes());
    let mut out = [0u8; Key::LEN];
    hkdf.expand(info, &mut out)
        .map_err(|e| UplinkError::crypto(format!("hkdf expand failed: {e}")))?;
    Ok(Key::from_bytes(out))
}
