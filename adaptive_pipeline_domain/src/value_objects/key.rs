// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// A 32-byte symmetric key: a root key, a base key in the encryption store,
/// a path-derivation key, a content key, or a content-segment key. The key
/// hierarchy reuses this one type at every level; callers distinguish
/// levels by where the `Key` came from, not by its Rust type.
///
/// Zeroized on drop so that key material doesn't linger in freed memory.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Key([u8; 32]);

impl Key {
    pub const LEN: usize = 32;

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

// Constant-time-ish equality is not required here (keys are never compared
// for branching on secret data in this crate), but we still avoid leaking
// the value in Debug.
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Key").field(&"<redacted 32 bytes>").finish()
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl Eq for Key {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_never_prints_bytes() {
        let k = Key::from_bytes([0x42; 32]);
        assert!(!format!("{k:?}").contains("66")); // 0x42 == 66 decimal
    }
}
