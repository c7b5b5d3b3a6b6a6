// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Concrete crypto primitives backing the domain's [`KeyDerivationService`]
//! and [`PathCipher`] ports, plus the segment AEAD transformer: argon2 via
//! `argon2::Argon2`, AEAD via the RustCrypto
//! `aes-gcm`/`chacha20poly1305`/`aes-siv` crates, secure randomness via the
//! `rand` crate for random metadata/segment keys.
//!
//! [`KeyDerivationService`]: storx_uplink_domain::services::KeyDerivationService
//! [`PathCipher`]: storx_uplink_domain::services::PathCipher

mod key_derivation;
mod path_cipher;
mod segment_cipher;

pub use key_derivation::Argon2HkdfKeyDerivation;
pub use path_cipher::AesSivPathCipher;
pub use segment_cipher::SegmentCipher;
