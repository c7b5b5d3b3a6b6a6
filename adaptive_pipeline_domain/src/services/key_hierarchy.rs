// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Key hierarchy and path encryption.
//!
//! The concrete password-KDF (argon2id) and deterministic AEAD (AES-SIV)
//! live in the infrastructure crate behind [`KeyDerivationService`] and
//! [`PathCipher`]; this module owns only the orchestration: longest-prefix
//! lookup, per-component folding, and the "content" / "storx-etag-v1"
//! labeling scheme.

use crate::entities::EncryptionStore;
use crate::error::UplinkError;
use crate::value_objects::Key;

/// Port for the password-KDF and the per-component HKDF chaining.
/// Implemented in infrastructure with argon2id and HKDF-SHA256.
pub trait KeyDerivationService: Send + Sync {
    /// `derive_root(passphrase, salt, concurrency)`. `concurrency`
    /// must affect the output so that grants issued with different
    /// concurrency parameters remain mutually unreadable.
    fn derive_root(&self, passphrase: &str, salt: &[u8], concurrency: u32) -> Result<Key, UplinkError>;

    /// One step of `kᵢ = HKDF(kᵢ₋₁, componentᵢ)`.
    fn derive_child(&self, parent: &Key, component: &[u8]) -> Result<Key, UplinkError>;

    /// `HKDF(key, label)` for the fixed-label derivations: the content key
    /// (label `"content"`) and the ETag key (label `"storx-etag-v1"`).
    fn derive_labeled(&self, key: &Key, label: &[u8]) -> Result<Key, UplinkError>;
}

/// Port for per-component deterministic AEAD path encryption (AES-SIV in
/// infrastructure).
pub trait PathCipher: Send + Sync {
    fn encrypt_component(&self, key: &Key, component: &[u8]) -> Result<Vec<u8>, UplinkError>;
    fn decrypt_component(&self, key: &Key, ciphertext: &[u8]) -> Result<Vec<u8>, UplinkError>;
}

const CONTENT_LABEL: &[u8] = b"content";
const ETAG_LABEL: &[u8] = b"storx-etag-v1";

/// The path separator used to join encrypted components.
const PATH_SEPARATOR: char = '/';

/// Orchestrates key derivation and path encryption over injected KDF/cipher
/// ports.
pub struct KeyHierarchy<'a> {
    kdf: &'a dyn KeyDerivationService,
    cipher: &'a dyn PathCipher,
}

impl<'a> KeyHierarchy<'a> {
    pub fn new(kdf: &'a dyn KeyDerivationService, cipher: &'a dyn PathCipher) -> Self {
        Self { kdf, cipher }
    }

    /// `derive_path_key(base_key, components[])`: fold KDF across
    /// components.
    pub fn derive_path_key(&self, base: &Key, components: &[&str]) -> Result<Key, UplinkError> {
        let mut key = base.clone();
        for component in components {
            key = self.kdf.derive_child(&key, component.as_bytes())?;
        }
        Ok(key)
    }

    /// `derive_content_key(store, bucket, path)`.
    pub fn derive_content_key(&self, store: &EncryptionStore, bucket: &str, components: &[&str]) -> Result<Key, UplinkError> {
        if bucket.is_empty() {
            return Err(UplinkError::no_bucket());
        }
        if components.is_empty() || components == [""] {
            return Err(UplinkError::no_path());
        }
        let (base, remaining) = store.lookup_base(bucket, components);
        let path_key = self.derive_path_key(base, remaining)?;
        self.kdf.derive_labeled(&path_key, CONTENT_LABEL)
    }

    /// `DeriveKey(content_key, "storx-etag-v1")`.
    pub fn derive_etag_key(&self, content_key: &Key) -> Result<Key, UplinkError> {
        self.kdf.derive_labeled(content_key, ETAG_LABEL)
    }

    /// `encrypt_path(store, bucket, path)`. Component `i` is encrypted
    /// under the key folded from the base key across components `0..i`
    /// (not including component `i` itself); the chain is then advanced
    /// past component `i` for the next iteration. Keying each component
    /// off only its *predecessors* is what makes prefix preservation hold:
    /// two paths sharing a leading run of components encrypt that run
    /// identically, since the key used for component `i` never depends on
    /// component `i` or anything after it.
    ///
    /// `decrypt_path` must walk this same chain in the same direction —
    /// decrypt component `i` under the pre-advance key, then advance using
    /// the plaintext it just recovered — since the decrypting side cannot
    /// derive a key from a component it hasn't decrypted yet.
    ///
    /// When `disable_object_key_encryption` is set, returns the cleartext
    /// path verbatim.
    pub fn encrypt_path(
        &self,
        store: &EncryptionStore,
        bucket: &str,
        components: &[&str],
        disable_object_key_encryption: bool,
    ) -> Result<String, UplinkError> {
        if bucket.is_empty() {
            return Err(UplinkError::no_bucket());
        }
        if disable_object_key_encryption {
            return Ok(components.join(&PATH_SEPARATOR.to_string()));
        }
        let (base, remaining) = store.lookup_base(bucket, components);
        let mut key = base.clone();
        let mut encrypted_components = Vec::with_capacity(remaining.len());
        for component in remaining {
            let ciphertext = self.cipher.encrypt_component(&key, component.as_bytes())?;
            encrypted_components.push(bs58::encode(ciphertext).into_string());
            key = self.kdf.derive_child(&key, component.as_bytes())?;
        }
        Ok(encrypted_components.join(&PATH_SEPARATOR.to_string()))
    }

    /// `decrypt_path(...)`: the inverse of [`Self::encrypt_path`]. Requires
    /// re-deriving each component's key in order since the AEAD is keyed
    /// per-component, not globally, and (mirroring `encrypt_path`) must
    /// decrypt component `i` under the key folded across components
    /// `0..i` before advancing the chain with the plaintext it just
    /// recovered.
    pub fn decrypt_path(
        &self,
        store: &EncryptionStore,
        bucket: &str,
        encrypted_path: &str,
        disable_object_key_encryption: bool,
    ) -> Result<String, UplinkError> {
        if bucket.is_empty() {
            return Err(UplinkError::no_bucket());
        }
        if disable_object_key_encryption {
            return Ok(encrypted_path.to_string());
        }
        let encrypted_components: Vec<&str> = if encrypted_path.is_empty() {
            Vec::new()
        } else {
            encrypted_path.split(PATH_SEPARATOR).collect()
        };

        // We don't know the cleartext components yet (that's what we're
        // decrypting), so lookup_base can't walk by cleartext prefix here;
        // instead we always start from the default entry's key. Clients
        // are expected to agree on the store layout per bucket: decrypting
        // a path that used a non-default base key is only possible if the
        // whole prefix is re-derived from the same store, so we fold from
        // the store's root key plus any registered prefix matching the
        // bucket with an empty prefix (the default entry).
        let (base, _) = store.lookup_base(bucket, &[]);
        let mut key = base.clone();
        let mut decrypted_components = Vec::with_capacity(encrypted_components.len());
        for encoded in encrypted_components {
            let ciphertext = bs58::decode(encoded)
                .into_vec()
                .map_err(|e| UplinkError::invalid_argument(format!("malformed encrypted path component: {e}")))?;
            // The key for this component depends only on its predecessors,
            // so it's already correct going in; only after recovering the
            // plaintext can the chain advance past this component.
            let plaintext = self.cipher.decrypt_component(&key, &ciphertext)?;
            key = self.kdf.derive_child(&key, &plaintext)?;
            decrypted_components.push(
                String::from_utf8(plaintext).map_err(|e| UplinkError::crypto(format!("decrypted component is not utf-8: {e}")))?,
            );
        }
        Ok(decrypted_components.join(&PATH_SEPARATOR.to_string()))
    }
}

/// A remote segment's encrypted payload size equals
/// `ceil(plain / blockSize) * blockSize`.
pub fn encrypted_size(plain_size: u64, block_size: u64) -> u64 {
    if block_size == 0 {
        return plain_size;
    }
    plain_size.div_ceil(block_size) * block_size
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// A trivial, non-cryptographic KDF/cipher pair for exercising the
    /// orchestration logic in isolation. `derive_child` and `derive_labeled`
    /// just hash label bytes into the key so results are deterministic and
    /// distinguishable; `encrypt_component`/`decrypt_component` is a
    /// reversible XOR, which is enough to prove round-trip and prefix
    /// properties without depending on the infrastructure crate's AEAD.
    struct FakeKdf;

    impl KeyDerivationService for FakeKdf {
        fn derive_root(&self, passphrase: &str, salt: &[u8], concurrency: u32) -> Result<Key, UplinkError> {
            let mut bytes = [0u8; 32];
            for (i, b) in passphrase.bytes().chain(salt.iter().copied()).enumerate() {
                bytes[i % 32] ^= b;
            }
            bytes[0] ^= concurrency as u8;
            Ok(Key::from_bytes(bytes))
        }

        fn derive_child(&self, parent: &Key, component: &[u8]) -> Result<Key, UplinkError> {
            self.derive_labeled(parent, component)
        }

        fn derive_labeled(&self, key: &Key, label: &[u8]) -> Result<Key, UplinkError> {
            let mut bytes = *key.as_bytes();
            for (i, b) in label.iter().enumerate() {
                bytes[i % 32] ^= b.wrapping_add(1);
            }
            Ok(Key::from_bytes(bytes))
        }
    }

    struct FakeCipher {
        /// Records the last component key used, so tests can assert the
        /// orchestration derived the expected chain without needing a real
        /// AEAD to prove it.
        last_key: RefCell<Option<[u8; 32]>>,
    }

    impl FakeCipher {
        fn new() -> Self {
            Self { last_key: RefCell::new(None) }
        }
    }

    impl PathCipher for FakeCipher {
        fn encrypt_component(&self, key: &Key, component: &[u8]) -> Result<Vec<u8>, UplinkError> {
            *self.last_key.borrow_mut() = Some(*key.as_bytes());
            Ok(component.iter().zip(key.as_bytes().iter().cycle()).map(|(c, k)| c ^ k).collect())
        }

        fn decrypt_component(&self, key: &Key, ciphertext: &[u8]) -> Result<Vec<u8>, UplinkError> {
            Ok(ciphertext.iter().zip(key.as_bytes().iter().cycle()).map(|(c, k)| c ^ k).collect())
        }
    }

    #[test]
    fn round_trip() {
        let kdf = FakeKdf;
        let cipher = FakeCipher::new();
        let hierarchy = KeyHierarchy::new(&kdf, &cipher);
        let store = EncryptionStore::new(kdf.derive_root("pw", b"salt", 1).unwrap());

        let components = ["a", "b", "c.txt"];
        let encrypted = hierarchy.encrypt_path(&store, "bucket", &components, false).unwrap();
        let decrypted = hierarchy.decrypt_path(&store, "bucket", &encrypted, false).unwrap();
        assert_eq!(decrypted, "a/b/c.txt");
    }

    #[test]
    fn prefix_preservation() {
        let kdf = FakeKdf;
        let cipher = FakeCipher::new();
        let hierarchy = KeyHierarchy::new(&kdf, &cipher);
        let store = EncryptionStore::new(kdf.derive_root("pw", b"salt", 1).unwrap());

        let p = ["a", "b"];
        let q = ["a", "b", "c"];
        let enc_p = hierarchy.encrypt_path(&store, "bucket", &p, false).unwrap();
        let enc_q = hierarchy.encrypt_path(&store, "bucket", &q, false).unwrap();
        assert!(enc_q.starts_with(&enc_p));
    }

    #[test]
    fn disabled_encryption_is_verbatim() {
        let kdf = FakeKdf;
        let cipher = FakeCipher::new();
        let hierarchy = KeyHierarchy::new(&kdf, &cipher);
        let store = EncryptionStore::new(kdf.derive_root("pw", b"salt", 1).unwrap());

        let components = ["a", "b"];
        let encrypted = hierarchy.encrypt_path(&store, "bucket", &components, true).unwrap();
        assert_eq!(encrypted, "a/b");
    }

    #[test]
    fn rejects_empty_bucket_or_path() {
        let kdf = FakeKdf;
        let cipher = FakeCipher::new();
        let hierarchy = KeyHierarchy::new(&kdf, &cipher);
        let store = EncryptionStore::new(kdf.derive_root("pw", b"salt", 1).unwrap());

        assert!(hierarchy.encrypt_path(&store, "", &["a"], false).is_err());
        assert!(hierarchy.derive_content_key(&store, "bucket", &[]).is_err());
    }

    #[test]
    fn encrypted_size_matches_block_rounding() {
        assert_eq!(encrypted_size(0, 32), 0);
        assert_eq!(encrypted_size(1, 32), 32);
        assert_eq!(encrypted_size(32, 32), 32);
        assert_eq!(encrypted_size(33, 32), 64);
    }
}
