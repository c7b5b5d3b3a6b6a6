// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use crate::value_objects::Key;

/// In-memory, ordered mapping from `(bucket, encrypted-path-prefix)` to a
/// base key, with longest-prefix lookup. Read-only after an access grant
/// is parsed: entries are added once at construction time, never mutated
/// concurrently with lookups.
///
/// A default entry `("", "") -> root key` is always present so every
/// `(bucket, path)` has at least one match.
pub struct EncryptionStore {
    root: Key,
    /// Sorted by `(bucket, prefix)` so the longest matching prefix for a
    /// given bucket is the last entry whose `(bucket, prefix)` is itself a
    /// prefix of the lookup key. Small enough (one entry per configured
    /// bucket/shared-prefix) that a linear scan beats a trie in practice.
    entries: Vec<(String, String, Key)>,
}

impl EncryptionStore {
    pub fn new(root: Key) -> Self {
        Self {
            root,
            entries: Vec::new(),
        }
    }

    /// Registers a non-default base key for `(bucket, prefix)`. `prefix` is
    /// a sequence of already-encrypted path components joined by `/`.
    pub fn insert(&mut self, bucket: impl Into<String>, prefix: impl Into<String>, key: Key) {
        self.entries.push((bucket.into(), prefix.into(), key));
    }

    /// Longest-prefix lookup (`lookup_base`). Returns the matching base key
    /// and the cleartext path components still left to derive through.
    ///
    /// `components` are the cleartext path components of the full object
    /// key; since entries are keyed by already-encrypted prefixes in the
    /// real system but our path-key derivation is itself what produces
    /// those prefixes, the store is walked component-by-component: the
    /// longest run of leading components whose joined (bucket, prefix) has
    /// a registered entry wins.
    pub fn lookup_base<'a>(&self, bucket: &str, components: &'a [&'a str]) -> (&Key, &'a [&'a str]) {
        let mut best: Option<(usize, &Key)> = None;
        for (entry_bucket, prefix, key) in &self.entries {
            if entry_bucket != bucket {
                continue;
            }
            let prefix_components: Vec<&str> = if prefix.is_empty() {
                Vec::new()
            } else {
                prefix.split('/').collect()
            };
            if prefix_components.len() > components.len() {
                continue;
            }
            if components[..prefix_components.len()] == prefix_components[..] {
                let matched_len = prefix_components.len();
                if best.map(|(len, _)| matched_len > len).unwrap_or(true) {
                    best = Some((matched_len, key));
                }
            }
        }
        match best {
            Some((matched_len, key)) => (key, &components[matched_len..]),
            None => (&self.root, components),
        }
    }

    pub fn root_key(&self) -> &Key {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> Key {
        Key::from_bytes([byte; 32])
    }

    #[test]
    fn default_entry_matches_everything_when_store_is_empty() {
        let store = EncryptionStore::new(key(1));
        let components = ["a", "b", "c"];
        let (matched, remaining) = store.lookup_base("bucket", &components);
        assert_eq!(matched.as_bytes(), key(1).as_bytes());
        assert_eq!(remaining, &components);
    }

    #[test]
    fn longest_prefix_wins() {
        let mut store = EncryptionStore::new(key(0));
        store.insert("bucket", "a", key(1));
        store.insert("bucket", "a/b", key(2));

        let components = ["a", "b", "c"];
        let (matched, remaining) = store.lookup_base("bucket", &components);
        assert_eq!(matched.as_bytes(), key(2).as_bytes());
        assert_eq!(remaining, &["c"]);
    }

    #[test]
    fn different_bucket_does_not_match() {
        let mut store = EncryptionStore::new(key(0));
        store.insert("other-bucket", "a", key(1));

        let components = ["a", "b"];
        let (matched, remaining) = store.lookup_base("bucket", &components);
        assert_eq!(matched.as_bytes(), key(0).as_bytes());
        assert_eq!(remaining, &components);
    }
}
