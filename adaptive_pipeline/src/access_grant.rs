// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Serialized access grants: a compact opaque token carrying a satellite
//! address, an API key (opaque macaroon bytes), and an encryption access
//! (the root key plus any non-default encryption store entries). Framing
//! follows `UploadId`'s precedent (`value_objects::stream_id`): a 1-byte
//! version tag over a length-prefixed binary body, base58-encoded.

use storx_uplink_domain::entities::EncryptionStore;
use storx_uplink_domain::error::UplinkError;
use storx_uplink_domain::value_objects::Key;

const GRANT_VERSION: u8 = 1;

/// One non-default `(bucket, prefix) -> key` entry carried alongside the
/// root key.
#[derive(Debug, Clone)]
pub struct EncryptionStoreEntry {
    pub bucket: String,
    pub prefix: String,
    pub key: Key,
}

/// A parsed access grant: everything a [`crate::project::Project`] needs to
/// talk to one satellite under one API key with one encryption hierarchy.
#[derive(Debug, Clone)]
pub struct AccessGrant {
    pub satellite_address: String,
    pub api_key: Vec<u8>,
    pub root_key: Key,
    pub store_entries: Vec<EncryptionStoreEntry>,
}

impl AccessGrant {
    pub fn new(satellite_address: impl Into<String>, api_key: Vec<u8>, root_key: Key) -> Self {
        Self {
            satellite_address: satellite_address.into(),
            api_key,
            root_key,
            store_entries: Vec::new(),
        }
    }

    pub fn with_store_entry(mut self, bucket: impl Into<String>, prefix: impl Into<String>, key: Key) -> Self {
        self.store_entries.push(EncryptionStoreEntry {
            bucket: bucket.into(),
            prefix: prefix.into(),
            key,
        });
        self
    }

    /// Builds the [`EncryptionStore`] this grant describes. The store is
    /// read-only once built; a grant never mutates after parsing.
    pub fn encryption_store(&self) -> EncryptionStore {
        let mut store = EncryptionStore::new(self.root_key.clone());
        for entry in &self.store_entries {
            store.insert(entry.bucket.clone(), entry.prefix.clone(), entry.key.clone());
        }
        store
    }

    /// Serializes this grant as `base58(version=1 || framed body)`.
    pub fn serialize(&self) -> String {
        let mut buf = Vec::new();
        buf.push(GRANT_VERSION);
        write_string(&mut buf, &self.satellite_address);
        write_bytes(&mut buf, &self.api_key);
        write_bytes(&mut buf, self.root_key.as_bytes());
        buf.extend_from_slice(&(self.store_entries.len() as u32).to_be_bytes());
        for entry in &self.store_entries {
            write_string(&mut buf, &entry.bucket);
            write_string(&mut buf, &entry.prefix);
            write_bytes(&mut buf, entry.key.as_bytes());
        }
        bs58::encode(buf).into_string()
    }

    /// The inverse of [`Self::serialize`].
    pub fn parse(encoded: &str) -> Result<Self, UplinkError> {
        let framed = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| UplinkError::invalid_argument(format!("malformed access grant: {e}")))?;
        let mut reader = GrantReader::new(&framed);
        let version = reader.take(1)?[0];
        if version != GRANT_VERSION {
            return Err(UplinkError::invalid_argument(format!("unsupported access grant version {version}")));
        }

        let satellite_address = reader.read_string()?;
        let api_key = reader.read_bytes()?;
        let root_key = reader.read_key()?;

        let entry_count = reader.read_u32()?;
        let mut store_entries = Vec::with_capacity(entry_count as usize);
        for _ in 0..entry_count {
            let bucket = reader.read_string()?;
            let prefix = reader.read_string()?;
            let key = reader.read_key()?;
            store_entries.push(EncryptionStoreEntry { bucket, prefix, key });
        }

        Ok(Self {
            satellite_address,
            api_key,
            root_key,
            store_entries,
        })
    }
}

fn write_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    buf.extend_from_slice(bytes);
}

fn write_string(buf: &mut Vec<u8>, s: &str) {
    write_bytes(buf, s.as_bytes());
}

struct GrantReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> GrantReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], UplinkError> {
        let end = self.pos + len;
        let chunk = self.bytes.get(self.pos..end).ok_or_else(|| UplinkError::invalid_argument("truncated access grant"))?;
        self.pos = end;
        Ok(chunk)
    }

    fn read_u32(&mut self) -> Result<u32, UplinkError> {
        Ok(u32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn read_bytes(&mut self) -> Result<Vec<u8>, UplinkError> {
        let len = self.read_u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    fn read_string(&mut self) -> Result<String, UplinkError> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes).map_err(|e| UplinkError::invalid_argument(format!("access grant contains invalid utf-8: {e}")))
    }

    fn read_key(&mut self) -> Result<Key, UplinkError> {
        let bytes = self.read_bytes()?;
        let array: [u8; 32] = bytes.try_into().map_err(|_| UplinkError::invalid_argument("access grant key has unexpected length"))?;
        Ok(Key::from_bytes(array))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_with_no_store_entries() {
        let grant = AccessGrant::new("satellite.example.com:7777", vec![1, 2, 3], Key::from_bytes([9; 32]));
        let encoded = grant.serialize();
        let parsed = AccessGrant::parse(&encoded).unwrap();
        assert_eq!(parsed.satellite_address, grant.satellite_address);
        assert_eq!(parsed.api_key, grant.api_key);
        assert_eq!(parsed.root_key.as_bytes(), grant.root_key.as_bytes());
        assert!(parsed.store_entries.is_empty());
    }

    #[test]
    fn round_trips_with_store_entries() {
        let grant = AccessGrant::new("satellite.example.com:7777", vec![1, 2, 3], Key::from_bytes([9; 32]))
            .with_store_entry("bucket-a", "shared/folder", Key::from_bytes([4; 32]));
        let encoded = grant.serialize();
        let parsed = AccessGrant::parse(&encoded).unwrap();
        assert_eq!(parsed.store_entries.len(), 1);
        assert_eq!(parsed.store_entries[0].bucket, "bucket-a");
        assert_eq!(parsed.store_entries[0].prefix, "shared/folder");
    }

    #[test]
    fn rejects_unsupported_version() {
        let mut framed = vec![99u8];
        framed.extend_from_slice(&[0, 0, 0, 0]);
        let encoded = bs58::encode(framed).into_string();
        assert!(AccessGrant::parse(&encoded).is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(AccessGrant::parse("not-valid-base58!!!").is_err());
    }

    #[test]
    fn encryption_store_reflects_entries() {
        let grant = AccessGrant::new("sat", vec![], Key::from_bytes([1; 32])).with_store_entry("b", "p", Key::from_bytes([2; 32]));
        let store = grant.encryption_store();
        let (key, remaining) = store.lookup_base("b", &["p", "x"]);
        assert_eq!(key.as_bytes(), &[2; 32]);
        assert_eq!(remaining, &["x"]);
    }
}
