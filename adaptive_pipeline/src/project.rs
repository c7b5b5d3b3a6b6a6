// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The `Project` facade: the single object an embedding application
//! constructs once per satellite/API-key/encryption hierarchy. It
//! exclusively owns the admission scheduler and the key material, and
//! hands out borrowed [`StreamStore`] handles scoped to its own lifetime —
//! no `Rc`/raw-pointer cycles, consistent with every other shared resource
//! in this crate being held behind `Arc` (`UploadScheduler` internally,
//! storage clients by the caller) rather than reference counted on this
//! side.

use storx_uplink_domain::services::{BackoffSchedule, KeyDerivationService, PathCipher};
use storx_uplink_domain::value_objects::{CipherSuite, Key};

use crate::access_grant::AccessGrant;
use crate::infrastructure::config::ProjectConfig;
use crate::infrastructure::crypto::{AesSivPathCipher, Argon2HkdfKeyDerivation};
use crate::infrastructure::erasure_codec::ErasureCodec;
use crate::infrastructure::metadata_client::{BucketIterator, ObjectIterator, SatelliteMetadataClient};
use crate::infrastructure::piece_store_client::PieceStoreClient;
use crate::infrastructure::scheduler::UploadScheduler;
use crate::infrastructure::stream_store::StreamStore;

use storx_uplink_domain::entities::EncryptionStore;

/// Owns one project's key hierarchy, admission scheduler, and the
/// caller-supplied RPC clients for the satellite and storage nodes.
///
/// `M` is the satellite metadata client, `C` the erasure codec, and `S` the
/// storage-node piece client — all out-of-scope collaborators the
/// embedding application supplies at construction.
pub struct Project<M, C, S>
where
    M: SatelliteMetadataClient,
    C: ErasureCodec + Clone,
    S: PieceStoreClient + Clone + 'static,
{
    metadata: M,
    codec: C,
    piece_store: S,
    kdf: Argon2HkdfKeyDerivation,
    path_cipher: AesSivPathCipher,
    encryption_store: EncryptionStore,
    scheduler: UploadScheduler,
    cipher_suite: CipherSuite,
    config: ProjectConfig,
    retry_schedule: BackoffSchedule,
}

impl<M, C, S> Project<M, C, S>
where
    M: SatelliteMetadataClient,
    C: ErasureCodec + Clone,
    S: PieceStoreClient + Clone + 'static,
{
    /// Opens a project directly from a root key, with the default
    /// (empty) encryption store beyond that root.
    pub fn new(metadata: M, codec: C, piece_store: S, root_key: Key, cipher_suite: CipherSuite, config: ProjectConfig) -> Self {
        Self::with_encryption_store(metadata, codec, piece_store, EncryptionStore::new(root_key), cipher_suite, config)
    }

    /// Opens a project from a parsed [`AccessGrant`], reusing its satellite
    /// address's caller-established client, cipher suite, and full
    /// encryption store (root key plus any non-default bucket/prefix
    /// overrides).
    pub fn from_access_grant(grant: &AccessGrant, metadata: M, codec: C, piece_store: S, cipher_suite: CipherSuite, config: ProjectConfig) -> Self {
        Self::with_encryption_store(metadata, codec, piece_store, grant.encryption_store(), cipher_suite, config)
    }

    fn with_encryption_store(metadata: M, codec: C, piece_store: S, encryption_store: EncryptionStore, cipher_suite: CipherSuite, config: ProjectConfig) -> Self {
        let scheduler = UploadScheduler::new(config.upload.maximum_concurrent());
        Self {
            metadata,
            codec,
            piece_store,
            kdf: Argon2HkdfKeyDerivation::new(),
            path_cipher: AesSivPathCipher::new(),
            encryption_store,
            scheduler,
            cipher_suite,
            config,
            retry_schedule: BackoffSchedule::default(),
        }
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    fn kdf(&self) -> &dyn KeyDerivationService {
        &self.kdf
    }

    fn path_cipher(&self) -> &dyn PathCipher {
        &self.path_cipher
    }

    /// Borrows a [`StreamStore`] scoped to `&self`, sharing this project's
    /// scheduler, key hierarchy, and encryption store. The scheduler is
    /// shared across every upload the project starts, never recreated per
    /// call.
    pub fn stream_store(&self) -> StreamStore<'_, C, S> {
        StreamStore::new(
            &self.metadata,
            self.kdf(),
            self.path_cipher(),
            &self.encryption_store,
            self.codec.clone(),
            self.piece_store.clone(),
            self.scheduler.clone(),
            self.cipher_suite,
            self.config.disable_object_key_encryption,
            self.config.upload,
            self.retry_schedule,
        )
    }

    pub fn list_buckets(&self, page_limit: u32) -> BucketIterator<'_> {
        BucketIterator::new(&self.metadata, page_limit)
    }

    pub fn list_objects(&self, bucket: impl Into<String>, page_limit: u32) -> ObjectIterator<'_> {
        ObjectIterator::new(
            &self.metadata,
            self.kdf(),
            self.path_cipher(),
            &self.encryption_store,
            self.config.disable_object_key_encryption,
            bucket,
            page_limit,
        )
    }

    /// Releases this project's resources. The storage-node and satellite
    /// clients this project was constructed with are owned by the caller
    /// and are not touched here.
    pub fn close(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeErasureCodec, FakeMetadataClient, FakePieceStoreClient};

    fn project() -> Project<FakeMetadataClient, FakeErasureCodec, FakePieceStoreClient> {
        Project::new(
            FakeMetadataClient::default(),
            FakeErasureCodec,
            FakePieceStoreClient::new(),
            Key::from_bytes([7; 32]),
            CipherSuite::Aes256GcmAesSiv,
            ProjectConfig::default(),
        )
    }

    #[tokio::test]
    async fn uploads_and_downloads_a_small_object_round_trip() {
        let project = project();
        let store = project.stream_store();
        let token = tokio_util::sync::CancellationToken::new();

        let reader = std::io::Cursor::new(b"hello, storx".to_vec());
        let upload_id = store
            .upload("bucket-a", "greetings/hello.txt", Default::default(), reader, token.clone())
            .await
            .unwrap();
        assert!(!upload_id.as_str().is_empty());

        let downloaded = store.download("bucket-a", "greetings/hello.txt", token).await.unwrap();
        assert_eq!(downloaded.plaintext, b"hello, storx");
    }

    #[tokio::test]
    async fn concurrent_uploads_to_the_same_project_all_round_trip() {
        let mut config = ProjectConfig::default();
        config.upload.segment_size = crate::infrastructure::config::SegmentSizeConfig(13 * 1024);
        let project = Project::new(
            FakeMetadataClient::default(),
            FakeErasureCodec,
            FakePieceStoreClient::new(),
            Key::from_bytes([7; 32]),
            CipherSuite::Aes256GcmAesSiv,
            config,
        );
        let store = project.stream_store();
        let token = tokio_util::sync::CancellationToken::new();

        let payloads: Vec<Vec<u8>> = (0..3u8).map(|n| vec![n; 10 * 1024]).collect();
        let keys = ["test/0", "test/1", "test/2"];

        let (a, b, c) = tokio::join!(
            store.upload("bucket-a", keys[0], Default::default(), std::io::Cursor::new(payloads[0].clone()), token.clone()),
            store.upload("bucket-a", keys[1], Default::default(), std::io::Cursor::new(payloads[1].clone()), token.clone()),
            store.upload("bucket-a", keys[2], Default::default(), std::io::Cursor::new(payloads[2].clone()), token.clone()),
        );
        a.unwrap();
        b.unwrap();
        c.unwrap();

        let (da, db, dc) = tokio::join!(
            store.download("bucket-a", keys[0], token.clone()),
            store.download("bucket-a", keys[1], token.clone()),
            store.download("bucket-a", keys[2], token.clone()),
        );
        assert_eq!(da.unwrap().plaintext, payloads[0]);
        assert_eq!(db.unwrap().plaintext, payloads[1]);
        assert_eq!(dc.unwrap().plaintext, payloads[2]);
    }

    #[tokio::test]
    async fn listing_buckets_surfaces_every_uploaded_object_bucket() {
        let project = project();
        let store = project.stream_store();
        let token = tokio_util::sync::CancellationToken::new();
        store
            .upload("bucket-x", "a", Default::default(), std::io::Cursor::new(b"a".to_vec()), token.clone())
            .await
            .unwrap();

        let mut iter = project.list_buckets(10);
        let mut names = Vec::new();
        while let Some(name) = iter.next(token.clone()).await {
            names.push(name);
        }
        assert!(iter.err().is_none());
        assert_eq!(names, vec!["bucket-x".to_string()]);
    }

    #[tokio::test]
    async fn listing_objects_yields_the_original_cleartext_keys() {
        let project = project();
        let store = project.stream_store();
        let token = tokio_util::sync::CancellationToken::new();
        store
            .upload("bucket-x", "greetings/hello.txt", Default::default(), std::io::Cursor::new(b"hi".to_vec()), token.clone())
            .await
            .unwrap();
        store
            .upload("bucket-x", "greetings/goodbye.txt", Default::default(), std::io::Cursor::new(b"bye".to_vec()), token.clone())
            .await
            .unwrap();

        let mut iter = project.list_objects("bucket-x", 10);
        let mut keys = Vec::new();
        while let Some(key) = iter.next(token.clone()).await {
            keys.push(key);
        }
        assert!(iter.err().is_none());
        keys.sort();
        assert_eq!(keys, vec!["greetings/goodbye.txt".to_string(), "greetings/hello.txt".to_string()]);
    }
}
