// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The satellite metadata RPC surface. Declares [`SatelliteMetadataClient`]
//! — the trait the batch aggregator and stream store are written against —
//! plus the typed request/response shapes and paging iterators. The
//! concrete transport is out of scope here; tests use in-memory fakes (see
//! [`crate::testing`]).

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use storx_uplink_domain::entities::{EncryptionStore, OrderLimit, OrderSet};
use storx_uplink_domain::error::UplinkError;
use storx_uplink_domain::services::{KeyDerivationService, KeyHierarchy, PathCipher};
use storx_uplink_domain::value_objects::{CipherSuite, RequiredThreshold, SegmentPosition, StreamId};

/// `R <= O <= N` for one segment, as returned alongside its order set.
#[derive(Debug, Clone, Copy)]
pub struct RedundancyScheme {
    pub required: u32,
    pub optimal: u32,
    pub total: u32,
}

/// One item scheduled on the batch aggregator. Variants correspond 1:1 to
/// the satellite RPCs, minus `BeginSegment` and
/// `ListBuckets`/`ListObjects`/`GetObject`, which are not batchable
/// metadata mutations.
#[derive(Debug, Clone)]
pub enum BatchItem {
    BeginObject {
        bucket: String,
        encrypted_path: String,
        cipher_suite: CipherSuite,
        encrypted_metadata_key: Vec<u8>,
        encrypted_metadata_key_nonce: [u8; 12],
        expires_unix_secs: Option<i64>,
    },
    MakeInlineSegment {
        stream_id: StreamId,
        position: SegmentPosition,
        ciphertext: Vec<u8>,
        plain_size: u64,
        cipher_suite: CipherSuite,
        encrypted_segment_key: Vec<u8>,
        encrypted_segment_key_nonce: [u8; 12],
    },
    CommitSegment {
        stream_id: StreamId,
        position: SegmentPosition,
        piece_hashes: Vec<[u8; 32]>,
        plain_size: u64,
        cipher_suite: CipherSuite,
        encrypted_segment_key: Vec<u8>,
        encrypted_segment_key_nonce: [u8; 12],
        encrypted_tag: Option<Vec<u8>>,
    },
    CommitObject {
        stream_id: StreamId,
        encrypted_stream_info: Vec<u8>,
    },
    AbortObject {
        stream_id: StreamId,
    },
    BeginDeleteObject {
        bucket: String,
        encrypted_path: String,
    },
}

/// The per-item response from a `Batch` call, matching [`BatchItem`] 1:1 in
/// schedule order.
#[derive(Debug, Clone)]
pub enum BatchItemResponse {
    BeginObject { stream_id: StreamId },
    MakeInlineSegment,
    CommitSegment,
    CommitObject,
    AbortObject,
    BeginDeleteObject,
}

/// One segment as returned by `GetObject`, carrying what the download path
/// needs to either read ciphertext straight out of the metadata record or
/// fetch pieces from storage nodes.
#[derive(Debug, Clone)]
pub enum DownloadSegment {
    Inline {
        position: SegmentPosition,
        ciphertext: Vec<u8>,
        plain_size: u64,
        cipher_suite: CipherSuite,
        encrypted_segment_key: Vec<u8>,
        encrypted_segment_key_nonce: [u8; 12],
    },
    Remote {
        position: SegmentPosition,
        plain_size: u64,
        cipher_suite: CipherSuite,
        encrypted_segment_key: Vec<u8>,
        encrypted_segment_key_nonce: [u8; 12],
        required: RequiredThreshold,
        limits: Vec<OrderLimit>,
    },
}

impl DownloadSegment {
    pub fn position(&self) -> SegmentPosition {
        match self {
            Self::Inline { position, .. } | Self::Remote { position, .. } => *position,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ObjectInfo {
    pub stream_id: StreamId,
    pub encrypted_stream_info: Vec<u8>,
    pub encrypted_metadata_key: Vec<u8>,
    pub encrypted_metadata_key_nonce: [u8; 12],
    pub cipher_suite: CipherSuite,
    /// Ordered by `(part_number, index)`, matching commit order.
    pub segments: Vec<DownloadSegment>,
}

/// Opaque paging cursor. Callers never construct or inspect this; it is
/// only ever round-tripped from a page's `next_cursor` back into the next
/// page's request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cursor(pub Option<String>);

#[derive(Debug, Clone)]
pub struct ListBucketsRequest {
    pub cursor: Cursor,
    pub limit: u32,
}

#[derive(Debug, Clone)]
pub struct ListBucketsPage {
    pub names: Vec<String>,
    pub next_cursor: Cursor,
    pub more: bool,
}

#[derive(Debug, Clone)]
pub struct ListObjectsRequest {
    pub bucket: String,
    pub cursor: Cursor,
    pub limit: u32,
}

#[derive(Debug, Clone)]
pub struct ListObjectsPage {
    pub encrypted_paths: Vec<String>,
    pub next_cursor: Cursor,
    pub more: bool,
}

/// The satellite RPC surface. A generic bidirectional RPC client is
/// assumed underneath; this trait is the typed facade over it.
#[async_trait]
pub trait SatelliteMetadataClient: Send + Sync {
    async fn batch(&self, items: Vec<BatchItem>, cancellation: CancellationToken) -> Result<Vec<BatchItemResponse>, UplinkError>;

    async fn begin_segment(
        &self,
        stream_id: &StreamId,
        position: SegmentPosition,
        plain_size: u64,
        cancellation: CancellationToken,
    ) -> Result<(OrderSet, RedundancyScheme), UplinkError>;

    async fn get_object(&self, bucket: &str, encrypted_path: &str, cancellation: CancellationToken) -> Result<ObjectInfo, UplinkError>;

    async fn list_buckets(&self, request: ListBucketsRequest, cancellation: CancellationToken) -> Result<ListBucketsPage, UplinkError>;

    async fn list_objects(&self, request: ListObjectsRequest, cancellation: CancellationToken) -> Result<ListObjectsPage, UplinkError>;
}

/// A typed, lazy sequence over a paged listing. `next()` returns `None`
/// both at exhaustion and on error, and the caller distinguishes the two
/// with [`Self::err`].
pub struct BucketIterator<'a> {
    client: &'a dyn SatelliteMetadataClient,
    page: std::vec::IntoIter<String>,
    cursor: Cursor,
    more: bool,
    started: bool,
    page_limit: u32,
    err: Option<UplinkError>,
}

impl<'a> BucketIterator<'a> {
    pub fn new(client: &'a dyn SatelliteMetadataClient, page_limit: u32) -> Self {
        Self {
            client,
            page: Vec::new().into_iter(),
            cursor: Cursor::default(),
            more: true,
            started: false,
            page_limit,
            err: None,
        }
    }

    pub fn err(&self) -> Option<&UplinkError> {
        self.err.as_ref()
    }

    /// Advances to the next name, fetching a new page lazily on first call
    /// and whenever the current page is exhausted with `more == true`.
    pub async fn next(&mut self, cancellation: CancellationToken) -> Option<String> {
        if self.err.is_some() {
            return None;
        }
        loop {
            if let Some(name) = self.page.next() {
                return Some(name);
            }
            if self.started && !self.more {
                return None;
            }
            self.started = true;
            let request = ListBucketsRequest {
                cursor: self.cursor.clone(),
                limit: self.page_limit,
            };
            match self.client.list_buckets(request, cancellation.clone()).await {
                Ok(page) => {
                    self.more = page.more;
                    self.cursor = page.next_cursor;
                    self.page = page.names.into_iter();
                }
                Err(e) => {
                    self.err = Some(e);
                    return None;
                }
            }
        }
    }
}

/// Same shape as [`BucketIterator`], paging one bucket's objects instead.
/// Each page of `encrypted_paths` the satellite returns is decrypted back
/// into the cleartext key the caller originally uploaded under before
/// being handed out, the same way [`crate::infrastructure::stream_store::StreamStore::download`]
/// decrypts a single object's path.
pub struct ObjectIterator<'a> {
    client: &'a dyn SatelliteMetadataClient,
    kdf: &'a dyn KeyDerivationService,
    path_cipher: &'a dyn PathCipher,
    encryption_store: &'a EncryptionStore,
    disable_object_key_encryption: bool,
    bucket: String,
    page: std::vec::IntoIter<String>,
    cursor: Cursor,
    more: bool,
    started: bool,
    page_limit: u32,
    err: Option<UplinkError>,
}

impl<'a> ObjectIterator<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client: &'a dyn SatelliteMetadataClient,
        kdf: &'a dyn KeyDerivationService,
        path_cipher: &'a dyn PathCipher,
        encryption_store: &'a EncryptionStore,
        disable_object_key_encryption: bool,
        bucket: impl Into<String>,
        page_limit: u32,
    ) -> Self {
        Self {
            client,
            kdf,
            path_cipher,
            encryption_store,
            disable_object_key_encryption,
            bucket: bucket.into(),
            page: Vec::new().into_iter(),
            cursor: Cursor::default(),
            more: true,
            started: false,
            page_limit,
            err: None,
        }
    }

    pub fn err(&self) -> Option<&UplinkError> {
        self.err.as_ref()
    }

    pub async fn next(&mut self, cancellation: CancellationToken) -> Option<String> {
        if self.err.is_some() {
            return None;
        }
        loop {
            if let Some(path) = self.page.next() {
                return Some(path);
            }
            if self.started && !self.more {
                return None;
            }
            self.started = true;
            let request = ListObjectsRequest {
                bucket: self.bucket.clone(),
                cursor: self.cursor.clone(),
                limit: self.page_limit,
            };
            match self.client.list_objects(request, cancellation.clone()).await {
                Ok(page) => {
                    self.more = page.more;
                    self.cursor = page.next_cursor;
                    let hierarchy = KeyHierarchy::new(self.kdf, self.path_cipher);
                    let mut decrypted = Vec::with_capacity(page.encrypted_paths.len());
                    for encrypted_path in page.encrypted_paths {
                        match hierarchy.decrypt_path(self.encryption_store, &self.bucket, &encrypted_path, self.disable_object_key_encryption) {
                            Ok(path) => decrypted.push(path),
                            Err(e) => {
                                self.err = Some(e);
                                return None;
                            }
                        }
                    }
                    self.page = decrypted.into_iter();
                }
                Err(e) => {
                    self.err = Some(e);
                    return None;
                }
            }
        }
    }
}
