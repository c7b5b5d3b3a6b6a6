// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! In-memory fakes for the external collaborators the library treats as
//! out of scope: the satellite metadata RPC, the storage-node piece RPC,
//! and the erasure codec. Context-carried test knobs are implemented
//! behind a `testing` Cargo feature, never compiled into a production
//! build.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use storx_uplink_domain::entities::{OrderLimit, OrderSet};
use storx_uplink_domain::error::UplinkError;
use storx_uplink_domain::value_objects::{CipherSuite, OptimalThreshold, PieceId, RequiredThreshold, SegmentPosition, StreamId};

use crate::infrastructure::erasure_codec::ErasureCodec;
use crate::infrastructure::metadata_client::{
    BatchItem, BatchItemResponse, Cursor, DownloadSegment, ListBucketsPage, ListBucketsRequest, ListObjectsPage, ListObjectsRequest,
    ObjectInfo, RedundancyScheme, SatelliteMetadataClient,
};
use crate::infrastructure::piece_store_client::{PieceHash, PieceStoreClient};

/// Replicates the ciphertext block to every piece and reconstructs from
/// whichever one `decode` is handed first; adequate for exercising the
/// upload/download orchestration without a real Reed-Solomon dependency.
#[derive(Debug, Clone, Copy, Default)]
pub struct FakeErasureCodec;

impl ErasureCodec for FakeErasureCodec {
    fn encode(&self, block: &[u8], total_pieces: u32) -> Result<Vec<Vec<u8>>, UplinkError> {
        Ok((0..total_pieces).map(|_| block.to_vec()).collect())
    }

    fn decode(&self, pieces: Vec<(u32, Vec<u8>)>, required: u32, plain_len: usize) -> Result<Vec<u8>, UplinkError> {
        if (pieces.len() as u32) < required {
            return Err(UplinkError::insufficient_pieces(required, pieces.len() as u32));
        }
        let mut data = pieces.into_iter().next().map(|(_, d)| d).unwrap_or_default();
        data.resize(plain_len, 0);
        Ok(data)
    }
}

/// Stores every uploaded piece keyed by its order limit's (fake, test-only
/// unique) storage node address. `Clone` shares the backing map through an
/// `Arc`, matching `Project` cloning its real `S: PieceStoreClient` once per
/// `stream_store()` borrow while every clone still talks to the same nodes.
#[derive(Default, Clone)]
pub struct FakePieceStoreClient {
    pieces: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl FakePieceStoreClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PieceStoreClient for FakePieceStoreClient {
    async fn upload_piece(&self, order_limit: &OrderLimit, data: &[u8], cancellation: CancellationToken) -> Result<PieceHash, UplinkError> {
        if cancellation.is_cancelled() {
            return Err(UplinkError::Cancelled);
        }
        if order_limit.storage_node_address.is_empty() {
            return Err(UplinkError::invalid_argument("missing piece id"));
        }
        let hash = sha256(data);
        self.pieces.lock().unwrap().insert(order_limit.storage_node_address.clone(), data.to_vec());
        Ok(PieceHash(hash))
    }

    async fn download_piece(&self, order_limit: &OrderLimit, cancellation: CancellationToken) -> Result<Vec<u8>, UplinkError> {
        if cancellation.is_cancelled() {
            return Err(UplinkError::Cancelled);
        }
        self.pieces
            .lock()
            .unwrap()
            .get(&order_limit.storage_node_address)
            .cloned()
            .ok_or_else(|| UplinkError::not_found("storage-node", &order_limit.storage_node_address))
    }
}

fn sha256(data: &[u8]) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

#[derive(Clone)]
struct PendingStream {
    bucket: String,
    encrypted_path: String,
    cipher_suite: CipherSuite,
    encrypted_metadata_key: Vec<u8>,
    encrypted_metadata_key_nonce: [u8; 12],
    segments: Vec<DownloadSegment>,
}

/// In-memory fake of the satellite RPC surface. Every remote segment is
/// issued a fixed redundancy scheme (`required`/`optimal`/`total`),
/// configurable at construction.
pub struct FakeMetadataClient {
    required: RequiredThreshold,
    optimal: OptimalThreshold,
    total: u32,
    page_limit_override: Option<u32>,
    next_stream_id: AtomicU64,
    buckets: Mutex<BTreeSet<String>>,
    objects: Mutex<HashMap<(String, String), ObjectInfo>>,
    pending: Mutex<HashMap<Vec<u8>, PendingStream>>,
    issued_orders: Mutex<HashMap<(Vec<u8>, SegmentPosition), Vec<OrderLimit>>>,
}

impl FakeMetadataClient {
    pub fn new(required: u32, optimal: u32, total: u32) -> Self {
        Self {
            required: RequiredThreshold::new(required),
            optimal: OptimalThreshold::new(optimal),
            total,
            page_limit_override: None,
            next_stream_id: AtomicU64::new(1),
            buckets: Mutex::new(BTreeSet::new()),
            objects: Mutex::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
            issued_orders: Mutex::new(HashMap::new()),
        }
    }

    /// Context-carried test knob overriding the server-side page size,
    /// via an explicit test-only builder rather than ambient context.
    pub fn with_page_limit_override(mut self, limit: u32) -> Self {
        self.page_limit_override = Some(limit);
        self
    }

    fn effective_limit(&self, requested: u32) -> u32 {
        self.page_limit_override.unwrap_or(requested).max(1)
    }
}

impl Default for FakeMetadataClient {
    fn default() -> Self {
        Self::new(4, 5, 6)
    }
}

#[async_trait]
impl SatelliteMetadataClient for FakeMetadataClient {
    async fn batch(&self, items: Vec<BatchItem>, cancellation: CancellationToken) -> Result<Vec<BatchItemResponse>, UplinkError> {
        if cancellation.is_cancelled() {
            return Err(UplinkError::Cancelled);
        }
        let mut responses = Vec::with_capacity(items.len());
        for item in items {
            responses.push(self.apply(item)?);
        }
        Ok(responses)
    }

    async fn begin_segment(
        &self,
        stream_id: &StreamId,
        position: SegmentPosition,
        _plain_size: u64,
        cancellation: CancellationToken,
    ) -> Result<(OrderSet, RedundancyScheme), UplinkError> {
        if cancellation.is_cancelled() {
            return Err(UplinkError::Cancelled);
        }
        let limits: Vec<OrderLimit> = (0..self.total)
            .map(|i| OrderLimit {
                piece_id: PieceId(i),
                storage_node_address: format!("node-{}-{}-{}-{i}", hex::encode(stream_id.as_bytes()), position.part_number, position.index),
                piece_private_key: vec![],
                signed_limit: vec![],
            })
            .collect();
        self.issued_orders
            .lock()
            .unwrap()
            .insert((stream_id.as_bytes().to_vec(), position), limits.clone());
        let orders = OrderSet {
            limits,
            required: self.required,
            optimal: self.optimal,
        };
        let scheme = RedundancyScheme {
            required: self.required.get(),
            optimal: self.optimal.get(),
            total: self.total,
        };
        Ok((orders, scheme))
    }

    async fn get_object(&self, bucket: &str, encrypted_path: &str, cancellation: CancellationToken) -> Result<ObjectInfo, UplinkError> {
        if cancellation.is_cancelled() {
            return Err(UplinkError::Cancelled);
        }
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), encrypted_path.to_string()))
            .cloned()
            .ok_or_else(|| UplinkError::not_found(bucket, encrypted_path))
    }

    async fn list_buckets(&self, request: ListBucketsRequest, cancellation: CancellationToken) -> Result<ListBucketsPage, UplinkError> {
        if cancellation.is_cancelled() {
            return Err(UplinkError::Cancelled);
        }
        let names: Vec<String> = self.buckets.lock().unwrap().iter().cloned().collect();
        Ok(page(&names, &request.cursor, self.effective_limit(request.limit), |n| n.clone()).into_buckets_page())
    }

    async fn list_objects(&self, request: ListObjectsRequest, cancellation: CancellationToken) -> Result<ListObjectsPage, UplinkError> {
        if cancellation.is_cancelled() {
            return Err(UplinkError::Cancelled);
        }
        let mut paths: Vec<String> = self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(bucket, _)| *bucket == request.bucket)
            .map(|(_, path)| path.clone())
            .collect();
        paths.sort();
        Ok(page(&paths, &request.cursor, self.effective_limit(request.limit), |p| p.clone()).into_objects_page())
    }
}

impl FakeMetadataClient {
    fn apply(&self, item: BatchItem) -> Result<BatchItemResponse, UplinkError> {
        match item {
            BatchItem::BeginObject {
                bucket,
                encrypted_path,
                cipher_suite,
                encrypted_metadata_key,
                encrypted_metadata_key_nonce,
                expires_unix_secs: _,
            } => {
                self.buckets.lock().unwrap().insert(bucket.clone());
                let id = self.next_stream_id.fetch_add(1, Ordering::SeqCst);
                let stream_id = StreamId::from_bytes(id.to_be_bytes().to_vec());
                self.pending.lock().unwrap().insert(
                    stream_id.as_bytes().to_vec(),
                    PendingStream {
                        bucket,
                        encrypted_path,
                        cipher_suite,
                        encrypted_metadata_key,
                        encrypted_metadata_key_nonce,
                        segments: Vec::new(),
                    },
                );
                Ok(BatchItemResponse::BeginObject { stream_id })
            }
            BatchItem::MakeInlineSegment {
                stream_id,
                position,
                ciphertext,
                plain_size,
                cipher_suite,
                encrypted_segment_key,
                encrypted_segment_key_nonce,
            } => {
                let mut pending = self.pending.lock().unwrap();
                let stream = pending
                    .get_mut(stream_id.as_bytes())
                    .ok_or_else(|| UplinkError::internal("MakeInlineSegment for unknown stream id"))?;
                stream.segments.push(DownloadSegment::Inline {
                    position,
                    ciphertext,
                    plain_size,
                    cipher_suite,
                    encrypted_segment_key,
                    encrypted_segment_key_nonce,
                });
                Ok(BatchItemResponse::MakeInlineSegment)
            }
            BatchItem::CommitSegment {
                stream_id,
                position,
                piece_hashes: _,
                plain_size,
                cipher_suite,
                encrypted_segment_key,
                encrypted_segment_key_nonce,
                encrypted_tag: _,
            } => {
                let limits = self
                    .issued_orders
                    .lock()
                    .unwrap()
                    .remove(&(stream_id.as_bytes().to_vec(), position))
                    .ok_or_else(|| UplinkError::internal("CommitSegment for a position with no issued orders"))?;
                let mut pending = self.pending.lock().unwrap();
                let stream = pending
                    .get_mut(stream_id.as_bytes())
                    .ok_or_else(|| UplinkError::internal("CommitSegment for unknown stream id"))?;
                stream.segments.push(DownloadSegment::Remote {
                    position,
                    plain_size,
                    cipher_suite,
                    encrypted_segment_key,
                    encrypted_segment_key_nonce,
                    required: self.required,
                    limits,
                });
                Ok(BatchItemResponse::CommitSegment)
            }
            BatchItem::CommitObject { stream_id, encrypted_stream_info } => {
                let stream = self
                    .pending
                    .lock()
                    .unwrap()
                    .remove(stream_id.as_bytes())
                    .ok_or_else(|| UplinkError::internal("CommitObject for unknown stream id"))?;
                let info = ObjectInfo {
                    stream_id,
                    encrypted_stream_info,
                    encrypted_metadata_key: stream.encrypted_metadata_key,
                    encrypted_metadata_key_nonce: stream.encrypted_metadata_key_nonce,
                    cipher_suite: stream.cipher_suite,
                    segments: stream.segments,
                };
                self.objects.lock().unwrap().insert((stream.bucket, stream.encrypted_path), info);
                Ok(BatchItemResponse::CommitObject)
            }
            BatchItem::AbortObject { stream_id } => {
                self.pending.lock().unwrap().remove(stream_id.as_bytes());
                Ok(BatchItemResponse::AbortObject)
            }
            BatchItem::BeginDeleteObject { bucket, encrypted_path } => {
                self.objects.lock().unwrap().remove(&(bucket, encrypted_path));
                Ok(BatchItemResponse::BeginDeleteObject)
            }
        }
    }
}

struct Page<T> {
    items: Vec<T>,
    next_cursor: Cursor,
    more: bool,
}

impl Page<String> {
    fn into_buckets_page(self) -> ListBucketsPage {
        ListBucketsPage { names: self.items, next_cursor: self.next_cursor, more: self.more }
    }

    fn into_objects_page(self) -> ListObjectsPage {
        ListObjectsPage { encrypted_paths: self.items, next_cursor: self.next_cursor, more: self.more }
    }
}

/// Pages `all` starting strictly after `cursor`, returning at most `limit`
/// items and the cursor for the next page.
fn page<T, F: Fn(&T) -> String>(all: &[T], cursor: &Cursor, limit: u32, key_of: F) -> Page<String>
where
    T: Clone,
{
    let start = match &cursor.0 {
        None => 0,
        Some(after) => all.iter().position(|item| &key_of(item) == after).map(|i| i + 1).unwrap_or(all.len()),
    };
    let end = (start + limit as usize).min(all.len());
    let items: Vec<String> = all[start..end].iter().map(key_of).collect();
    let more = end < all.len();
    let next_cursor = if more { Cursor(items.last().cloned()) } else { Cursor(None) };
    Page { items, next_cursor, more }
}
