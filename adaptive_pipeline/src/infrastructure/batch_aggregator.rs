// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Coalesces metadata mutations into a single `Batch` RPC. A typical upload
//! schedules `BeginObject`, one `MakeInlineSegment`/implicit remote-segment
//! commit per segment, and a final `CommitObject`, flushed as one or two
//! round-trips instead of one per item.

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use storx_uplink_domain::error::UplinkError;

use crate::infrastructure::metadata_client::{BatchItem, BatchItemResponse, SatelliteMetadataClient};

/// Per-upload batching of [`BatchItem`]s. Never performs I/O from
/// [`Self::schedule`]; only [`Self::flush`] and
/// [`Self::schedule_and_flush`] talk to the satellite.
pub struct BatchAggregator<'a> {
    client: &'a dyn SatelliteMetadataClient,
    pending: Mutex<Vec<BatchItem>>,
}

impl<'a> BatchAggregator<'a> {
    pub fn new(client: &'a dyn SatelliteMetadataClient) -> Self {
        Self {
            client,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Appends `item` to the pending batch. Never blocks on I/O — the only
    /// contention is with another in-flight [`Self::flush`]/
    /// [`Self::schedule_and_flush`] holding the same lock.
    pub async fn schedule(&self, item: BatchItem) {
        self.pending.lock().await.push(item);
    }

    /// Drains the pending list and issues one `Batch` RPC. The lock is held
    /// for the whole call, across the RPC itself, not just while draining
    /// the list: a second concurrent `flush` must wait for this one to
    /// finish rather than racing it and double-sending (or dropping) items.
    /// Draining the list before making the call (rather than after) still
    /// means anything scheduled while the RPC is in flight lands in the
    /// next batch once this lock is released, not silently merged into the
    /// one currently being sent.
    pub async fn flush(&self, cancellation: CancellationToken) -> Result<Vec<BatchItemResponse>, UplinkError> {
        let mut guard = self.pending.lock().await;
        let items = std::mem::take(&mut *guard);
        if items.is_empty() {
            return Ok(Vec::new());
        }
        self.client.batch(items, cancellation).await
    }

    /// Appends `item` and flushes atomically, returning that item's
    /// response specifically. Any other items already pending are flushed
    /// in the same call and their responses discarded by the caller's
    /// perspective on this method, but still delivered in-order within the
    /// returned vector's last element. The append and the flush share one
    /// lock acquisition, so no other caller can interleave a flush between
    /// this item being appended and it being drained.
    pub async fn schedule_and_flush(&self, item: BatchItem, cancellation: CancellationToken) -> Result<BatchItemResponse, UplinkError> {
        let mut guard = self.pending.lock().await;
        guard.push(item);
        let items = std::mem::take(&mut *guard);
        let mut responses = self.client.batch(items, cancellation).await?;
        responses
            .pop()
            .ok_or_else(|| UplinkError::internal("batch flush returned no response for the scheduled item"))
    }

    pub async fn pending_len(&self) -> usize {
        self.pending.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    use crate::infrastructure::metadata_client::{
        ListBucketsPage, ListBucketsRequest, ListObjectsPage, ListObjectsRequest, ObjectInfo, RedundancyScheme,
    };
    use storx_uplink_domain::entities::OrderSet;
    use storx_uplink_domain::value_objects::{SegmentPosition, StreamId};

    struct RecordingClient {
        calls: AtomicUsize,
        batches: StdMutex<Vec<Vec<BatchItem>>>,
    }

    #[async_trait]
    impl SatelliteMetadataClient for RecordingClient {
        async fn batch(&self, items: Vec<BatchItem>, _cancellation: CancellationToken) -> Result<Vec<BatchItemResponse>, UplinkError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let responses = items
                .iter()
                .map(|item| match item {
                    BatchItem::BeginObject { .. } => BatchItemResponse::BeginObject { stream_id: StreamId::from_bytes(vec![1, 2, 3]) },
                    BatchItem::MakeInlineSegment { .. } => BatchItemResponse::MakeInlineSegment,
                    BatchItem::CommitSegment { .. } => BatchItemResponse::CommitSegment,
                    BatchItem::CommitObject { .. } => BatchItemResponse::CommitObject,
                    BatchItem::AbortObject { .. } => BatchItemResponse::AbortObject,
                    BatchItem::BeginDeleteObject { .. } => BatchItemResponse::BeginDeleteObject,
                })
                .collect();
            self.batches.lock().unwrap().push(items);
            Ok(responses)
        }

        async fn begin_segment(
            &self,
            _stream_id: &StreamId,
            _position: SegmentPosition,
            _plain_size: u64,
            _cancellation: CancellationToken,
        ) -> Result<(OrderSet, RedundancyScheme), UplinkError> {
            unimplemented!("not exercised by batch aggregator tests")
        }

        async fn get_object(&self, _bucket: &str, _encrypted_path: &str, _cancellation: CancellationToken) -> Result<ObjectInfo, UplinkError> {
            unimplemented!("not exercised by batch aggregator tests")
        }

        async fn list_buckets(&self, _request: ListBucketsRequest, _cancellation: CancellationToken) -> Result<ListBucketsPage, UplinkError> {
            unimplemented!("not exercised by batch aggregator tests")
        }

        async fn list_objects(&self, _request: ListObjectsRequest, _cancellation: CancellationToken) -> Result<ListObjectsPage, UplinkError> {
            unimplemented!("not exercised by batch aggregator tests")
        }
    }

    fn abort(n: u8) -> BatchItem {
        BatchItem::AbortObject {
            stream_id: StreamId::from_bytes(vec![n]),
        }
    }

    #[tokio::test]
    async fn schedule_never_calls_the_client() {
        let client = RecordingClient { calls: AtomicUsize::new(0), batches: StdMutex::new(Vec::new()) };
        let aggregator = BatchAggregator::new(&client);
        aggregator.schedule(abort(1)).await;
        aggregator.schedule(abort(2)).await;
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
        assert_eq!(aggregator.pending_len().await, 2);
    }

    #[tokio::test]
    async fn flush_issues_one_batch_call_and_clears_the_list() {
        let client = RecordingClient { calls: AtomicUsize::new(0), batches: StdMutex::new(Vec::new()) };
        let aggregator = BatchAggregator::new(&client);
        aggregator.schedule(abort(1)).await;
        aggregator.schedule(abort(2)).await;
        aggregator.schedule(abort(3)).await;

        let responses = aggregator.flush(CancellationToken::new()).await.unwrap();
        assert_eq!(responses.len(), 3);
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
        assert_eq!(aggregator.pending_len().await, 0);

        let second = aggregator.flush(CancellationToken::new()).await.unwrap();
        assert!(second.is_empty());
        assert_eq!(client.calls.load(Ordering::SeqCst), 1, "empty flush must not issue an RPC");
    }

    #[tokio::test]
    async fn schedule_and_flush_returns_the_appended_items_response() {
        let client = RecordingClient { calls: AtomicUsize::new(0), batches: StdMutex::new(Vec::new()) };
        let aggregator = BatchAggregator::new(&client);
        aggregator.schedule(abort(1)).await;
        let response = aggregator.schedule_and_flush(abort(2), CancellationToken::new()).await.unwrap();
        assert!(matches!(response, BatchItemResponse::AbortObject));
        let batches = client.batches.lock().unwrap();
        assert_eq!(batches[0].len(), 2, "both the pre-scheduled and appended items flush together");
    }

    #[tokio::test]
    async fn preserves_schedule_order() {
        let client = RecordingClient { calls: AtomicUsize::new(0), batches: StdMutex::new(Vec::new()) };
        let aggregator = BatchAggregator::new(&client);
        for n in 0..5u8 {
            aggregator.schedule(abort(n)).await;
        }
        aggregator.flush(CancellationToken::new()).await.unwrap();
        let batches = client.batches.lock().unwrap();
        let ids: Vec<u8> = batches[0]
            .iter()
            .map(|item| match item {
                BatchItem::AbortObject { stream_id } => stream_id.as_bytes()[0],
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    /// A client whose first `batch` call parks on a `Notify` until the test
    /// releases it, so a concurrent second `flush` can be observed blocking
    /// on the aggregator's lock rather than racing ahead.
    struct GatedClient {
        calls: AtomicUsize,
        gate: tokio::sync::Notify,
    }

    #[async_trait]
    impl SatelliteMetadataClient for GatedClient {
        async fn batch(&self, items: Vec<BatchItem>, _cancellation: CancellationToken) -> Result<Vec<BatchItemResponse>, UplinkError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                self.gate.notified().await;
            }
            Ok(items.iter().map(|_| BatchItemResponse::AbortObject).collect())
        }

        async fn begin_segment(
            &self,
            _stream_id: &StreamId,
            _position: SegmentPosition,
            _plain_size: u64,
            _cancellation: CancellationToken,
        ) -> Result<(OrderSet, RedundancyScheme), UplinkError> {
            unimplemented!("not exercised by batch aggregator tests")
        }

        async fn get_object(&self, _bucket: &str, _encrypted_path: &str, _cancellation: CancellationToken) -> Result<ObjectInfo, UplinkError> {
            unimplemented!("not exercised by batch aggregator tests")
        }

        async fn list_buckets(&self, _request: ListBucketsRequest, _cancellation: CancellationToken) -> Result<ListBucketsPage, UplinkError> {
            unimplemented!("not exercised by batch aggregator tests")
        }

        async fn list_objects(&self, _request: ListObjectsRequest, _cancellation: CancellationToken) -> Result<ListObjectsPage, UplinkError> {
            unimplemented!("not exercised by batch aggregator tests")
        }
    }

    #[tokio::test]
    async fn a_second_flush_waits_for_the_first_in_flight_rpc() {
        let client = GatedClient { calls: AtomicUsize::new(0), gate: tokio::sync::Notify::new() };
        let aggregator = BatchAggregator::new(&client);
        let events: StdMutex<Vec<&'static str>> = StdMutex::new(Vec::new());

        aggregator.schedule(abort(1)).await;

        let first = aggregator.flush(CancellationToken::new());

        let second = async {
            // Let `first` grab the pending-list lock and park inside the
            // gated RPC before this tries to schedule and flush.
            tokio::task::yield_now().await;
            aggregator.schedule(abort(2)).await;
            events.lock().unwrap().push("second-schedule-returned");
            aggregator.flush(CancellationToken::new()).await
        };

        let opener = async {
            tokio::task::yield_now().await;
            tokio::task::yield_now().await;
            events.lock().unwrap().push("gate-opened");
            client.gate.notify_one();
        };

        let (first_result, second_result, _) = tokio::join!(first, second, opener);
        first_result.unwrap();
        second_result.unwrap();

        // `second`'s `schedule` can only return once `first` has released
        // the lock, which only happens after the gate opens and its RPC
        // returns — so the gate must open first.
        assert_eq!(*events.lock().unwrap(), vec!["gate-opened", "second-schedule-returned"]);
    }
}
