// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Erasure-codes one remote segment's ciphertext into `N` pieces, uploads
//! each under its satellite-issued order limit with `MaximumConcurrent`
//! admission control, and applies the long-tail cancellation policy so a
//! segment completes as soon as `optimal + longTailMargin` pieces have
//! landed rather than waiting on every straggler.

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use storx_uplink_domain::entities::{OrderSet, PieceUploadState};
use storx_uplink_domain::error::UplinkError;
use storx_uplink_domain::services::{CompletionDecision, CompletionPolicy};
use storx_uplink_domain::value_objects::{LongTailMargin, PieceId};

use crate::infrastructure::erasure_codec::ErasureCodec;
use crate::infrastructure::piece_store_client::{PieceHash, PieceStoreClient};
use crate::infrastructure::scheduler::UploadScheduler;

/// One successfully stored piece, as evidence for the segment's
/// `CommitSegment` batch item.
#[derive(Debug, Clone, Copy)]
pub struct UploadedPiece {
    pub piece_id: PieceId,
    pub hash: PieceHash,
}

pub struct PieceUploader<C, S> {
    codec: C,
    store: S,
    scheduler: UploadScheduler,
    long_tail_margin: LongTailMargin,
}

impl<C: ErasureCodec, S: PieceStoreClient + 'static> PieceUploader<C, S> {
    pub fn new(codec: C, store: S, scheduler: UploadScheduler, long_tail_margin: LongTailMargin) -> Self {
        Self {
            codec,
            store,
            scheduler,
            long_tail_margin,
        }
    }

    /// Uploads one remote segment's ciphertext. Returns the pieces that
    /// landed before the segment was declared complete. Fails with
    /// [`UplinkError::InsufficientPieces`] if every attempt terminates
    /// without `required` successes.
    pub async fn upload_segment(
        &self,
        ciphertext: &[u8],
        orders: &OrderSet,
        cancellation: CancellationToken,
    ) -> Result<Vec<UploadedPiece>, UplinkError>
    where
        S: Clone,
    {
        let total = orders.total_pieces();
        let pieces = self.codec.encode(ciphertext, total)?;
        if pieces.len() != orders.limits.len() {
            return Err(UplinkError::internal(format!(
                "erasure codec returned {} pieces for {} order limits",
                pieces.len(),
                orders.limits.len()
            )));
        }

        let policy = CompletionPolicy {
            required: orders.required,
            optimal: orders.optimal,
            long_tail_margin: self.long_tail_margin,
            total_pieces: total,
        };

        let segment_token = cancellation.child_token();
        let mut states = vec![PieceUploadState::Initial; orders.limits.len()];
        let mut joinset: JoinSet<(usize, Result<UploadedPiece, UplinkError>)> = JoinSet::new();

        for (index, (order_limit, piece_data)) in orders.limits.iter().cloned().zip(pieces.into_iter()).enumerate() {
            states[index] = PieceUploadState::Admitted;
            let store = self.store.clone();
            let scheduler = self.scheduler.clone();
            let token = segment_token.child_token();
            joinset.spawn(async move {
                let outcome = upload_one(store, scheduler, order_limit, piece_data, token).await;
                (index, outcome)
            });
        }

        let mut uploaded = Vec::new();
        let mut successes: u32 = 0;
        let mut terminated: u32 = 0;
        let mut failure: Option<UplinkError> = None;

        while let Some(joined) = joinset.join_next().await {
            let (index, outcome) = joined.map_err(|e| UplinkError::internal(format!("piece upload task panicked: {e}")))?;
            terminated += 1;
            match outcome {
                Ok(piece) => {
                    states[index] = PieceUploadState::Succeeded;
                    successes += 1;
                    uploaded.push(piece);
                }
                Err(e) if matches!(e, UplinkError::Cancelled) => {
                    states[index] = PieceUploadState::Cancelled;
                }
                Err(e) => {
                    states[index] = PieceUploadState::Failed;
                    failure.get_or_insert(e);
                }
            }

            match policy.decide(successes, terminated) {
                CompletionDecision::Continue => {}
                CompletionDecision::CancelStragglers => {
                    segment_token.cancel();
                }
                CompletionDecision::Done => {
                    segment_token.cancel();
                    break;
                }
                CompletionDecision::Failed => {
                    segment_token.cancel();
                    while joinset.join_next().await.is_some() {}
                    return Err(UplinkError::insufficient_pieces(orders.required.get(), successes));
                }
            }
        }

        while joinset.join_next().await.is_some() {}
        Ok(uploaded)
    }
}

async fn upload_one<S: PieceStoreClient>(
    store: S,
    scheduler: UploadScheduler,
    order_limit: storx_uplink_domain::entities::OrderLimit,
    data: Vec<u8>,
    cancellation: CancellationToken,
) -> Result<UploadedPiece, UplinkError> {
    if cancellation.is_cancelled() {
        return Err(UplinkError::Cancelled);
    }
    let _permit = tokio::select! {
        biased;
        _ = cancellation.cancelled() => return Err(UplinkError::Cancelled),
        permit = scheduler.acquire() => permit.map_err(|e| UplinkError::internal(format!("scheduler closed: {e}")))?,
    };

    let piece_id = order_limit.piece_id;
    let hash = tokio::select! {
        biased;
        _ = cancellation.cancelled() => return Err(UplinkError::Cancelled),
        result = store.upload_piece(&order_limit, &data, cancellation.clone()) => result?,
    };
    Ok(UploadedPiece { piece_id, hash })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use storx_uplink_domain::value_objects::{OptimalThreshold, RequiredThreshold};

    struct IdentityCodec;
    impl ErasureCodec for IdentityCodec {
        fn encode(&self, block: &[u8], total_pieces: u32) -> Result<Vec<Vec<u8>>, UplinkError> {
            Ok((0..total_pieces).map(|_| block.to_vec()).collect())
        }
        fn decode(&self, pieces: Vec<(u32, Vec<u8>)>, _required: u32, plain_len: usize) -> Result<Vec<u8>, UplinkError> {
            let mut out = pieces.into_iter().next().map(|(_, d)| d).unwrap_or_default();
            out.truncate(plain_len);
            Ok(out)
        }
    }

    #[derive(Clone)]
    struct CountingStore {
        fail_first_n: Arc<AtomicU32>,
        uploads: Arc<AtomicU32>,
    }

    #[async_trait]
    impl PieceStoreClient for CountingStore {
        async fn upload_piece(
            &self,
            order_limit: &storx_uplink_domain::entities::OrderLimit,
            _data: &[u8],
            _cancellation: CancellationToken,
        ) -> Result<PieceHash, UplinkError> {
            self.uploads.fetch_add(1, Ordering::SeqCst);
            if self.fail_first_n.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| if n > 0 { Some(n - 1) } else { None }).is_ok() {
                return Err(UplinkError::TransientNetwork("synthetic failure".into()));
            }
            Ok(PieceHash([order_limit.piece_id.0 as u8; 32]))
        }

        async fn download_piece(
            &self,
            _order_limit: &storx_uplink_domain::entities::OrderLimit,
            _cancellation: CancellationToken,
        ) -> Result<Vec<u8>, UplinkError> {
            unimplemented!("not exercised by piece_uploader tests")
        }
    }

    fn order_set(total: u32, required: u32, optimal: u32) -> OrderSet {
        OrderSet {
            limits: (0..total)
                .map(|i| storx_uplink_domain::entities::OrderLimit {
                    piece_id: PieceId(i),
                    storage_node_address: format!("node-{i}"),
                    piece_private_key: vec![],
                    signed_limit: vec![],
                })
                .collect(),
            required: RequiredThreshold::new(required),
            optimal: OptimalThreshold::new(optimal),
        }
    }

    #[tokio::test]
    async fn succeeds_when_enough_pieces_land() {
        let uploader = PieceUploader::new(
            IdentityCodec,
            CountingStore { fail_first_n: Arc::new(AtomicU32::new(0)), uploads: Arc::new(AtomicU32::new(0)) },
            UploadScheduler::new(storx_uplink_domain::value_objects::MaximumConcurrent::new(4)),
            LongTailMargin::new(1),
        );
        let orders = order_set(6, 4, 5);
        let result = uploader.upload_segment(b"data", &orders, CancellationToken::new()).await.unwrap();
        assert!(result.len() >= 4);
    }

    #[tokio::test]
    async fn fails_when_too_many_pieces_fail() {
        let store = CountingStore { fail_first_n: Arc::new(AtomicU32::new(10)), uploads: Arc::new(AtomicU32::new(0)) };
        let uploader = PieceUploader::new(
            IdentityCodec,
            store,
            UploadScheduler::new(storx_uplink_domain::value_objects::MaximumConcurrent::new(4)),
            LongTailMargin::new(1),
        );
        let orders = order_set(6, 4, 5);
        let result = uploader.upload_segment(b"data", &orders, CancellationToken::new()).await;
        assert!(matches!(result, Err(UplinkError::InsufficientPieces { .. })));
    }
}
