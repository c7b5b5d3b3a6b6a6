// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The storage-node RPC surface: a bidirectional piece upload stream
//! carrying an order limit, signed piece-private-key material, streamed
//! ciphertext, and a final piece-hash response. The concrete transport is
//! out of scope; this is the trait the piece uploader is written against.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use storx_uplink_domain::entities::OrderLimit;
use storx_uplink_domain::error::UplinkError;

/// The SHA-256 digest of a successfully stored piece: the commit evidence
/// a [`PieceStoreClient::upload_piece`] call returns on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceHash(pub [u8; 32]);

#[async_trait]
pub trait PieceStoreClient: Send + Sync {
    /// Uploads one erasure-coded piece under the authorization carried by
    /// `order_limit`. Cancellation closes the stream and returns before
    /// this future resolves to `Err(UplinkError::Cancelled)`; ongoing AEAD
    /// work upstream is not interrupted mid-block but the transfer itself
    /// observes cancellation between chunks.
    async fn upload_piece(&self, order_limit: &OrderLimit, data: &[u8], cancellation: CancellationToken) -> Result<PieceHash, UplinkError>;

    /// Downloads one piece for reconstruction.
    async fn download_piece(&self, order_limit: &OrderLimit, cancellation: CancellationToken) -> Result<Vec<u8>, UplinkError>;
}
