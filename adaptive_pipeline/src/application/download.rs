// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Download use case: the inverse of [`crate::application::upload`].

use tokio_util::sync::CancellationToken;
use tracing::instrument;

use storx_uplink_domain::error::UplinkError;

use crate::infrastructure::erasure_codec::ErasureCodec;
use crate::infrastructure::metadata_client::SatelliteMetadataClient;
use crate::infrastructure::piece_store_client::PieceStoreClient;
use crate::infrastructure::stream_store::DownloadedObject;
use crate::project::Project;

pub struct DownloadObject<'a, M, C, S>
where
    M: SatelliteMetadataClient,
    C: ErasureCodec + Clone,
    S: PieceStoreClient + Clone + 'static,
{
    project: &'a Project<M, C, S>,
}

impl<'a, M, C, S> DownloadObject<'a, M, C, S>
where
    M: SatelliteMetadataClient,
    C: ErasureCodec + Clone,
    S: PieceStoreClient + Clone + 'static,
{
    pub fn new(project: &'a Project<M, C, S>) -> Self {
        Self { project }
    }

    #[instrument(skip(self, cancellation), fields(bucket, key))]
    pub async fn execute(&self, bucket: &str, key: &str, cancellation: CancellationToken) -> Result<DownloadedObject, UplinkError> {
        self.project.stream_store().download(bucket, key, cancellation).await
    }
}
