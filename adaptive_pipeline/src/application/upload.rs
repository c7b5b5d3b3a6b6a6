// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Upload use case: hands a reader to the project's [`StreamStore`] and
//! returns the resulting [`UploadId`].

use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use storx_uplink_domain::error::UplinkError;
use storx_uplink_domain::value_objects::UploadId;

use crate::infrastructure::erasure_codec::ErasureCodec;
use crate::infrastructure::metadata_client::SatelliteMetadataClient;
use crate::infrastructure::piece_store_client::PieceStoreClient;
use crate::infrastructure::stream_store::UploadOptions;
use crate::project::Project;

pub struct UploadObject<'a, M, C, S>
where
    M: SatelliteMetadataClient,
    C: ErasureCodec + Clone,
    S: PieceStoreClient + Clone + 'static,
{
    project: &'a Project<M, C, S>,
}

impl<'a, M, C, S> UploadObject<'a, M, C, S>
where
    M: SatelliteMetadataClient,
    C: ErasureCodec + Clone,
    S: PieceStoreClient + Clone + 'static,
{
    pub fn new(project: &'a Project<M, C, S>) -> Self {
        Self { project }
    }

    #[instrument(skip(self, reader, cancellation), fields(bucket, key))]
    pub async fn execute<R: AsyncRead + Unpin>(
        &self,
        bucket: &str,
        key: &str,
        options: UploadOptions,
        reader: R,
        cancellation: CancellationToken,
    ) -> Result<UploadId, UplinkError> {
        self.project.stream_store().upload(bucket, key, options, reader, cancellation).await
    }
}
