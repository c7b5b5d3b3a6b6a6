// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Paged listing use cases, thin wrappers over
//! [`crate::infrastructure::metadata_client::BucketIterator`]/`ObjectIterator`.

use crate::infrastructure::erasure_codec::ErasureCodec;
use crate::infrastructure::metadata_client::{BucketIterator, ObjectIterator, SatelliteMetadataClient};
use crate::infrastructure::piece_store_client::PieceStoreClient;
use crate::project::Project;

pub struct ListBuckets<'a, M, C, S>
where
    M: SatelliteMetadataClient,
    C: ErasureCodec + Clone,
    S: PieceStoreClient + Clone + 'static,
{
    project: &'a Project<M, C, S>,
}

impl<'a, M, C, S> ListBuckets<'a, M, C, S>
where
    M: SatelliteMetadataClient,
    C: ErasureCodec + Clone,
    S: PieceStoreClient + Clone + 'static,
{
    pub fn new(project: &'a Project<M, C, S>) -> Self {
        Self { project }
    }

    pub fn execute(&self, page_limit: u32) -> BucketIterator<'a> {
        self.project.list_buckets(page_limit)
    }
}

pub struct ListObjects<'a, M, C, S>
where
    M: SatelliteMetadataClient,
    C: ErasureCodec + Clone,
    S: PieceStoreClient + Clone + 'static,
{
    project: &'a Project<M, C, S>,
}

impl<'a, M, C, S> ListObjects<'a, M, C, S>
where
    M: SatelliteMetadataClient,
    C: ErasureCodec + Clone,
    S: PieceStoreClient + Clone + 'static,
{
    pub fn new(project: &'a Project<M, C, S>) -> Self {
        Self { project }
    }

    pub fn execute(&self, bucket: impl Into<String>, page_limit: u32) -> ObjectIterator<'a> {
        self.project.list_objects(bucket, page_limit)
    }
}
