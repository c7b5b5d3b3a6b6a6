// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The erasure codec is an explicit external collaborator: a black-box
//! Reed-Solomon encoder exposing `encode(block) -> [pieces]`. This module
//! only declares the seam the piece uploader needs; production callers
//! supply a real Reed-Solomon implementation when constructing a
//! [`crate::project::Project`].

use storx_uplink_domain::error::UplinkError;

/// Port for the erasure codec. `encode` fans one ciphertext block out to
/// `total_pieces` shards; `decode` reconstructs the original block from any
/// `required` of them.
pub trait ErasureCodec: Send + Sync {
    fn encode(&self, block: &[u8], total_pieces: u32) -> Result<Vec<Vec<u8>>, UplinkError>;
    fn decode(&self, pieces: Vec<(u32, Vec<u8>)>, required: u32, plain_len: usize) -> Result<Vec<u8>, UplinkError>;
}
