// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Immutable, self-validating value types shared across the uplink domain.

mod bucket_name;
mod cipher_suite;
mod key;
mod object_key;
mod piece_id;
mod segment_position;
mod segment_size;
mod stream_id;
mod thresholds;

pub use bucket_name::BucketName;
pub use cipher_suite::CipherSuite;
pub use key::Key;
pub use object_key::ObjectKey;
pub use piece_id::PieceId;
pub use segment_position::SegmentPosition;
pub use segment_size::{MaxInlineSize, SegmentSize};
pub use stream_id::{StreamId, UploadId};
pub use thresholds::{LongTailMargin, MaximumConcurrent, OptimalThreshold, RequiredThreshold};
