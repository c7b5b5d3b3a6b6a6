// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Uplink Domain
//!
//! Pure business logic for the storx uplink client. This crate implements
//! Domain-Driven Design patterns and is independent of any RPC transport,
//! erasure codec, or I/O runtime — those are infrastructure concerns that
//! implement the ports declared here.
//!
//! ## Module Structure
//!
//! - [`value_objects`]: immutable, self-validating types (`Key`, `BucketName`,
//!   `ObjectKey`, `SegmentPosition`, `StreamId`/`UploadId`, the redundancy
//!   thresholds).
//! - [`entities`]: objects with identity and lifecycle (`EncryptionStore`,
//!   `OrderSet`, `PieceUploadState`, `Segment`, `StreamMeta`).
//! - [`services`]: stateless domain services over ports (`KeyHierarchy`,
//!   `CompletionPolicy`, `BackoffSchedule`).
//! - [`aggregates`]: consistency boundaries (`UploadAggregate`).
//! - [`error`]: the single [`error::UplinkError`] taxonomy shared by every
//!   layer.
//!
//! ## Business Rules and Invariants
//!
//! - A remote segment's encrypted payload size is `ceil(plain / blockSize) *
//!   blockSize`.
//! - At most one concurrent upload per `StreamID` holds the commit lock.
//! - A segment's nonce is unique across all segments ever encrypted under the
//!   same content key, enforced by strict `(PartNumber, Index)` monotonicity.
//! - A piece upload's state machine is monotonic; `Cancelled` is reachable
//!   only from `Admitted` or `Streaming`.
//! - `R <= O <= N` for every segment's redundancy scheme.

pub mod aggregates;
pub mod entities;
pub mod error;
pub mod services;
pub mod value_objects;

pub use aggregates::UploadAggregate;
pub use entities::{EncryptionStore, OrderLimit, OrderSet, PieceUploadState, Segment, SegmentInfo, StreamInfo, StreamMeta};
pub use error::{ErrorKind, UplinkError};
pub use services::{BackoffSchedule, CompletionDecision, CompletionPolicy, KeyDerivationService, KeyHierarchy, PathCipher};
pub use value_objects::{
    BucketName, CipherSuite, Key, LongTailMargin, MaxInlineSize, MaximumConcurrent, ObjectKey, OptimalThreshold, PieceId,
    RequiredThreshold, SegmentPosition, SegmentSize, StreamId, UploadId,
};
