// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! A client library for a decentralized, end-to-end-encrypted object
//! storage service.
//!
//! ## Architecture
//!
//! The crate follows the same Clean Architecture / Domain-Driven Design
//! split as the rest of this workspace:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Application Layer                          │
//! │  (Upload / download / list use cases, Project facade)       │
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Domain Layer                             │
//! │  (storx-uplink-domain: key hierarchy, entities, ports)       │
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                Infrastructure Layer                         │
//! │  (Crypto, splitter, piece upload, batching, metadata RPC)   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Core Concepts
//!
//! - A [`project::Project`] owns one passphrase-derived key hierarchy, one
//!   admission-controlled piece upload pipeline, and the metadata/piece-store
//!   clients it was constructed with.
//! - Uploading a stream splits it into segments (inline if the whole object
//!   fits in `maxInlineSize`, otherwise erasure-coded remote segments),
//!   encrypts each under its own fresh key, and batches the resulting
//!   metadata mutations into as few satellite round-trips as possible.
//! - An [`access_grant::AccessGrant`] is the portable, serialized form of a
//!   project's key hierarchy and satellite address, restricted by a
//!   caveat-bearing API key.

pub mod access_grant;
pub mod application;
pub mod infrastructure;
pub mod project;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use storx_uplink_domain::error::{ErrorKind, UplinkError};
pub use storx_uplink_domain::value_objects::{CipherSuite, UploadId};

pub use crate::infrastructure::config::{ProjectConfig, UploadConfig};
pub use crate::infrastructure::stream_store::{DownloadedObject, UploadOptions};
pub use crate::project::Project;
