// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use crate::error::UplinkError;

const UPLOAD_ID_VERSION: u8 = 1;

/// Opaque satellite-issued handle for an in-progress or committed object.
/// Treated as an uninterpreted byte string by everything except the
/// satellite.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamId(Vec<u8>);

impl StreamId {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The user-facing `UploadID`: `base58(version=1 || StreamID)`.
    pub fn to_upload_id(&self) -> UploadId {
        let mut framed = Vec::with_capacity(1 + self.0.len());
        framed.push(UPLOAD_ID_VERSION);
        framed.extend_from_slice(&self.0);
        UploadId(bs58::encode(framed).into_string())
    }
}

/// The base58-encoded, version-tagged form of a [`StreamId`] handed to
/// callers as a multipart upload handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadId(String);

impl UploadId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn parse(encoded: &str) -> Result<StreamId, UplinkError> {
        let framed = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| UplinkError::invalid_argument(format!("malformed upload id: {e}")))?;
        match framed.split_first() {
            Some((&UPLOAD_ID_VERSION, rest)) => Ok(StreamId::from_bytes(rest.to_vec())),
            Some((other, _)) => Err(UplinkError::invalid_argument(format!("unsupported upload id version {other}"))),
            None => Err(UplinkError::invalid_argument("empty upload id")),
        }
    }
}
