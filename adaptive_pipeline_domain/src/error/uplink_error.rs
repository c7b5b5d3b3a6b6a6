// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use std::fmt;

use thiserror::Error;

/// Coarse-grained classification of an [`UplinkError`], independent of which
/// variant produced it. Retry policy and metrics both key off this rather
/// than matching on `UplinkError` variants directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    Auth,
    NotFound,
    AlreadyExists,
    TransientNetwork,
    TransientSatellite,
    Crypto,
    InsufficientPieces,
    Cancelled,
    Internal,
}

/// Domain-specific errors for the uplink client.
///
/// Each variant that can be attributed to an object operation carries the
/// `bucket`/`key` it was operating on so callers don't lose that context
/// bubbling an error up through several layers.
#[derive(Error, Debug, Clone)]
pub enum UplinkError {
    #[error("invalid argument{}: {message}", location(bucket, key))]
    InvalidArgument {
        message: String,
        bucket: Option<String>,
        key: Option<String>,
    },

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("not found{}", location(bucket, key))]
    NotFound {
        bucket: Option<String>,
        key: Option<String>,
    },

    #[error("already exists{}", location(bucket, key))]
    AlreadyExists {
        bucket: Option<String>,
        key: Option<String>,
    },

    #[error("transient network error: {0}")]
    TransientNetwork(String),

    #[error("transient satellite error: {0}")]
    TransientSatellite(String),

    #[error("cryptographic failure: {0}")]
    Crypto(String),

    #[error("insufficient pieces: needed {required}, got {succeeded}{}", location(bucket, key))]
    InsufficientPieces {
        required: u32,
        succeeded: u32,
        bucket: Option<String>,
        key: Option<String>,
    },

    #[error("cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

/// Formats an optional `(bucket, key)` pair as `" (bucket=.., key=..)"`, or
/// the empty string if both are absent. Kept free-standing so every
/// `#[error(...)]` format string above can call it the same way.
fn location(bucket: &Option<String>, key: &Option<String>) -> String {
    match (bucket, key) {
        (Some(b), Some(k)) => format!(" (bucket={b}, key={k})"),
        (Some(b), None) => format!(" (bucket={b})"),
        (None, Some(k)) => format!(" (key={k})"),
        (None, None) => String::new(),
    }
}

impl UplinkError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
            bucket: None,
            key: None,
        }
    }

    pub fn no_bucket() -> Self {
        Self::invalid_argument("bucket name must not be empty")
    }

    pub fn no_path() -> Self {
        Self::invalid_argument("object key must not be empty")
    }

    pub fn not_found(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            bucket: Some(bucket.into()),
            key: Some(key.into()),
        }
    }

    pub fn crypto(message: impl Into<String>) -> Self {
        Self::Crypto(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn insufficient_pieces(required: u32, succeeded: u32) -> Self {
        Self::InsufficientPieces {
            required,
            succeeded,
            bucket: None,
            key: None,
        }
    }

    /// Attaches `bucket`/`key` context to the variants that carry it,
    /// leaving variants with no such field (e.g. `Crypto`, `Cancelled`)
    /// unchanged. Used at call sites that know the object identity but
    /// received an error from a layer that doesn't.
    pub fn with_location(mut self, bucket: impl Into<String>, key: impl Into<String>) -> Self {
        let (b, k) = (Some(bucket.into()), Some(key.into()));
        match &mut self {
            Self::InvalidArgument { bucket, key, .. }
            | Self::NotFound { bucket, key }
            | Self::AlreadyExists { bucket, key }
            | Self::InsufficientPieces { bucket, key, .. } => {
                *bucket = b;
                *key = k;
            }
            _ => {}
        }
        self
    }

    /// Combines a primary error with a secondary one encountered while
    /// trying to clean up after the first (e.g. `AbortObject` failing after
    /// an upload already failed). Never discards either error.
    pub fn combine(primary: Self, secondary: Self) -> Self {
        Self::Internal(format!("{primary} (during cleanup: {secondary})"))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::Auth(_) => ErrorKind::Auth,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::TransientNetwork(_) => ErrorKind::TransientNetwork,
            Self::TransientSatellite(_) => ErrorKind::TransientSatellite,
            Self::Crypto(_) => ErrorKind::Crypto,
            Self::InsufficientPieces { .. } => ErrorKind::InsufficientPieces,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether `with_retry` should attempt this error again.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::TransientNetwork | ErrorKind::TransientSatellite)
    }
}

impl From<std::io::Error> for UplinkError {
    /// Segment sources and piece-store streams are generic `AsyncRead`/`AsyncWrite`
    /// implementations; any I/O failure surfacing from them has no bucket/key
    /// context of its own, so it lands here and callers attach location via
    /// [`UplinkError::with_location`] if they have it.
    fn from(err: std::io::Error) -> Self {
        Self::Internal(format!("I/O error: {err}"))
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InvalidArgument => "invalid_argument",
            Self::Auth => "auth",
            Self::NotFound => "not_found",
            Self::AlreadyExists => "already_exists",
            Self::TransientNetwork => "transient_network",
            Self::TransientSatellite => "transient_satellite",
            Self::Crypto => "crypto",
            Self::InsufficientPieces => "insufficient_pieces",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}
