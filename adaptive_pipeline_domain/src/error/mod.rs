// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error Module
//!
//! A single hierarchical error type for the uplink domain. Errors are
//! categorized by [`ErrorKind`] rather than by Rust type, so that
//! retry policy (`is_retryable`) and user-facing reporting can both pattern
//! match on one small enum instead of threading `downcast_ref` calls through
//! the call stack.
//!
//! Every variant that can be attributed to a specific object carries the
//! `bucket`/`key` it occurred against, per the propagation rule that errors
//! bubble up with their originating location attached.

mod uplink_error;

pub use uplink_error::{ErrorKind, UplinkError};
