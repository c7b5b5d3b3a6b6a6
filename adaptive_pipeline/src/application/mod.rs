// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Application layer: thin, one-method-per-operation use cases over
//! [`crate::project::Project`], with no CLI-oriented configuration surface —
//! every knob here is already captured by
//! [`crate::infrastructure::config::UploadConfig`] or passed explicitly by
//! the caller.

pub mod download;
pub mod list;
pub mod upload;
