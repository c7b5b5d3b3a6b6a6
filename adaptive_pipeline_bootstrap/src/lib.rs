// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bootstrap Module
//!
//! Concerns that sit outside `storx-uplink`'s domain/infrastructure layers
//! and belong to whatever embeds the library (a CLI, a service, a test
//! harness): logging setup and graceful shutdown coordination.
//!
//! Argument parsing, platform abstraction, and a composition root are
//! deliberately not provided here — this crate is a library, not an
//! application, and has no CLI surface of its own.
//!
//! ## Usage
//!
//! ```rust
//! use adaptive_pipeline_bootstrap::logger::{BootstrapLogger, ConsoleLogger};
//! use adaptive_pipeline_bootstrap::shutdown::ShutdownCoordinator;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let logger = ConsoleLogger::new();
//!     logger.info("starting up");
//!
//!     let shutdown = ShutdownCoordinator::new(Duration::from_secs(5));
//!     let cancellation = shutdown.token();
//!
//!     // `cancellation` can be passed straight into `Project` upload/
//!     // download/list calls.
//!     drop(cancellation);
//! }
//! ```

pub mod logger;
pub mod shutdown;
