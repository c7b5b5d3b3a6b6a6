// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Configuration. Unlike a long-running service, this library has no
//! daemon config file to load; `ProjectConfig`/`UploadConfig` are plain
//! builder-friendly structs with `Default` impls matching the documented
//! defaults. `serde` derives are carried so an embedding application can
//! still deserialize overrides from its own TOML/YAML/JSON, even though
//! nothing in this crate parses a config file itself.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use storx_uplink_domain::value_objects::{LongTailMargin, MaxInlineSize, MaximumConcurrent, SegmentSize};

/// Settings fixed for the lifetime of a [`crate::project::Project`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Max time to establish an RPC connection. `None` = no timeout.
    pub dial_timeout: Option<Duration>,
    /// Appended per-request, after the library's own product/version entry.
    pub user_agent: Option<String>,
    /// `true` sends object-key path bytes cleartext; content stays
    /// encrypted regardless.
    pub disable_object_key_encryption: bool,
    pub upload: UploadConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            dial_timeout: None,
            user_agent: None,
            disable_object_key_encryption: false,
            upload: UploadConfig::default(),
        }
    }
}

/// Per-upload tunables threaded explicitly through the call chain as an
/// explicit `UploadConfig` struct, rather than ambient context.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UploadConfig {
    pub max_inline_size: MaxInlineSizeConfig,
    pub segment_size: SegmentSizeConfig,
    /// Per-segment encoded buffer cap (`MaximumBufferSize`).
    pub maximum_buffer_size: u64,
    pub maximum_concurrent: MaximumConcurrentConfig,
    pub long_tail_margin: LongTailMarginConfig,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_inline_size: MaxInlineSizeConfig(4096),
            segment_size: SegmentSizeConfig(64 * 1024 * 1024),
            maximum_buffer_size: 64 * 1024 * 1024,
            maximum_concurrent: MaximumConcurrentConfig(MaximumConcurrent::DEFAULT),
            long_tail_margin: LongTailMarginConfig(LongTailMargin::DEFAULT),
        }
    }
}

/// `serde`-friendly mirror of [`MaxInlineSize`]; the domain value object
/// itself deliberately carries no `serde` derive so the pure domain crate
/// never takes a dependency on a wire format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MaxInlineSizeConfig(pub u64);

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SegmentSizeConfig(pub u64);

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MaximumConcurrentConfig(pub usize);

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LongTailMarginConfig(pub u32);

impl UploadConfig {
    pub fn max_inline_size(&self) -> MaxInlineSize {
        MaxInlineSize::new(self.max_inline_size.0)
    }

    pub fn segment_size(&self) -> SegmentSize {
        SegmentSize::new(self.segment_size.0)
    }

    pub fn maximum_concurrent(&self) -> MaximumConcurrent {
        MaximumConcurrent::new(self.maximum_concurrent.0)
    }

    pub fn long_tail_margin(&self) -> LongTailMargin {
        LongTailMargin::new(self.long_tail_margin.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_configuration_options() {
        let config = UploadConfig::default();
        assert_eq!(config.max_inline_size().bytes(), 4096);
        assert_eq!(config.segment_size().bytes(), 64 * 1024 * 1024);
        assert_eq!(config.maximum_concurrent().get(), 200);
        assert_eq!(config.long_tail_margin().get(), 15);
    }

    #[test]
    fn project_config_defaults_enable_object_key_encryption() {
        assert!(!ProjectConfig::default().disable_object_key_encryption);
    }

    #[test]
    fn round_trips_through_toml_for_embedding_applications() {
        let config = ProjectConfig::default();
        let serialized = toml::to_string(&config).unwrap();
        let parsed: ProjectConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.upload.max_inline_size.0, config.upload.max_inline_size.0);
    }
}
