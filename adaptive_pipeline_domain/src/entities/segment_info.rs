// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use crate::value_objects::{CipherSuite, SegmentPosition};

/// What the splitter hands back once a segment's size is known: the
/// plaintext and ciphertext sizes, used to populate `CommitSegment` /
/// `MakeInlineSegment` batch items.
#[derive(Debug, Clone, Copy)]
pub struct SegmentInfo {
    pub cipher_suite: CipherSuite,
    pub plain_size: u64,
    pub encrypted_size: u64,
}

/// One segment of an object as tracked by the stream store during upload:
/// its position, whether it ended up inline or remote, and (once known)
/// its finalized size info.
#[derive(Debug, Clone)]
pub struct Segment {
    pub position: SegmentPosition,
    pub inline: bool,
    pub info: Option<SegmentInfo>,
}

impl Segment {
    pub fn new(position: SegmentPosition, inline: bool) -> Self {
        Self {
            position,
            inline,
            info: None,
        }
    }
}
