// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The segment splitter: turns a reader into a sequence of plaintext
//! segments, deciding inline-vs-remote by whether the whole object fits in
//! `maxInlineSize`.
//!
//! Conceptually the remote-segment reader is a bounded buffer handed to the
//! piece uploader and read exactly once, so the driver can release memory
//! as soon as the buffer is drained. Here that buffer is simply the
//! segment's owned `Vec<u8>`: moving it into the piece uploader is itself
//! the "read exactly once, then release" handoff, and pipelining across
//! segments comes from the stream store overlapping segment `N+1`'s read
//! with segment `N`'s piece uploads rather than from a literal bounded
//! channel inside the splitter.

use tokio::io::{AsyncRead, AsyncReadExt};

use storx_uplink_domain::error::UplinkError;
use storx_uplink_domain::value_objects::{MaxInlineSize, SegmentPosition, SegmentSize};

/// One segment's plaintext, not yet encrypted, tagged with whether it ended
/// up inline or remote.
#[derive(Debug)]
pub enum PendingSegment {
    Inline { position: SegmentPosition, plaintext: Vec<u8> },
    Remote { position: SegmentPosition, plaintext: Vec<u8> },
}

impl PendingSegment {
    pub fn position(&self) -> SegmentPosition {
        match self {
            Self::Inline { position, .. } | Self::Remote { position, .. } => *position,
        }
    }

    pub fn plaintext(&self) -> &[u8] {
        match self {
            Self::Inline { plaintext, .. } | Self::Remote { plaintext, .. } => plaintext,
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, Self::Inline { .. })
    }
}

/// Consumes an [`AsyncRead`] and produces [`PendingSegment`]s one at a
/// time. The inline-vs-remote decision is made exactly once, for the first
/// segment: if the whole stream fits in `maxInlineSize`, the object is a
/// single inline segment (including the empty stream, resolved as a
/// zero-byte inline segment); otherwise every segment is remote, each up
/// to `segmentSize` plaintext bytes.
pub struct Splitter<R> {
    reader: R,
    max_inline: MaxInlineSize,
    segment_size: SegmentSize,
    next_position: SegmentPosition,
    decided_remote: bool,
    done: bool,
}

impl<R: AsyncRead + Unpin> Splitter<R> {
    pub fn new(reader: R, max_inline: MaxInlineSize, segment_size: SegmentSize) -> Self {
        Self {
            reader,
            max_inline,
            segment_size,
            next_position: SegmentPosition::first(),
            decided_remote: false,
            done: false,
        }
    }

    /// Pulls the next segment, or `None` once the stream (and any decided
    /// inline segment) has been fully emitted.
    pub async fn next_segment(&mut self) -> Result<Option<PendingSegment>, UplinkError> {
        if self.done {
            return Ok(None);
        }

        if !self.decided_remote {
            let probe_len = self.max_inline.bytes() as usize + 1;
            let (buf, eof) = read_up_to(&mut self.reader, probe_len).await?;
            if eof {
                self.done = true;
                let position = self.next_position;
                return Ok(Some(PendingSegment::Inline { position, plaintext: buf }));
            }
            // Didn't hit EOF within maxInlineSize + 1 bytes: the object must
            // be remote. `buf` becomes the head of the first remote segment.
            self.decided_remote = true;
            return Ok(Some(self.read_remote_segment(buf).await?));
        }

        let (buf, eof) = read_up_to(&mut self.reader, self.segment_size.bytes() as usize).await?;
        if buf.is_empty() && eof {
            self.done = true;
            return Ok(None);
        }
        if eof {
            self.done = true;
        }
        let position = self.advance_position();
        Ok(Some(PendingSegment::Remote { position, plaintext: buf }))
    }

    async fn read_remote_segment(&mut self, head: Vec<u8>) -> Result<PendingSegment, UplinkError> {
        let mut buf = head;
        let target = self.segment_size.bytes() as usize;
        if buf.len() < target {
            let (rest, eof) = read_up_to(&mut self.reader, target - buf.len()).await?;
            buf.extend_from_slice(&rest);
            if eof {
                self.done = true;
            }
        }
        let position = self.advance_position();
        Ok(PendingSegment::Remote { position, plaintext: buf })
    }

    fn advance_position(&mut self) -> SegmentPosition {
        let position = self.next_position;
        self.next_position = position.next();
        position
    }
}

/// Reads up to `max_len` bytes, or until EOF, whichever comes first.
/// Returns the bytes read and whether EOF was observed.
async fn read_up_to<R: AsyncRead + Unpin>(reader: &mut R, max_len: usize) -> Result<(Vec<u8>, bool), UplinkError> {
    let mut buf = vec![0u8; max_len];
    let mut filled = 0;
    while filled < max_len {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            buf.truncate(filled);
            return Ok((buf, true));
        }
        filled += n;
    }
    Ok((buf, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn max_inline(n: u64) -> MaxInlineSize {
        MaxInlineSize::new(n)
    }
    fn segment_size(n: u64) -> SegmentSize {
        SegmentSize::new(n)
    }

    #[tokio::test]
    async fn empty_stream_is_one_inline_segment() {
        let mut splitter = Splitter::new(Cursor::new(Vec::<u8>::new()), max_inline(4096), segment_size(1024));
        let seg = splitter.next_segment().await.unwrap().unwrap();
        assert!(seg.is_inline());
        assert!(seg.plaintext().is_empty());
        assert!(splitter.next_segment().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn fits_inline() {
        let data = vec![7u8; 100];
        let mut splitter = Splitter::new(Cursor::new(data.clone()), max_inline(4096), segment_size(1024));
        let seg = splitter.next_segment().await.unwrap().unwrap();
        assert!(seg.is_inline());
        assert_eq!(seg.plaintext(), data.as_slice());
        assert!(splitter.next_segment().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn exceeds_inline_becomes_remote_segments() {
        // segmentSize = 10 KiB, payload = 19 KiB -> exactly two remote segments.
        let data = vec![1u8; 19 * 1024];
        let mut splitter = Splitter::new(Cursor::new(data.clone()), max_inline(4096), segment_size(10 * 1024));

        let first = splitter.next_segment().await.unwrap().unwrap();
        assert!(!first.is_inline());
        assert_eq!(first.position(), SegmentPosition::first());
        assert_eq!(first.plaintext().len(), 10 * 1024);

        let second = splitter.next_segment().await.unwrap().unwrap();
        assert!(!second.is_inline());
        assert_eq!(second.position(), SegmentPosition::new(0, 1));
        assert_eq!(second.plaintext().len(), 9 * 1024);

        assert!(splitter.next_segment().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn exact_multiple_of_segment_size() {
        let data = vec![2u8; 2048];
        let mut splitter = Splitter::new(Cursor::new(data), max_inline(0), segment_size(1024));
        let first = splitter.next_segment().await.unwrap().unwrap();
        assert_eq!(first.plaintext().len(), 1024);
        let second = splitter.next_segment().await.unwrap().unwrap();
        assert_eq!(second.plaintext().len(), 1024);
        assert!(splitter.next_segment().await.unwrap().is_none());
    }
}
