// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Aggregate root for one object upload: owns the invariants that span
//! more than one [`crate::entities::Segment`] — commit ordering and
//! one-holder-at-a-time for the commit lock — so the stream store (an
//! infrastructure concern) never has to re-derive them from scratch.

use crate::entities::Segment;
use crate::error::UplinkError;
use crate::value_objects::{Key, SegmentPosition, StreamId};

/// Tracks one upload's segments and enforces that `CommitSegment` items are
/// appended in position order and that only one commit is in flight at a
/// time.
pub struct UploadAggregate {
    stream_id: StreamId,
    content_key: Key,
    segments: Vec<Segment>,
    committing: bool,
    end_of_stream: bool,
}

impl UploadAggregate {
    pub fn new(stream_id: StreamId, content_key: Key) -> Self {
        Self {
            stream_id,
            content_key,
            segments: Vec::new(),
            committing: false,
            end_of_stream: false,
        }
    }

    pub fn stream_id(&self) -> &StreamId {
        &self.stream_id
    }

    pub fn content_key(&self) -> &Key {
        &self.content_key
    }

    pub fn committed_segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Appends a segment that has just finished uploading (or was inlined).
    /// Rejects an out-of-order position — the splitter is required to
    /// produce segments in strictly increasing position order, and a
    /// violation here means an invariant was broken upstream, not a
    /// retryable condition.
    pub fn append_segment(&mut self, segment: Segment) -> Result<(), UplinkError> {
        if let Some(last) = self.segments.last() {
            if segment.position <= last.position {
                return Err(UplinkError::internal(format!(
                    "segment position {:?} is not greater than previous {:?}",
                    segment.position, last.position
                )));
            }
        } else if segment.position != SegmentPosition::first() {
            return Err(UplinkError::internal(format!(
                "first segment must be at position {:?}, got {:?}",
                SegmentPosition::first(),
                segment.position
            )));
        }
        self.segments.push(segment);
        Ok(())
    }

    pub fn mark_end_of_stream(&mut self) {
        self.end_of_stream = true;
    }

    pub fn end_of_stream(&self) -> bool {
        self.end_of_stream
    }

    /// Acquires the commit lock. Returns an error if already held — the
    /// stream store should never call this twice concurrently for the same
    /// `StreamID`.
    pub fn begin_commit(&mut self) -> Result<(), UplinkError> {
        if self.committing {
            return Err(UplinkError::internal("commit already in progress for this stream"));
        }
        self.committing = true;
        Ok(())
    }

    pub fn end_commit(&mut self) {
        self.committing = false;
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregate() -> UploadAggregate {
        UploadAggregate::new(StreamId::from_bytes(vec![1, 2, 3]), Key::from_bytes([7; 32]))
    }

    #[test]
    fn first_segment_must_be_position_zero() {
        let mut agg = aggregate();
        let bad = Segment::new(SegmentPosition::new(0, 1), false);
        assert!(agg.append_segment(bad).is_err());

        let good = Segment::new(SegmentPosition::first(), false);
        assert!(agg.append_segment(good).is_ok());
    }

    #[test]
    fn segments_must_be_strictly_increasing() {
        let mut agg = aggregate();
        agg.append_segment(Segment::new(SegmentPosition::first(), false)).unwrap();
        agg.append_segment(Segment::new(SegmentPosition::new(0, 1), false)).unwrap();

        let out_of_order = Segment::new(SegmentPosition::new(0, 1), false);
        assert!(agg.append_segment(out_of_order).is_err());
    }

    #[test]
    fn commit_lock_is_exclusive() {
        let mut agg = aggregate();
        agg.begin_commit().unwrap();
        assert!(agg.begin_commit().is_err());
        agg.end_commit();
        assert!(agg.begin_commit().is_ok());
    }
}
