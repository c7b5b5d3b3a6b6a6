// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use crate::error::UplinkError;

/// Minimum number of successful pieces required to reconstruct a segment
/// (`R`). Always `<= OptimalThreshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequiredThreshold(u32);

/// Number of successful pieces at which a segment is considered
/// well-distributed (`O`). Always `<= N` (the total piece count) and
/// `>= RequiredThreshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct OptimalThreshold(u32);

impl RequiredThreshold {
    pub fn new(value: u32) -> Self {
        Self(value)
    }
    pub fn get(self) -> u32 {
        self.0
    }
}

impl OptimalThreshold {
    pub fn new(value: u32) -> Self {
        Self(value)
    }
    pub fn get(self) -> u32 {
        self.0
    }
}

/// Validates `R <= O <= N` for one segment's redundancy scheme.
pub fn validate_redundancy(required: RequiredThreshold, optimal: OptimalThreshold, total: u32) -> Result<(), UplinkError> {
    if required.get() <= optimal.get() && optimal.get() <= total {
        Ok(())
    } else {
        Err(UplinkError::internal(format!(
            "invalid redundancy scheme: required={}, optimal={}, total={total}",
            required.get(),
            optimal.get()
        )))
    }
}

/// Extra successful pieces tolerated beyond `OptimalThreshold` before the
/// piece uploader cancels the remaining in-flight uploads for a segment.
/// Default 15.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LongTailMargin(u32);

impl LongTailMargin {
    pub const DEFAULT: u32 = 15;

    pub fn new(value: u32) -> Self {
        Self(value)
    }
    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for LongTailMargin {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

/// Process-wide ceiling on concurrently admitted piece uploads
/// (`MaximumConcurrent`). Default 200.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaximumConcurrent(usize);

impl MaximumConcurrent {
    pub const DEFAULT: usize = 200;

    pub fn new(value: usize) -> Self {
        Self(value)
    }
    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for MaximumConcurrent {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_ordering() {
        assert!(validate_redundancy(RequiredThreshold::new(4), OptimalThreshold::new(6), 10).is_ok());
        assert!(validate_redundancy(RequiredThreshold::new(7), OptimalThreshold::new(6), 10).is_err());
        assert!(validate_redundancy(RequiredThreshold::new(4), OptimalThreshold::new(11), 10).is_err());
    }

    #[test]
    fn defaults_have_expected_values() {
        assert_eq!(LongTailMargin::default().get(), 15);
        assert_eq!(MaximumConcurrent::default().get(), 200);
    }
}
