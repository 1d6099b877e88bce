//! Half-open time interval used by conflict detection.

use crate::model::validation::ValidationError;
use serde::Serialize;

/// `[start, end)` in Unix epoch milliseconds.
///
/// # Invariants
/// - `end > start`; zero-length and inverted intervals are unconstructible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Interval {
    start: i64,
    end: i64,
}

impl Interval {
    /// Builds an interval, rejecting `end <= start`.
    pub fn new(start: i64, end: i64) -> Result<Self, ValidationError> {
        if end <= start {
            return Err(ValidationError::InvalidTimeRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    /// Half-open overlap: adjacent intervals do not overlap.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }
}
