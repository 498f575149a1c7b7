//! Interval model: disjoint, ordered time ranges on a single timeline.
//!
//! Ranges are plain `f64` second spans. They are immutable once built;
//! merging and subtraction produce new ranges instead of mutating.

use serde::{Deserialize, Serialize};

use crate::error::EditError;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    /// Build a range, rejecting degenerate spans (`end <= start`) and
    /// non-finite bounds.
    pub fn new(start: f64, end: f64) -> Result<Self, EditError> {
        if !start.is_finite() || !end.is_finite() || end <= start {
            return Err(EditError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Half-open containment: `[start, end)`.
    pub fn contains(&self, instant: f64) -> bool {
        self.start <= instant && instant < self.end
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}s-{:.2}s", self.start, self.end)
    }
}

/// Merge ranges into a strictly ordered, non-overlapping sequence.
///
/// Two ranges collapse into one covering span when the next range starts at
/// or before `previous.end + gap_tolerance`. Output ranges are separated by
/// more than the tolerance, so the operation is idempotent.
pub fn merge_overlapping(ranges: &[TimeRange], gap_tolerance: f64) -> Vec<TimeRange> {
    if ranges.is_empty() {
        return Vec::new();
    }

    let mut sorted: Vec<TimeRange> = ranges.to_vec();
    sorted.sort_by(|a, b| {
        a.start
            .partial_cmp(&b.start)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut merged: Vec<TimeRange> = Vec::with_capacity(sorted.len());
    let mut current = sorted[0];

    for next in sorted.into_iter().skip(1) {
        if next.start <= current.end + gap_tolerance {
            current.end = current.end.max(next.end);
        } else {
            merged.push(current);
            current = next;
        }
    }
    merged.push(current);

    merged
}

/// Subtract every intersecting hole from `base`, returning the surviving
/// fragments in order. Holes must be passed in ascending start order.
pub fn subtract(base: TimeRange, holes: &[TimeRange]) -> Vec<TimeRange> {
    let mut fragments = Vec::new();
    let mut cursor = base.start;

    for hole in holes {
        if hole.end <= cursor || hole.start >= base.end {
            continue;
        }
        if hole.start > cursor {
            // Safe: cursor < hole.start by the check above.
            fragments.push(TimeRange {
                start: cursor,
                end: hole.start.min(base.end),
            });
        }
        cursor = cursor.max(hole.end);
        if cursor >= base.end {
            return fragments;
        }
    }

    if cursor < base.end {
        fragments.push(TimeRange {
            start: cursor,
            end: base.end,
        });
    }

    fragments
}
