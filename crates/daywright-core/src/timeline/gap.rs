//! Free-slot detection inside the work window.
//!
//! Works in minutes-of-day. Busy intervals may arrive unsorted and
//! overlapping; the sweep cursor only ever moves forward, so overlaps
//! collapse naturally.

use serde::{Deserialize, Serialize};

/// Time already committed on a day: `[start, end)` in minutes-of-day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: i64,
    pub end: i64,
}

impl BusyInterval {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }
}

impl From<(i64, i64)> for BusyInterval {
    fn from((start, end): (i64, i64)) -> Self {
        Self::new(start, end)
    }
}

/// An open interval inside the work window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeSlot {
    pub start: i64,
    pub end: i64,
}

impl FreeSlot {
    /// Create a slot; zero or negative length yields `None`.
    pub fn new(start: i64, end: i64) -> Option<Self> {
        (end > start).then_some(Self { start, end })
    }

    /// Get duration in minutes
    pub fn duration_minutes(&self) -> i64 {
        self.end - self.start
    }
}

/// Detector for free slots in one day.
pub struct TimeGapDetector {
    /// Minimum slot duration to report (in minutes)
    min_gap_minutes: i64,
}

impl TimeGapDetector {
    /// Create a detector that reports every positive-length slot.
    pub fn new() -> Self {
        Self { min_gap_minutes: 1 }
    }

    /// Set the minimum slot duration
    pub fn with_min_gap(mut self, minutes: i64) -> Self {
        self.min_gap_minutes = minutes.max(1);
        self
    }

    /// Find the maximal free sub-intervals of `[work_start, work_end]`.
    ///
    /// # Returns
    /// Slots sorted by start, pairwise disjoint, inside the window.
    pub fn find_gaps(&self, busy: &[BusyInterval], work_start: i64, work_end: i64) -> Vec<FreeSlot> {
        let mut sorted: Vec<BusyInterval> = busy.to_vec();
        sorted.sort_by_key(|b| b.start);

        let mut slots = Vec::new();
        let mut cursor = work_start;

        for interval in &sorted {
            if interval.start > cursor {
                self.push_slot(&mut slots, cursor, interval.start.min(work_end));
            }
            cursor = cursor.max(interval.end);
            if cursor >= work_end {
                break;
            }
        }

        if cursor < work_end {
            self.push_slot(&mut slots, cursor, work_end);
        }

        slots
    }

    fn push_slot(&self, slots: &mut Vec<FreeSlot>, start: i64, end: i64) {
        if let Some(slot) = FreeSlot::new(start, end) {
            if slot.duration_minutes() >= self.min_gap_minutes {
                slots.push(slot);
            }
        }
    }
}

impl Default for TimeGapDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience function to find free slots with default settings
pub fn find_free_slots(busy: &[BusyInterval], work_start: i64, work_end: i64) -> Vec<FreeSlot> {
    TimeGapDetector::new().find_gaps(busy, work_start, work_end)
}
