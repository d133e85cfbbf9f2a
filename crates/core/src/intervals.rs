//! Weekly activity-window compression.
//!
//! The utilization-metrics service reports activity over a fixed-width
//! weekly grid of 168 hourly slots (day-of-week 0-6 x hour-of-day 0-23).
//! Detectors mark individual slots as inactive; this module merges the
//! inactive slot indices into minimal contiguous ranges expressed as
//! (day, hour) boundary pairs.

use serde::Serialize;

/// Hourly slots per day.
pub const HOURS_PER_DAY: usize = 24;

/// Hourly slots per week: 7 days x 24 hours.
pub const SLOTS_PER_WEEK: usize = 168;

/// One boundary of a slot range: day-of-week (0 = Monday) and hour-of-day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotPoint {
    pub day_of_week: u8,
    pub hour: u8,
}

/// An inclusive range of contiguous inactive slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotRange {
    pub start: SlotPoint,
    pub end: SlotPoint,
}

impl SlotRange {
    /// Number of hourly slots covered by this range, inclusive.
    pub fn hours(&self) -> usize {
        let start = slot_index(self.start);
        let end = slot_index(self.end);
        end - start + 1
    }
}

/// Convert a flat slot index (0..168) into a (day, hour) point.
///
/// Indices at or beyond [`SLOTS_PER_WEEK`] are the caller's bug; the
/// conversion still wraps them into the grid rather than panicking.
pub fn slot_point(index: usize) -> SlotPoint {
    let index = index % SLOTS_PER_WEEK;
    SlotPoint {
        day_of_week: (index / HOURS_PER_DAY) as u8,
        hour: (index % HOURS_PER_DAY) as u8,
    }
}

/// Convert a (day, hour) point back into a flat slot index.
pub fn slot_index(point: SlotPoint) -> usize {
    point.day_of_week as usize * HOURS_PER_DAY + point.hour as usize
}

/// Merge inactive slot indices into minimal contiguous ranges.
///
/// Indices are sorted and deduplicated first; a new range starts whenever
/// the next index is not exactly one more than the previous. The result is
/// ordered by range start.
pub fn merge_inactive_slots(slots: &[usize]) -> Vec<SlotRange> {
    if slots.is_empty() {
        return Vec::new();
    }

    let mut sorted: Vec<usize> = slots.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut ranges = Vec::new();
    let mut start = sorted[0];
    let mut prev = sorted[0];

    for &slot in &sorted[1..] {
        if slot != prev + 1 {
            ranges.push(SlotRange {
                start: slot_point(start),
                end: slot_point(prev),
            });
            start = slot;
        }
        prev = slot;
    }
    ranges.push(SlotRange {
        start: slot_point(start),
        end: slot_point(prev),
    });

    ranges
}
