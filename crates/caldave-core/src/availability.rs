//! Free-slot computation.
//!
//! Given a date, the cached busy intervals and a [`ScheduleConfig`], the
//! engine returns the ordered list of bookable time-of-day ranges starting
//! at or after the day's opening time. Every busy interval is widened by the schedule's
//! buffer before the sweep, so back-to-back bookings always leave a gap.
//!
//! The engine is a pure function: identical inputs give identical output and
//! it never mutates the interval slice, so it can run concurrently against a
//! shared cache snapshot.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::clock::hhmm;
use crate::interval::BusyInterval;
use crate::schedule::ScheduleConfig;

/// A contiguous bookable range within one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AvailableSlot {
    /// Start time of day (inclusive).
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    /// End time of day (exclusive).
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl AvailableSlot {
    /// Creates a new slot.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Length of the slot in minutes.
    pub fn minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// Computes the free slots of `date`.
///
/// Only intervals starting on `date` are considered. An interval crossing
/// midnight blocks the rest of its start day and nothing on the next day.
/// A gap ending at a busy interval runs up to that interval's padded start
/// even when it lies past closing time; only the trailing gap stops at close.
pub fn available_slots(
    date: NaiveDate,
    intervals: &[BusyInterval],
    schedule: &ScheduleConfig,
) -> Vec<AvailableSlot> {
    let hours = schedule.hours_for(date.weekday());
    if hours.is_closed() {
        return Vec::new();
    }

    let open = date.and_time(hours.open);
    let close = date.and_time(hours.close);

    let mut day: Vec<(NaiveDateTime, NaiveDateTime)> = intervals
        .iter()
        .filter(|interval| interval.starts_on(date))
        .map(|interval| (interval.local_start(), interval.local_end()))
        .collect();
    // start ascending, then end ascending
    day.sort_unstable();

    let buffer = schedule.buffer();
    let mut slots = Vec::new();
    let mut cursor = open;

    for (start, end) in day {
        let busy_start = start - buffer;
        let busy_end = end + buffer;

        if cursor < busy_start {
            push_gap(&mut slots, cursor, busy_start);
        }
        cursor = cursor.max(busy_end);
    }

    if cursor < close {
        push_gap(&mut slots, cursor, close);
    }

    slots
}

fn push_gap(slots: &mut Vec<AvailableSlot>, start: NaiveDateTime, end: NaiveDateTime) {
    if start < end {
        slots.push(AvailableSlot::new(start.time(), end.time()));
    }
}
