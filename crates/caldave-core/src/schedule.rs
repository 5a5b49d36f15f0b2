//! Business-hour rules used by the availability engine.
//!
//! A [`ScheduleConfig`] maps each weekday to a pair of open/close times,
//! falls back to a default pair for weekdays without an override, and carries
//! the buffer applied around every busy interval.

use std::collections::HashMap;

use chrono::{Duration, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::{hhmm, parse_time_of_day};

/// Result type for schedule construction.
pub type ScheduleResult<T> = Result<T, ScheduleError>;

/// Errors raised while building a schedule from user-supplied values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    /// A time of day was not in `HH:MM` form.
    #[error("invalid time of day {value:?} (expected HH:MM)")]
    InvalidTime { value: String },

    /// A weekday name could not be recognized.
    #[error("unknown weekday {value:?}")]
    UnknownWeekday { value: String },

    /// Close time is earlier than open time.
    #[error("close time {close} is before open time {open}")]
    CloseBeforeOpen { open: String, close: String },
}

/// Opening hours for a single day.
///
/// A day whose open and close times are equal is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessHours {
    /// Opening time of day.
    #[serde(with = "hhmm")]
    pub open: NaiveTime,
    /// Closing time of day (exclusive).
    #[serde(with = "hhmm")]
    pub close: NaiveTime,
}

impl BusinessHours {
    /// Creates business hours from two times of day.
    pub fn new(open: NaiveTime, close: NaiveTime) -> Self {
        Self { open, close }
    }

    /// Parses business hours from two `HH:MM` strings.
    pub fn parse(open: &str, close: &str) -> ScheduleResult<Self> {
        let open_time = parse_time_of_day(open).ok_or_else(|| ScheduleError::InvalidTime {
            value: open.to_string(),
        })?;
        let close_time = parse_time_of_day(close).ok_or_else(|| ScheduleError::InvalidTime {
            value: close.to_string(),
        })?;
        if close_time < open_time {
            return Err(ScheduleError::CloseBeforeOpen {
                open: open.to_string(),
                close: close.to_string(),
            });
        }
        Ok(Self::new(open_time, close_time))
    }

    /// Hours for a day on which nothing can be booked.
    pub fn closed() -> Self {
        Self::new(NaiveTime::default(), NaiveTime::default())
    }

    /// Returns true if no slot can ever be offered on this day.
    pub fn is_closed(&self) -> bool {
        self.open >= self.close
    }
}

/// Per-weekday business hours plus the busy-interval buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleConfig {
    weekday_hours: HashMap<Weekday, BusinessHours>,
    default_hours: BusinessHours,
    buffer: Duration,
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default()
}

impl Default for ScheduleConfig {
    /// Weekday hours with Saturday mornings open, Sundays closed and a
    /// ten minute buffer.
    fn default() -> Self {
        Self::new(BusinessHours::new(hm(8, 0), hm(17, 30)))
            .with_weekday(Weekday::Mon, BusinessHours::new(hm(8, 0), hm(17, 0)))
            .with_weekday(Weekday::Tue, BusinessHours::new(hm(8, 30), hm(17, 0)))
            .with_weekday(Weekday::Wed, BusinessHours::new(hm(9, 0), hm(18, 0)))
            .with_weekday(Weekday::Thu, BusinessHours::new(hm(8, 0), hm(17, 0)))
            .with_weekday(Weekday::Fri, BusinessHours::new(hm(8, 0), hm(17, 30)))
            .with_weekday(Weekday::Sat, BusinessHours::new(hm(10, 0), hm(14, 0)))
            .with_weekday(Weekday::Sun, BusinessHours::closed())
            .with_buffer(Duration::minutes(10))
    }
}

impl ScheduleConfig {
    /// Creates a schedule with no weekday overrides and no buffer.
    pub fn new(default_hours: BusinessHours) -> Self {
        Self {
            weekday_hours: HashMap::new(),
            default_hours,
            buffer: Duration::zero(),
        }
    }

    /// Builder: override the hours of one weekday.
    pub fn with_weekday(mut self, weekday: Weekday, hours: BusinessHours) -> Self {
        self.weekday_hours.insert(weekday, hours);
        self
    }

    /// Builder: set the buffer applied before and after each busy interval.
    pub fn with_buffer(mut self, buffer: Duration) -> Self {
        self.buffer = buffer;
        self
    }

    /// Builder: set the buffer in minutes.
    pub fn with_buffer_minutes(self, minutes: u32) -> Self {
        self.with_buffer(Duration::minutes(i64::from(minutes)))
    }

    /// Returns the hours in effect for the given weekday.
    pub fn hours_for(&self, weekday: Weekday) -> BusinessHours {
        self.weekday_hours
            .get(&weekday)
            .copied()
            .unwrap_or(self.default_hours)
    }

    /// Returns the fallback hours.
    pub fn default_hours(&self) -> BusinessHours {
        self.default_hours
    }

    /// Returns the symmetric busy-interval buffer.
    pub fn buffer(&self) -> Duration {
        self.buffer
    }

    /// Returns the weekday overrides, ordered Monday first.
    pub fn overrides(&self) -> Vec<(Weekday, BusinessHours)> {
        let mut overrides: Vec<_> = self
            .weekday_hours
            .iter()
            .map(|(day, hours)| (*day, *hours))
            .collect();
        overrides.sort_by_key(|(day, _)| day.num_days_from_monday());
        overrides
    }
}

/// Parses a weekday name (`mon`, `Monday`, ...).
pub fn parse_weekday(value: &str) -> ScheduleResult<Weekday> {
    value
        .trim()
        .parse::<Weekday>()
        .map_err(|_| ScheduleError::UnknownWeekday {
            value: value.to_string(),
        })
}
