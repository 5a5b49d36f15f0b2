//! Busy calendar intervals.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A time range during which the calendar owner is occupied.
///
/// Times keep the UTC offset reported by the calendar so that day matching
/// and time-of-day arithmetic happen on the event's own wall clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusyInterval {
    /// Start of the busy period.
    pub start: DateTime<FixedOffset>,
    /// End of the busy period.
    pub end: DateTime<FixedOffset>,
    /// Calendar the event belongs to.
    pub calendar_id: String,
    /// Event title.
    pub label: String,
}

impl BusyInterval {
    /// Creates a new busy interval.
    pub fn new(
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
        calendar_id: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            start,
            end,
            calendar_id: calendar_id.into(),
            label: label.into(),
        }
    }

    /// Calendar date on which the interval starts.
    pub fn start_date(&self) -> NaiveDate {
        self.start.date_naive()
    }

    /// Returns true if the interval starts on `date`.
    ///
    /// Intervals crossing midnight belong only to their start date.
    pub fn starts_on(&self, date: NaiveDate) -> bool {
        self.start_date() == date
    }

    /// Wall-clock start.
    pub fn local_start(&self) -> NaiveDateTime {
        self.start.naive_local()
    }

    /// Wall-clock end.
    pub fn local_end(&self) -> NaiveDateTime {
        self.end.naive_local()
    }

    /// Wall-clock bounds widened by `buffer` on both sides.
    pub fn padded(&self, buffer: Duration) -> (NaiveDateTime, NaiveDateTime) {
        (self.local_start() - buffer, self.local_end() + buffer)
    }

    /// Length of the interval.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(rfc3339: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap()
    }

    #[test]
    fn day_matching_uses_event_offset() {
        let interval = BusyInterval::new(
            at("2024-10-11T23:30:00-04:00"),
            at("2024-10-12T00:30:00-04:00"),
            "primary",
            "Late call",
        );
        // 03:30 UTC on the 12th, but the event's own wall clock says the 11th
        assert!(interval.starts_on(NaiveDate::from_ymd_opt(2024, 10, 11).unwrap()));
        assert!(!interval.starts_on(NaiveDate::from_ymd_opt(2024, 10, 12).unwrap()));
        assert_eq!(interval.duration(), Duration::hours(1));
    }

    #[test]
    fn padding_is_symmetric() {
        let interval = BusyInterval::new(
            at("2024-10-11T12:00:00+00:00"),
            at("2024-10-11T12:30:00+00:00"),
            "primary",
            "Lunch",
        );
        let (start, end) = interval.padded(Duration::minutes(10));
        assert_eq!(start.format("%H:%M").to_string(), "11:50");
        assert_eq!(end.format("%H:%M").to_string(), "12:40");
    }

    #[test]
    fn serializes_camel_case() {
        let interval = BusyInterval::new(
            at("2024-10-11T09:00:00+02:00"),
            at("2024-10-11T10:00:00+02:00"),
            "work",
            "Standup",
        );
        let value = serde_json::to_value(&interval).unwrap();
        assert_eq!(value["calendarId"], "work");
        assert_eq!(value["label"], "Standup");
        assert_eq!(value["start"], "2024-10-11T09:00:00+02:00");
    }
}
