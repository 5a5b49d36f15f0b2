//! Time-of-day and calendar-date helpers shared by the wire format and the
//! configuration layer.

use chrono::{NaiveDate, NaiveTime};

/// Wire and config format for times of day.
pub const TIME_OF_DAY_FORMAT: &str = "%H:%M";

/// Calendar date format used by requests and sync ranges.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses an `HH:MM` time of day.
pub fn parse_time_of_day(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), TIME_OF_DAY_FORMAT).ok()
}

/// Formats a time of day as `HH:MM`.
pub fn format_time_of_day(time: NaiveTime) -> String {
    time.format(TIME_OF_DAY_FORMAT).to_string()
}

/// Parses a `YYYY-MM-DD` date, ignoring anything after the first `T` or
/// space (clients often send full ISO timestamps).
pub fn parse_date_prefix(value: &str) -> Option<NaiveDate> {
    let date_part = value.split(['T', ' ']).next().unwrap_or_default();
    NaiveDate::parse_from_str(date_part, DATE_FORMAT).ok()
}

/// Serde adapter for `HH:MM` times of day.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_time_of_day(*time))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_time_of_day(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid time of day {raw:?}, expected HH:MM")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_of_day_parsing() {
        assert_eq!(
            parse_time_of_day("08:30"),
            NaiveTime::from_hms_opt(8, 30, 0)
        );
        assert_eq!(
            parse_time_of_day(" 17:05 "),
            NaiveTime::from_hms_opt(17, 5, 0)
        );
        assert!(parse_time_of_day("25:00").is_none());
        assert!(parse_time_of_day("8am").is_none());
        assert!(parse_time_of_day("").is_none());
    }

    #[test]
    fn time_of_day_formatting_pads() {
        let time = NaiveTime::from_hms_opt(9, 5, 0).unwrap();
        assert_eq!(format_time_of_day(time), "09:05");
    }

    #[test]
    fn date_prefix_drops_time_segment() {
        let expected = NaiveDate::from_ymd_opt(2024, 10, 11);
        assert_eq!(parse_date_prefix("2024-10-11"), expected);
        assert_eq!(parse_date_prefix("2024-10-11T00:00:00.000Z"), expected);
        assert_eq!(parse_date_prefix("2024-10-11 09:00"), expected);
    }

    #[test]
    fn date_prefix_rejects_garbage() {
        assert!(parse_date_prefix("").is_none());
        assert!(parse_date_prefix("11/10/2024").is_none());
        assert!(parse_date_prefix("2024-13-01").is_none());
        assert!(parse_date_prefix("T2024-10-11").is_none());
    }
}
