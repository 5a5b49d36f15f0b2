//! Busy-interval sync over a [`CalendarSource`].

use std::sync::Arc;

use caldave_core::BusyInterval;
use chrono::{DateTime, Days, FixedOffset, NaiveDate, NaiveTime, SecondsFormat};
use tracing::{debug, warn};

use crate::error::{SyncError, SyncResult};
use crate::source::{CalendarSource, SourceEvent};

/// Parses an event boundary.
///
/// RFC 3339 timestamps keep their offset; bare `YYYY-MM-DD` dates (all-day
/// events) become midnight UTC.
pub fn parse_event_time(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Some(at);
    }
    NaiveDate::parse_from_str(value, caldave_core::clock::DATE_FORMAT)
        .ok()
        .map(midnight_utc)
}

fn midnight_utc(date: NaiveDate) -> DateTime<FixedOffset> {
    date.and_time(NaiveTime::default()).and_utc().fixed_offset()
}

fn rfc3339(date: NaiveDate) -> String {
    date.and_time(NaiveTime::default())
        .and_utc()
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Fetches busy intervals from a calendar source.
#[derive(Clone)]
pub struct CalendarSync {
    source: Arc<dyn CalendarSource>,
}

impl std::fmt::Debug for CalendarSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalendarSync")
            .field("source", &self.source.name())
            .finish()
    }
}

impl CalendarSync {
    pub fn new(source: Arc<dyn CalendarSource>) -> Self {
        Self { source }
    }

    /// Name of the underlying source.
    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Fetches every busy interval between `start` and `end`, both inclusive.
    ///
    /// Calendars are visited in the order the source lists them and events
    /// keep the source's order, so the result is ordered by arrival rather
    /// than by time. Events with unparseable times are skipped.
    ///
    /// # Errors
    ///
    /// Fails if `end` is before `start` or if any source call fails.
    pub async fn fetch_busy_intervals(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> SyncResult<Vec<BusyInterval>> {
        if end < start {
            return Err(SyncError::InvalidRange { start, end });
        }

        let time_min = rfc3339(start);
        let time_max = rfc3339(end.checked_add_days(Days::new(1)).unwrap_or(end));

        let calendars = self
            .source
            .list_calendars()
            .await
            .map_err(SyncError::ListCalendars)?;

        let mut intervals = Vec::new();
        for calendar in &calendars {
            let events = self
                .source
                .list_events(&calendar.id, &time_min, &time_max)
                .await
                .map_err(|source| SyncError::ListEvents {
                    calendar_id: calendar.id.clone(),
                    source,
                })?;

            debug!(
                calendar_id = %calendar.id,
                calendar = %calendar.name,
                count = events.len(),
                "fetched events"
            );
            intervals.extend(
                events
                    .iter()
                    .filter_map(|event| to_interval(&calendar.id, event)),
            );
        }

        Ok(intervals)
    }
}

/// Computes the refresh window around `today`.
pub fn sync_window(today: NaiveDate, lookbehind_days: u64, lookahead_days: u64) -> (NaiveDate, NaiveDate) {
    let start = today
        .checked_sub_days(Days::new(lookbehind_days))
        .unwrap_or(today);
    let end = today
        .checked_add_days(Days::new(lookahead_days))
        .unwrap_or(today);
    (start, end)
}

fn to_interval(calendar_id: &str, event: &SourceEvent) -> Option<BusyInterval> {
    let Some(start) = parse_event_time(&event.start) else {
        warn!(calendar_id, event = %event.name, value = %event.start, "skipping event with unparseable start");
        return None;
    };
    let Some(end) = parse_event_time(&event.end) else {
        warn!(calendar_id, event = %event.name, value = %event.end, "skipping event with unparseable end");
        return None;
    };
    Some(BusyInterval::new(start, end, calendar_id, &event.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{IntegrationError, IntegrationErrorCode};
    use crate::memory::MemorySource;
    use crate::source::{CalendarInfo, ErrorSource};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn source() -> MemorySource {
        MemorySource::new()
            .with_calendar(
                CalendarInfo::new("work", "Work"),
                vec![
                    SourceEvent::new("Review", "2024-10-14T15:00:00+02:00", "2024-10-14T16:00:00+02:00"),
                    SourceEvent::new("Standup", "2024-10-14T09:00:00+02:00", "2024-10-14T09:15:00+02:00"),
                    SourceEvent::new("Broken", "yesterday-ish", "2024-10-14T10:00:00Z"),
                ],
            )
            .with_calendar(
                CalendarInfo::new("home", "Home"),
                vec![SourceEvent::new("Holiday", "2024-10-15", "2024-10-16")],
            )
    }

    #[test]
    fn parses_rfc3339_and_all_day() {
        let at = parse_event_time("2024-10-14T09:00:00+02:00").unwrap();
        assert_eq!(at.offset().local_minus_utc(), 2 * 3600);

        let all_day = parse_event_time("2024-10-15").unwrap();
        assert_eq!(all_day.to_rfc3339(), "2024-10-15T00:00:00+00:00");

        assert!(parse_event_time("15/10/2024").is_none());
        assert!(parse_event_time("").is_none());
    }

    #[test]
    fn window_around_today() {
        let (start, end) = sync_window(date(2024, 10, 14), 30, 60);
        assert_eq!(start, date(2024, 9, 14));
        assert_eq!(end, date(2024, 12, 13));
    }

    #[tokio::test]
    async fn keeps_calendar_and_arrival_order() {
        let sync = CalendarSync::new(Arc::new(source()));
        let intervals = sync
            .fetch_busy_intervals(date(2024, 10, 1), date(2024, 10, 31))
            .await
            .unwrap();

        let labels: Vec<_> = intervals.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, ["Review", "Standup", "Holiday"]);
        assert_eq!(intervals[2].calendar_id, "home");
        assert_eq!(intervals[1].start.to_rfc3339(), "2024-10-14T09:00:00+02:00");
    }

    #[tokio::test]
    async fn end_date_is_inclusive() {
        let sync = CalendarSync::new(Arc::new(source()));
        let intervals = sync
            .fetch_busy_intervals(date(2024, 10, 15), date(2024, 10, 15))
            .await
            .unwrap();
        let labels: Vec<_> = intervals.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, ["Holiday"]);
    }

    #[tokio::test]
    async fn reversed_range_is_rejected() {
        let sync = CalendarSync::new(Arc::new(source()));
        let err = sync
            .fetch_busy_intervals(date(2024, 10, 31), date(2024, 10, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::InvalidRange { .. }));
    }

    #[tokio::test]
    async fn source_failure_surfaces_as_sync_error() {
        let sync = CalendarSync::new(Arc::new(ErrorSource::new(
            "offline",
            IntegrationError::network("unreachable"),
        )));
        let err = sync
            .fetch_busy_intervals(date(2024, 10, 1), date(2024, 10, 31))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::ListCalendars(_)));
        assert_eq!(
            err.integration().map(IntegrationError::code),
            Some(IntegrationErrorCode::NetworkError)
        );
        assert_eq!(sync.source_name(), "offline");
    }
}
