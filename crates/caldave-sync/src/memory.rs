//! In-memory calendar source, optionally backed by a JSON file.
//!
//! File layout:
//!
//! ```json
//! {
//!   "calendars": [
//!     {
//!       "id": "work",
//!       "name": "Work",
//!       "events": [
//!         {"name": "Standup", "start": "2024-10-14T09:00:00+02:00", "end": "2024-10-14T09:15:00+02:00"}
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! A file-backed source re-reads the file each time calendars are listed, so
//! edits show up on the next sync.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{IntegrationError, IntegrationResult};
use crate::source::{BoxFuture, CalendarInfo, CalendarSource, SourceEvent};
use crate::sync::parse_event_time;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct EventsFile {
    #[serde(default)]
    calendars: Vec<CalendarEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CalendarEntry {
    id: String,
    name: String,
    #[serde(default)]
    events: Vec<SourceEvent>,
}

impl CalendarEntry {
    fn info(&self) -> CalendarInfo {
        CalendarInfo::new(&self.id, &self.name)
    }
}

/// Calendar source holding its events in memory.
#[derive(Debug, Default)]
pub struct MemorySource {
    data: RwLock<EventsFile>,
    path: Option<PathBuf>,
}

impl MemorySource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a calendar with its events.
    pub fn with_calendar(mut self, calendar: CalendarInfo, events: Vec<SourceEvent>) -> Self {
        self.data.get_mut().calendars.push(CalendarEntry {
            id: calendar.id,
            name: calendar.name,
            events,
        });
        self
    }

    /// Loads a source from a JSON events file and keeps following it.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> IntegrationResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| read_error(path, e))?;
        let data = parse(path, &contents)?;
        Ok(Self {
            data: RwLock::new(data),
            path: Some(path.to_path_buf()),
        })
    }

    /// Path of the backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Replaces the events of one calendar, adding the calendar if needed.
    pub async fn set_events(&self, calendar: CalendarInfo, events: Vec<SourceEvent>) {
        let mut data = self.data.write().await;
        match data.calendars.iter_mut().find(|entry| entry.id == calendar.id) {
            Some(entry) => entry.events = events,
            None => data.calendars.push(CalendarEntry {
                id: calendar.id,
                name: calendar.name,
                events,
            }),
        }
    }

    async fn reload(&self) -> IntegrationResult<()> {
        let Some(ref path) = self.path else {
            return Ok(());
        };
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| read_error(path, e))?;
        let data = parse(path, &contents)?;
        debug!(path = %path.display(), calendars = data.calendars.len(), "reloaded events file");
        *self.data.write().await = data;
        Ok(())
    }
}

fn read_error(path: &Path, err: std::io::Error) -> IntegrationError {
    IntegrationError::configuration(format!("cannot read {}", path.display()))
        .with_source_name("memory")
        .with_cause(err)
}

fn parse(path: &Path, contents: &str) -> IntegrationResult<EventsFile> {
    serde_json::from_str(contents).map_err(|e| {
        IntegrationError::invalid_response(format!("invalid events file {}", path.display()))
            .with_source_name("memory")
            .with_cause(e)
    })
}

/// True when the event overlaps `[time_min, time_max)`. Events or bounds
/// that do not parse are kept so the caller decides what to do with them.
fn overlaps(event: &SourceEvent, time_min: &str, time_max: &str) -> bool {
    match (
        parse_event_time(&event.start),
        parse_event_time(&event.end),
        parse_event_time(time_min),
        parse_event_time(time_max),
    ) {
        (Some(start), Some(end), Some(min), Some(max)) => start < max && end > min,
        _ => true,
    }
}

impl CalendarSource for MemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    fn list_calendars(&self) -> BoxFuture<'_, IntegrationResult<Vec<CalendarInfo>>> {
        Box::pin(async move {
            self.reload().await?;
            let data = self.data.read().await;
            Ok(data.calendars.iter().map(CalendarEntry::info).collect())
        })
    }

    fn list_events<'a>(
        &'a self,
        calendar_id: &'a str,
        time_min: &'a str,
        time_max: &'a str,
    ) -> BoxFuture<'a, IntegrationResult<Vec<SourceEvent>>> {
        Box::pin(async move {
            let data = self.data.read().await;
            let entry = data
                .calendars
                .iter()
                .find(|entry| entry.id == calendar_id)
                .ok_or_else(|| {
                    IntegrationError::not_found(format!("calendar {calendar_id:?}"))
                        .with_source_name("memory")
                })?;
            Ok(entry
                .events
                .iter()
                .filter(|event| overlaps(event, time_min, time_max))
                .cloned()
                .collect())
        })
    }
}
