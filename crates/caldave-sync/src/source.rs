//! The [`CalendarSource`] integration trait.
//!
//! A source knows how to list calendars and list the events of one calendar
//! inside an RFC 3339 window. Event times are returned as the raw strings the
//! backend reported; parsing them into busy intervals is the job of
//! [`CalendarSync`](crate::CalendarSync).

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::{IntegrationError, IntegrationResult};

/// A boxed future for object-safe async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A calendar exposed by a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarInfo {
    pub id: String,
    pub name: String,
}

impl CalendarInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// An event as reported by a source.
///
/// `start` and `end` are either RFC 3339 timestamps or, for all-day events,
/// plain `YYYY-MM-DD` dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEvent {
    pub name: String,
    pub start: String,
    pub end: String,
}

impl SourceEvent {
    pub fn new(name: impl Into<String>, start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: start.into(),
            end: end.into(),
        }
    }
}

/// A calendar backend.
///
/// ```ignore
/// struct GoogleSource { client: reqwest::Client }
///
/// impl CalendarSource for GoogleSource {
///     fn name(&self) -> &str { "google" }
///
///     fn list_calendars(&self) -> BoxFuture<'_, IntegrationResult<Vec<CalendarInfo>>> {
///         Box::pin(async move { /* GET /users/me/calendarList */ })
///     }
///     // ...
/// }
/// ```
pub trait CalendarSource: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    /// Lists the calendars to read busy time from, in a stable order.
    fn list_calendars(&self) -> BoxFuture<'_, IntegrationResult<Vec<CalendarInfo>>>;

    /// Lists events of `calendar_id` overlapping `[time_min, time_max)`.
    ///
    /// Both bounds are RFC 3339 timestamps.
    fn list_events<'a>(
        &'a self,
        calendar_id: &'a str,
        time_min: &'a str,
        time_max: &'a str,
    ) -> BoxFuture<'a, IntegrationResult<Vec<SourceEvent>>>;
}

/// A source that fails every call.
///
/// Used in tests and when the configured source cannot be initialized.
#[derive(Debug)]
pub struct ErrorSource {
    name: String,
    error: IntegrationError,
}

impl ErrorSource {
    pub fn new(name: impl Into<String>, error: IntegrationError) -> Self {
        Self {
            name: name.into(),
            error,
        }
    }

    fn error(&self) -> IntegrationError {
        IntegrationError::new(self.error.code(), self.error.message()).with_source_name(&self.name)
    }
}

impl CalendarSource for ErrorSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_calendars(&self) -> BoxFuture<'_, IntegrationResult<Vec<CalendarInfo>>> {
        let error = self.error();
        Box::pin(async move { Err(error) })
    }

    fn list_events<'a>(
        &'a self,
        _calendar_id: &'a str,
        _time_min: &'a str,
        _time_max: &'a str,
    ) -> BoxFuture<'a, IntegrationResult<Vec<SourceEvent>>> {
        let error = self.error();
        Box::pin(async move { Err(error) })
    }
}
