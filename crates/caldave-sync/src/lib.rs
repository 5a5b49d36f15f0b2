//! Calendar sync for caldave.
//!
//! The server never talks to a calendar backend directly. It goes through a
//! [`CalendarSource`] (list calendars, list events in a window) wrapped by
//! [`CalendarSync`], which turns the raw events into
//! [`BusyInterval`](caldave_core::BusyInterval)s.
//!
//! Bundled sources:
//! - [`MemorySource`]: in-memory events, optionally loaded from a JSON file
//! - [`ErrorSource`]: fails every call

pub mod error;
pub mod memory;
pub mod source;
pub mod sync;

pub use error::{IntegrationError, IntegrationErrorCode, IntegrationResult, SyncError, SyncResult};
pub use memory::MemorySource;
pub use source::{BoxFuture, CalendarInfo, CalendarSource, ErrorSource, SourceEvent};
pub use sync::{CalendarSync, parse_event_time, sync_window};
