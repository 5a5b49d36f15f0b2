//! Core types: busy intervals, business hours, availability engine, logging

pub mod availability;
pub mod clock;
pub mod interval;
pub mod logging;
pub mod schedule;

pub use availability::{AvailableSlot, available_slots};
pub use clock::{format_time_of_day, parse_date_prefix, parse_time_of_day};
pub use interval::BusyInterval;
pub use logging::{LogFormat, LoggingConfig, LoggingError, init_logging};
pub use schedule::{BusinessHours, ScheduleConfig, ScheduleError, ScheduleResult, parse_weekday};
