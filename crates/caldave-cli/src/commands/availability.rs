//! Offline availability: runs the engine against the events file without
//! starting a server.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use caldave_core::{AvailableSlot, ScheduleConfig, available_slots, format_time_of_day, parse_date_prefix};
use caldave_protocol::{Message, encode_text};
use caldave_sync::CalendarSync;
use chrono::NaiveDate;

use crate::cli::AvailabilityArgs;
use crate::config::FileConfig;
use crate::error::{CliError, CliResult};

use super::open_source;

/// Prints the free slots of the requested date.
pub async fn run(args: &AvailabilityArgs, config: &FileConfig) -> CliResult<()> {
    let date = parse_date_prefix(&args.date).ok_or_else(|| CliError::InvalidDate(args.date.clone()))?;
    let schedule = config.schedule.to_schedule()?;
    let events_file = args
        .events_file
        .as_deref()
        .or(config.sync.events_file.as_deref());

    let slots = slots_for(date, events_file, &schedule).await?;
    if args.json {
        println!(
            "{}",
            encode_text(&Message::availability_response(&args.date, slots))?
        );
    } else {
        print!("{}", render(date, &slots));
    }
    Ok(())
}

/// Fetches the busy intervals of `date` and computes its free slots.
pub async fn slots_for(
    date: NaiveDate,
    events_file: Option<&Path>,
    schedule: &ScheduleConfig,
) -> CliResult<Vec<AvailableSlot>> {
    let sync = CalendarSync::new(Arc::new(open_source(events_file)?));
    let intervals = sync.fetch_busy_intervals(date, date).await?;
    Ok(available_slots(date, &intervals, schedule))
}

/// Human readable slot table.
pub fn render(date: NaiveDate, slots: &[AvailableSlot]) -> String {
    let mut out = format!("{}\n", date.format("%Y-%m-%d (%a)"));
    if slots.is_empty() {
        out.push_str("  no availability\n");
        return out;
    }
    for slot in slots {
        let _ = writeln!(
            out,
            "  {}-{}  ({} min)",
            format_time_of_day(slot.start),
            format_time_of_day(slot.end),
            slot.minutes()
        );
    }
    out
}
