//! Subcommand implementations.

pub mod availability;
pub mod config;
pub mod serve;

use std::path::Path;

use caldave_sync::MemorySource;
use tracing::{info, warn};

use crate::error::CliResult;

/// Opens the calendar source: the events file if one is configured, an
/// empty calendar otherwise.
pub(crate) fn open_source(events_file: Option<&Path>) -> CliResult<MemorySource> {
    match events_file {
        Some(path) => {
            let source = MemorySource::from_path(path)?;
            info!(path = %path.display(), "using events file");
            Ok(source)
        }
        None => {
            warn!("no events file configured, every business hour is free");
            Ok(MemorySource::new())
        }
    }
}
