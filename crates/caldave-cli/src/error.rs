//! CLI error types.

use std::path::PathBuf;

use caldave_core::{LoggingError, ScheduleError};
use caldave_protocol::ProtocolError;
use caldave_server::ServerError;
use caldave_sync::{IntegrationError, SyncError};
use thiserror::Error;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// The configuration file could not be read.
    #[error("failed to read config {}: {source}", path.display())]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for this schema.
    #[error("failed to parse config {}: {source}", path.display())]
    ParseConfig {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// The configuration could not be rendered.
    #[error("failed to serialize config: {0}")]
    SerializeConfig(#[from] toml::ser::Error),

    /// A configuration value is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Business hours in the configuration are invalid.
    #[error("invalid schedule: {0}")]
    Schedule(#[from] ScheduleError),

    /// A date argument could not be parsed.
    #[error("invalid date {0:?} (expected YYYY-MM-DD)")]
    InvalidDate(String),

    /// Logging could not be initialized.
    #[error(transparent)]
    Logging(#[from] LoggingError),

    /// The events file could not be loaded.
    #[error("events file: {0}")]
    EventsFile(#[from] IntegrationError),

    /// A message could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Fetching events failed.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// The server failed.
    #[error(transparent)]
    Server(#[from] ServerError),
}
