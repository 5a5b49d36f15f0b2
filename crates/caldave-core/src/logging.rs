//! Logging setup shared by the daemon and the command-line tools.
//!
//! ```ignore
//! use caldave_core::logging::{init_logging, LoggingConfig};
//!
//! init_logging(&LoggingConfig::daemon())?;
//! ```
//!
//! `RUST_LOG` always wins over the configured default level.

use std::str::FromStr;

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    prelude::*,
};

/// Errors that can occur while installing the global subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// A subscriber was already installed.
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    /// The filter directive could not be parsed.
    #[error("failed to parse log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    /// Unknown log format name.
    #[error("unknown log format {0:?} (expected pretty, compact or json)")]
    UnknownFormat(String),
}

/// Output format of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line human readable output.
    Pretty,
    /// One line per event.
    #[default]
    Compact,
    /// Newline-delimited JSON, for log shippers.
    Json,
}

impl FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(LoggingError::UnknownFormat(other.to_string())),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Level applied to the `caldave` crates when `RUST_LOG` is unset.
    pub level: Level,
    /// Output format.
    pub format: LogFormat,
    /// Include source file and line.
    pub with_location: bool,
    /// Emit span open/close events.
    pub with_span_events: bool,
    /// Explicit filter directive, overriding `level`.
    pub filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Compact,
            with_location: false,
            with_span_events: false,
            filter: None,
        }
    }
}

impl LoggingConfig {
    /// Settings for the long running server.
    #[must_use]
    pub fn daemon() -> Self {
        Self {
            with_location: true,
            ..Self::default()
        }
    }

    /// Settings for `--debug` runs.
    #[must_use]
    pub fn debug() -> Self {
        Self {
            level: Level::DEBUG,
            format: LogFormat::Pretty,
            with_location: true,
            with_span_events: true,
            filter: None,
        }
    }

    /// Builder: set the default level.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Builder: set the output format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Builder: set an explicit filter directive.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    fn env_filter(&self) -> Result<EnvFilter, LoggingError> {
        if let Some(ref directive) = self.filter {
            return Ok(EnvFilter::try_new(directive)?);
        }
        Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("caldave={}", self.level.as_str().to_lowercase()))))
    }
}

/// Installs the global tracing subscriber.
///
/// # Errors
///
/// Fails if a subscriber is already installed or the filter is invalid.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = config.env_filter()?;
    let span_events = if config.with_span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let layer = fmt::layer()
        .with_file(config.with_location)
        .with_line_number(config.with_location)
        .with_span_events(span_events);

    let layer = match config.format {
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Json => layer.json().boxed(),
    };

    tracing::subscriber::set_global_default(tracing_subscriber::registry().with(filter).with(layer))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert_eq!(config.format, LogFormat::Compact);
        assert!(config.filter.is_none());
    }

    #[test]
    fn debug_preset() {
        let config = LoggingConfig::debug();
        assert_eq!(config.level, Level::DEBUG);
        assert!(config.with_span_events);
    }

    #[test]
    fn format_names() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("Pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!(matches!(
            "xml".parse::<LogFormat>(),
            Err(LoggingError::UnknownFormat(_))
        ));
    }

    #[test]
    fn explicit_filter_is_validated() {
        let config = LoggingConfig::default().with_filter("caldave=trace,tokio=warn");
        assert!(config.env_filter().is_ok());

        let config = LoggingConfig::default().with_filter("caldave=[");
        assert!(config.env_filter().is_err());
    }
}
