//! File configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/caldave/config.toml` by default. Values are layered: built-in
//! defaults, then the file, then the `PORT` environment variable, then
//! command-line flags.
//!
//! ```toml
//! [server]
//! port = 8080
//!
//! [sync]
//! refresh_interval_secs = 900
//! events_file = "/var/lib/caldave/events.json"
//!
//! [schedule]
//! buffer_minutes = 10
//! default = { open = "08:00", close = "17:30" }
//!
//! [schedule.weekdays]
//! saturday = { open = "10:00", close = "14:00" }
//! sunday = { open = "00:00", close = "00:00" }
//! ```
//!
//! A `[schedule.weekdays]` table replaces the built-in overrides as a
//! whole; weekdays it leaves out use `default`.

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use caldave_core::{
    BusinessHours, LogFormat, LoggingConfig, ScheduleConfig, format_time_of_day, parse_weekday,
};
use caldave_server::{DEFAULT_PORT, ServerConfig};
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::cli::ServeArgs;
use crate::error::{CliError, CliResult};

/// Environment variable overriding the listening port.
pub const PORT_ENV: &str = "PORT";

/// Contents of `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Log output settings.
    pub logging: LoggingSettings,

    /// Listener settings.
    pub server: ServerSettings,

    /// Calendar refresh settings.
    pub sync: SyncSettings,

    /// Business hours.
    pub schedule: ScheduleSettings,
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default level when `RUST_LOG` is unset.
    pub level: String,

    /// `pretty`, `compact` or `json`.
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

/// Listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Address to bind.
    pub bind: IpAddr,

    /// Port to listen on.
    pub port: u16,

    /// Outbound frames buffered per session.
    pub mailbox_capacity: usize,

    /// Maximum concurrent connections.
    pub max_connections: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        let defaults = ServerConfig::default();
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            mailbox_capacity: defaults.mailbox_capacity,
            max_connections: defaults.max_connections,
        }
    }
}

/// Calendar refresh settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Seconds between periodic refreshes.
    pub refresh_interval_secs: u64,

    /// Days before today to fetch.
    pub lookbehind_days: u64,

    /// Days after today to fetch.
    pub lookahead_days: u64,

    /// Broadcast `EVENTS_UPDATED` after each periodic refresh.
    pub broadcast_on_refresh: bool,

    /// JSON events file used as the calendar source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events_file: Option<PathBuf>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        let defaults = ServerConfig::default();
        Self {
            refresh_interval_secs: defaults.refresh_interval.as_secs(),
            lookbehind_days: defaults.lookbehind_days,
            lookahead_days: defaults.lookahead_days,
            broadcast_on_refresh: defaults.broadcast_on_refresh,
            events_file: None,
        }
    }
}

/// Opening hours as written in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoursSettings {
    /// Opening time, `HH:MM`.
    pub open: String,
    /// Closing time, `HH:MM`.
    pub close: String,
}

impl HoursSettings {
    fn to_hours(&self) -> CliResult<BusinessHours> {
        Ok(BusinessHours::parse(&self.open, &self.close)?)
    }
}

impl From<BusinessHours> for HoursSettings {
    fn from(hours: BusinessHours) -> Self {
        Self {
            open: format_time_of_day(hours.open),
            close: format_time_of_day(hours.close),
        }
    }
}

/// Business hours as written in the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    /// Minutes kept free before and after every busy interval.
    pub buffer_minutes: u32,

    /// Hours for weekdays without an override.
    pub default: HoursSettings,

    /// Per-weekday overrides keyed by weekday name.
    pub weekdays: BTreeMap<String, HoursSettings>,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self::from(&ScheduleConfig::default())
    }
}

impl From<&ScheduleConfig> for ScheduleSettings {
    fn from(schedule: &ScheduleConfig) -> Self {
        Self {
            buffer_minutes: u32::try_from(schedule.buffer().num_minutes()).unwrap_or(0),
            default: schedule.default_hours().into(),
            weekdays: schedule
                .overrides()
                .into_iter()
                .map(|(day, hours)| (weekday_key(day).to_string(), hours.into()))
                .collect(),
        }
    }
}

impl ScheduleSettings {
    /// Builds the engine schedule.
    pub fn to_schedule(&self) -> CliResult<ScheduleConfig> {
        let mut schedule =
            ScheduleConfig::new(self.default.to_hours()?).with_buffer_minutes(self.buffer_minutes);
        for (name, hours) in &self.weekdays {
            schedule = schedule.with_weekday(parse_weekday(name)?, hours.to_hours()?);
        }
        Ok(schedule)
    }
}

fn weekday_key(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

impl FileConfig {
    /// Loads `path`, or the default path if `path` is `None`.
    ///
    /// A missing file at the default path yields the defaults; an explicit
    /// path must exist.
    pub fn load(path: Option<&Path>) -> CliResult<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| CliError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| CliError::ParseConfig {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("caldave")
            .join("config.toml")
    }

    /// Applies the value of `PORT`, if set.
    pub fn apply_port_env(&mut self, value: Option<&str>) -> CliResult<()> {
        if let Some(value) = value {
            self.server.port = value
                .trim()
                .parse()
                .map_err(|_| CliError::Config(format!("{PORT_ENV}={value:?} is not a valid port")))?;
        }
        Ok(())
    }

    /// Applies `serve` flags.
    pub fn apply_serve_args(&mut self, args: &ServeArgs) {
        if let Some(bind) = args.bind {
            self.server.bind = bind;
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }
        if let Some(ref events_file) = args.events_file {
            self.sync.events_file = Some(events_file.clone());
        }
        if let Some(secs) = args.refresh_interval {
            self.sync.refresh_interval_secs = secs;
        }
    }

    /// Builds the server configuration.
    pub fn server_config(&self) -> CliResult<ServerConfig> {
        let config = ServerConfig::new(SocketAddr::new(self.server.bind, self.server.port))
            .with_mailbox_capacity(self.server.mailbox_capacity)
            .with_max_connections(self.server.max_connections)
            .with_refresh_interval(Duration::from_secs(self.sync.refresh_interval_secs))
            .with_sync_window(self.sync.lookbehind_days, self.sync.lookahead_days)
            .with_broadcast_on_refresh(self.sync.broadcast_on_refresh)
            .with_schedule(self.schedule.to_schedule()?);
        config.validate()?;
        Ok(config)
    }

    /// Builds the logging configuration, `debug` winning over the file.
    pub fn logging_config(&self, debug: bool, format: Option<&str>) -> CliResult<LoggingConfig> {
        let mut config = if debug {
            LoggingConfig::debug()
        } else {
            let level: Level = self.logging.level.parse().map_err(|_| {
                CliError::Config(format!("unknown log level {:?}", self.logging.level))
            })?;
            LoggingConfig::daemon()
                .with_level(level)
                .with_format(self.logging.format.parse::<LogFormat>()?)
        };
        if let Some(format) = format {
            config = config.with_format(format.parse::<LogFormat>()?);
        }
        Ok(config)
    }
}
