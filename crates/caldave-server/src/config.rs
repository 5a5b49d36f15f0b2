//! Server configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use caldave_core::ScheduleConfig;

use crate::error::{ServerError, ServerResult};

/// Port used when neither the config file nor `PORT` sets one.
pub const DEFAULT_PORT: u16 = 8080;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: SocketAddr,

    /// Outbound frames buffered per session before it is evicted.
    pub mailbox_capacity: usize,

    /// Commands buffered in front of the hub control loop.
    pub hub_queue_capacity: usize,

    /// Maximum concurrent connections.
    pub max_connections: usize,

    /// Time between periodic calendar refreshes.
    pub refresh_interval: Duration,

    /// Days before today covered by the periodic refresh.
    pub lookbehind_days: u64,

    /// Days after today covered by the periodic refresh.
    pub lookahead_days: u64,

    /// Broadcast `EVENTS_UPDATED` after each successful periodic refresh.
    pub broadcast_on_refresh: bool,

    /// Business hours and buffer used for availability requests.
    pub schedule: ScheduleConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            mailbox_capacity: 256,
            hub_queue_capacity: 1024,
            max_connections: 1024,
            refresh_interval: Duration::from_secs(15 * 60),
            lookbehind_days: 30,
            lookahead_days: 60,
            broadcast_on_refresh: true,
            schedule: ScheduleConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Creates a configuration listening on `bind_addr`.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Default::default()
        }
    }

    /// Builder: set the listening port, keeping the address.
    pub fn with_port(mut self, port: u16) -> Self {
        self.bind_addr.set_port(port);
        self
    }

    /// Builder: set the per-session mailbox capacity.
    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity;
        self
    }

    /// Builder: set max connections.
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Builder: set the periodic refresh interval.
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Builder: set the refresh window around today.
    pub fn with_sync_window(mut self, lookbehind_days: u64, lookahead_days: u64) -> Self {
        self.lookbehind_days = lookbehind_days;
        self.lookahead_days = lookahead_days;
        self
    }

    /// Builder: toggle the post-refresh broadcast.
    pub fn with_broadcast_on_refresh(mut self, enabled: bool) -> Self {
        self.broadcast_on_refresh = enabled;
        self
    }

    /// Builder: set the schedule.
    pub fn with_schedule(mut self, schedule: ScheduleConfig) -> Self {
        self.schedule = schedule;
        self
    }

    /// Rejects values the server cannot run with.
    pub fn validate(&self) -> ServerResult<()> {
        if self.mailbox_capacity == 0 {
            return Err(ServerError::config("mailbox_capacity must be at least 1"));
        }
        if self.hub_queue_capacity == 0 {
            return Err(ServerError::config("hub_queue_capacity must be at least 1"));
        }
        if self.max_connections == 0 {
            return Err(ServerError::config("max_connections must be at least 1"));
        }
        if self.refresh_interval.is_zero() {
            return Err(ServerError::config("refresh interval must be positive"));
        }
        Ok(())
    }
}
