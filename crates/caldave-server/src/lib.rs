//! Real-time booking server.
//!
//! This crate provides the caldave server that handles:
//! - WebSocket sessions, one reader and one writer task each
//! - A hub task owning the session registry and fanning out broadcasts
//! - Availability requests answered from a cached set of busy intervals
//! - Periodic calendar refresh through a [`CalendarSource`](caldave_sync::CalendarSource)
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use caldave_server::{Server, ServerConfig};
//! use caldave_sync::MemorySource;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::new(ServerConfig::default(), Arc::new(MemorySource::new()));
//!     let running = server.start().await?;
//!     tokio::signal::ctrl_c().await?;
//!     running.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod cache;
mod config;
mod error;
mod hub;
mod listener;
mod router;
mod scheduler;
mod server;
mod session;
mod signals;

pub use cache::{BusyCache, CacheSnapshot};
pub use config::{DEFAULT_PORT, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use hub::{Hub, HubHandle, Outbound, SessionId, SessionTicket};
pub use listener::WsListener;
pub use router::Router;
pub use scheduler::{
    Scheduler, SchedulerCommand, SchedulerConfig, SchedulerHandle, SchedulerState,
    SharedSchedulerState,
};
pub use server::{RunningServer, Server};
pub use session::run_session;
pub use signals::{ShutdownHandle, ShutdownSignal, SignalHandler};
