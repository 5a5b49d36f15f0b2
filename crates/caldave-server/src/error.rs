//! Server error types.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error on an accepted connection.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Listening socket could not be bound.
    #[error("cannot listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// Frame could not be encoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] caldave_protocol::ProtocolError),

    /// The initial calendar sync failed.
    #[error("initial calendar sync failed: {0}")]
    StartupSync(#[source] caldave_sync::SyncError),

    /// The hub control loop has stopped.
    #[error("hub is not running")]
    HubClosed,

    /// The scheduler has stopped.
    #[error("scheduler is not running")]
    SchedulerClosed,

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl ServerError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
