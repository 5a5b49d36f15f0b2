//! Serve command: runs the server in the foreground until SIGINT/SIGTERM.

use std::sync::Arc;

use caldave_server::{Server, SignalHandler};
use caldave_sync::CalendarSource;
use tracing::info;

use crate::config::FileConfig;
use crate::error::CliResult;

use super::open_source;

/// Starts the server and blocks until a shutdown signal arrives.
///
/// A failed initial sync, an unusable configuration or a failed bind are
/// returned as errors so the process exits non-zero.
pub async fn run(config: &FileConfig) -> CliResult<()> {
    let server_config = config.server_config()?;
    let source: Arc<dyn CalendarSource> =
        Arc::new(open_source(config.sync.events_file.as_deref())?);

    let signal_handler = SignalHandler::new();
    signal_handler.spawn_listener();
    let shutdown = signal_handler.shutdown_handle();

    let running = Server::new(server_config, source).start().await?;
    info!(addr = %running.local_addr(), "caldave ready");

    shutdown.wait().wait().await;
    info!("shutting down");
    running.shutdown().await?;
    Ok(())
}
