//! Shutdown signalling.
//!
//! SIGTERM and SIGINT (Ctrl+C elsewhere) flip a watch channel that the
//! listener, the scheduler and the CLI wait on.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info};

/// Listens for process signals and fans out a shutdown flag.
pub struct SignalHandler {
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalHandler {
    pub fn new() -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
        }
    }

    /// Spawns the task waiting for SIGTERM or SIGINT.
    #[cfg(unix)]
    pub fn spawn_listener(&self) {
        let shutdown_tx = Arc::clone(&self.shutdown_tx);

        tokio::spawn(async move {
            use tokio::signal::unix::{SignalKind, signal};

            let (mut sigterm, mut sigint) =
                match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                    (Ok(term), Ok(int)) => (term, int),
                    (Err(e), _) | (_, Err(e)) => {
                        error!(error = %e, "cannot install signal handlers, falling back to ctrl-c");
                        if tokio::signal::ctrl_c().await.is_ok() {
                            let _ = shutdown_tx.send(true);
                        }
                        return;
                    }
                };

            tokio::select! {
                _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
                _ = sigint.recv() => info!("received SIGINT, shutting down"),
            }
            let _ = shutdown_tx.send(true);
            debug!("signal listener stopped");
        });
    }

    /// Spawns the task waiting for Ctrl+C.
    #[cfg(not(unix))]
    pub fn spawn_listener(&self) {
        let shutdown_tx = Arc::clone(&self.shutdown_tx);

        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("received Ctrl+C, shutting down");
                let _ = shutdown_tx.send(true);
            }
        });
    }

    /// Returns true if shutdown has been signalled.
    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Returns a handle that can trigger or await shutdown.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: Arc::clone(&self.shutdown_tx),
            rx: self.shutdown_rx.clone(),
        }
    }
}

/// Future-like value completing once shutdown is signalled.
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Waits for the shutdown flag. Also returns if every sender is gone.
    pub async fn wait(mut self) {
        let _ = self.rx.wait_for(|flag| *flag).await;
    }
}

/// Cloneable handle for triggering or awaiting shutdown.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        SignalHandler::new().shutdown_handle()
    }
}

impl ShutdownHandle {
    /// Triggers shutdown.
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }

    /// Returns true if shutdown has been triggered.
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Returns a future completing when shutdown is triggered.
    pub fn wait(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.rx.clone(),
        }
    }
}
