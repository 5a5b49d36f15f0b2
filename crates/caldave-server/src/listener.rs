//! WebSocket listener.
//!
//! Accepts TCP connections, performs the WebSocket handshake on any path and
//! starts a session per connection.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio_tungstenite::accept_async;
use tracing::{debug, error, info, warn};

use crate::error::{ServerError, ServerResult};
use crate::hub::HubHandle;
use crate::router::Router;
use crate::session::run_session;

/// TCP listener upgrading connections to WebSocket sessions.
pub struct WsListener {
    listener: TcpListener,
    connection_semaphore: Arc<Semaphore>,
    mailbox_capacity: usize,
}

impl WsListener {
    /// Binds the listener.
    pub async fn bind(
        addr: SocketAddr,
        max_connections: usize,
        mailbox_capacity: usize,
    ) -> ServerResult<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local = listener.local_addr()?;
        info!(addr = %local, "listening for websocket connections");

        Ok(Self {
            listener,
            connection_semaphore: Arc::new(Semaphore::new(max_connections.max(1))),
            mailbox_capacity,
        })
    }

    /// Returns the bound address.
    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections forever.
    pub async fn run(&self, hub: HubHandle, router: Router) -> ServerResult<()> {
        loop {
            let permit = match Arc::clone(&self.connection_semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return Ok(()),
            };

            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                    continue;
                }
            };
            debug!(%peer, "accepted connection");

            let hub = hub.clone();
            let router = router.clone();
            let mailbox_capacity = self.mailbox_capacity;
            tokio::spawn(async move {
                let _permit = permit;
                match accept_async(stream).await {
                    Ok(ws) => run_session(ws, peer, hub, router, mailbox_capacity).await,
                    Err(e) => warn!(%peer, error = %e, "websocket handshake failed"),
                }
            });
        }
    }

    /// Accepts connections until `shutdown` completes.
    pub async fn run_until_shutdown<S>(
        &self,
        hub: HubHandle,
        router: Router,
        shutdown: S,
    ) -> ServerResult<()>
    where
        S: Future<Output = ()> + Send,
    {
        tokio::select! {
            result = self.run(hub, router) => result,
            _ = shutdown => {
                info!("listener stopped");
                Ok(())
            }
        }
    }
}
