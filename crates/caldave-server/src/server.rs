//! Server assembly and lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;

use caldave_sync::{CalendarSource, CalendarSync, sync_window};
use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cache::BusyCache;
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::hub::{Hub, HubHandle};
use crate::listener::WsListener;
use crate::router::Router;
use crate::scheduler::{Scheduler, SchedulerConfig, SchedulerHandle};
use crate::signals::ShutdownHandle;

/// An unstarted server.
pub struct Server {
    config: ServerConfig,
    sync: CalendarSync,
}

impl Server {
    pub fn new(config: ServerConfig, source: Arc<dyn CalendarSource>) -> Self {
        Self {
            config,
            sync: CalendarSync::new(source),
        }
    }

    /// Performs the initial sync, binds the listener and spawns every task.
    ///
    /// # Errors
    ///
    /// Invalid configuration, a failed initial sync and a failed bind are
    /// all fatal.
    pub async fn start(self) -> ServerResult<RunningServer> {
        let config = self.config;
        config.validate()?;

        let (start, end) = sync_window(
            Utc::now().date_naive(),
            config.lookbehind_days,
            config.lookahead_days,
        );
        let intervals = self
            .sync
            .fetch_busy_intervals(start, end)
            .await
            .map_err(ServerError::StartupSync)?;
        info!(
            count = intervals.len(),
            source = self.sync.source_name(),
            "initial calendar sync complete"
        );
        let cache = BusyCache::new();
        cache.replace(intervals, start, end).await;

        let listener = WsListener::bind(
            config.bind_addr,
            config.max_connections,
            config.mailbox_capacity,
        )
        .await?;
        let local_addr = listener.local_addr()?;

        let (hub, hub_task) = Hub::spawn(config.hub_queue_capacity);
        let router = Router::new(
            hub.clone(),
            cache.clone(),
            self.sync.clone(),
            Arc::new(config.schedule.clone()),
        );

        let scheduler = Scheduler::new(
            SchedulerConfig::new(config.refresh_interval)
                .with_window(config.lookbehind_days, config.lookahead_days)
                .with_broadcast(config.broadcast_on_refresh),
            self.sync,
            cache.clone(),
            hub.clone(),
        );
        let scheduler_handle = scheduler.handle();
        let scheduler_task = tokio::spawn(scheduler.run());

        let shutdown = ShutdownHandle::default();
        let accept_shutdown = shutdown.wait();
        let accept_hub = hub.clone();
        let listener_task = tokio::spawn(async move {
            listener
                .run_until_shutdown(accept_hub, router, accept_shutdown.wait())
                .await
        });

        Ok(RunningServer {
            local_addr,
            hub,
            cache,
            scheduler: scheduler_handle,
            shutdown,
            hub_task,
            scheduler_task,
            listener_task,
        })
    }
}

/// A started server.
pub struct RunningServer {
    local_addr: SocketAddr,
    hub: HubHandle,
    cache: BusyCache,
    scheduler: SchedulerHandle,
    shutdown: ShutdownHandle,
    hub_task: JoinHandle<()>,
    scheduler_task: JoinHandle<()>,
    listener_task: JoinHandle<ServerResult<()>>,
}

impl RunningServer {
    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn hub(&self) -> &HubHandle {
        &self.hub
    }

    pub fn cache(&self) -> &BusyCache {
        &self.cache
    }

    pub fn scheduler(&self) -> &SchedulerHandle {
        &self.scheduler
    }

    /// Handle that stops the listener when triggered.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Stops accepting, stops the scheduler and closes every session.
    pub async fn shutdown(self) -> ServerResult<()> {
        self.shutdown.trigger();
        let listener_result = match self.listener_task.await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "listener task failed");
                Ok(())
            }
        };

        if self.scheduler.stop().await.is_ok() {
            let _ = self.scheduler_task.await;
        }
        if self.hub.shutdown().await.is_ok() {
            let _ = self.hub_task.await;
        }
        info!("server stopped");
        listener_result
    }
}
