//! Periodic calendar refresh.
//!
//! The scheduler refetches the window around today on a fixed interval,
//! swaps the busy cache on success and optionally tells every session.
//! Failures keep the previous cache and are retried on the next tick.

use std::sync::Arc;
use std::time::Duration;

use caldave_protocol::Message;
use caldave_sync::{CalendarSync, sync_window};
use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, mpsc};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::cache::BusyCache;
use crate::error::{ServerError, ServerResult};
use crate::hub::HubHandle;

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between refreshes.
    pub refresh_interval: Duration,
    /// Days before today to fetch.
    pub lookbehind_days: u64,
    /// Days after today to fetch.
    pub lookahead_days: u64,
    /// Broadcast `EVENTS_UPDATED` after a successful refresh.
    pub broadcast_on_refresh: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(15 * 60),
            lookbehind_days: 30,
            lookahead_days: 60,
            broadcast_on_refresh: true,
        }
    }
}

impl SchedulerConfig {
    pub fn new(refresh_interval: Duration) -> Self {
        Self {
            refresh_interval,
            ..Default::default()
        }
    }

    /// Builder: set the window around today.
    pub fn with_window(mut self, lookbehind_days: u64, lookahead_days: u64) -> Self {
        self.lookbehind_days = lookbehind_days;
        self.lookahead_days = lookahead_days;
        self
    }

    /// Builder: toggle the post-refresh broadcast.
    pub fn with_broadcast(mut self, enabled: bool) -> Self {
        self.broadcast_on_refresh = enabled;
        self
    }
}

/// Commands accepted by a running scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerCommand {
    /// Refresh immediately.
    SyncNow,
    /// Stop the loop.
    Stop,
}

/// Refresh bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct SchedulerState {
    /// Successful refreshes since start.
    pub total_syncs: u64,
    /// Failures since the last success.
    pub consecutive_failures: u32,
    /// Last successful refresh.
    pub last_sync: Option<DateTime<Utc>>,
    /// Last refresh attempt.
    pub last_attempt: Option<DateTime<Utc>>,
    /// Error of the last failed attempt, cleared on success.
    pub last_error: Option<String>,
    /// The last failure cannot clear up without outside action (bad
    /// configuration, missing calendar). Cleared on success.
    pub last_error_permanent: bool,
    /// Intervals stored by the last success.
    pub last_count: usize,
}

impl SchedulerState {
    /// Records a successful refresh.
    pub fn record_success(&mut self, count: usize) {
        let now = Utc::now();
        self.total_syncs += 1;
        self.consecutive_failures = 0;
        self.last_sync = Some(now);
        self.last_attempt = Some(now);
        self.last_error = None;
        self.last_error_permanent = false;
        self.last_count = count;
    }

    /// Records a failed refresh.
    pub fn record_failure(&mut self, error: impl Into<String>, retryable: bool) {
        self.consecutive_failures += 1;
        self.last_attempt = Some(Utc::now());
        self.last_error = Some(error.into());
        self.last_error_permanent = !retryable;
    }
}

/// Shared scheduler state.
pub type SharedSchedulerState = Arc<RwLock<SchedulerState>>;

/// The refresh loop.
pub struct Scheduler {
    config: SchedulerConfig,
    sync: CalendarSync,
    cache: BusyCache,
    hub: HubHandle,
    state: SharedSchedulerState,
    command_tx: mpsc::Sender<SchedulerCommand>,
    command_rx: mpsc::Receiver<SchedulerCommand>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig, sync: CalendarSync, cache: BusyCache, hub: HubHandle) -> Self {
        let (command_tx, command_rx) = mpsc::channel(16);
        Self {
            config,
            sync,
            cache,
            hub,
            state: Arc::new(RwLock::new(SchedulerState::default())),
            command_tx,
            command_rx,
        }
    }

    /// Returns a handle for sending commands.
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            command_tx: self.command_tx.clone(),
            state: Arc::clone(&self.state),
        }
    }

    /// Runs until stopped. The first refresh happens one interval after start
    /// and later ones keep a fixed period, whatever `SyncNow` does.
    pub async fn run(mut self) {
        let period = self.config.refresh_interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = self.config.refresh_interval.as_secs(),
            lookbehind_days = self.config.lookbehind_days,
            lookahead_days = self.config.lookahead_days,
            "scheduler started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.refresh().await;
                }
                command = self.command_rx.recv() => match command {
                    Some(SchedulerCommand::SyncNow) => {
                        debug!("sync requested");
                        self.refresh().await;
                    }
                    Some(SchedulerCommand::Stop) | None => {
                        info!("scheduler stopping");
                        break;
                    }
                },
            }
        }
    }

    async fn refresh(&self) {
        let (start, end) = sync_window(
            Utc::now().date_naive(),
            self.config.lookbehind_days,
            self.config.lookahead_days,
        );

        match self.sync.fetch_busy_intervals(start, end).await {
            Ok(intervals) => {
                let count = intervals.len();
                self.cache.replace(intervals, start, end).await;
                self.state.write().await.record_success(count);
                info!(count, %start, %end, "calendar refreshed");

                if self.config.broadcast_on_refresh
                    && let Err(e) = self.hub.broadcast(&Message::EventsUpdated).await
                {
                    warn!(error = %e, "cannot announce refresh");
                }
            }
            Err(e) => {
                let retryable = e.is_retryable();
                let mut state = self.state.write().await;
                state.record_failure(e.to_string(), retryable);
                if retryable {
                    warn!(
                        error = %e,
                        failures = state.consecutive_failures,
                        "calendar refresh failed, keeping cached events"
                    );
                } else {
                    error!(
                        error = %e,
                        failures = state.consecutive_failures,
                        "calendar refresh failed and needs attention, keeping cached events"
                    );
                }
            }
        }
    }
}

/// Handle to a running scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    command_tx: mpsc::Sender<SchedulerCommand>,
    state: SharedSchedulerState,
}

impl SchedulerHandle {
    /// Requests an immediate refresh.
    pub async fn sync_now(&self) -> ServerResult<()> {
        self.command_tx
            .send(SchedulerCommand::SyncNow)
            .await
            .map_err(|_| ServerError::SchedulerClosed)
    }

    /// Stops the scheduler.
    pub async fn stop(&self) -> ServerResult<()> {
        self.command_tx
            .send(SchedulerCommand::Stop)
            .await
            .map_err(|_| ServerError::SchedulerClosed)
    }

    /// Returns a copy of the current state.
    pub async fn state(&self) -> SchedulerState {
        self.state.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::{Hub, Outbound};
    use caldave_sync::{
        CalendarInfo, ErrorSource, IntegrationError, MemorySource, SourceEvent,
    };

    const INTERVAL: Duration = Duration::from_secs(15 * 60);

    fn todays_event() -> SourceEvent {
        let today = Utc::now().date_naive();
        SourceEvent::new(
            "Planning",
            format!("{today}T10:00:00Z"),
            format!("{today}T11:00:00Z"),
        )
    }

    fn memory_sync() -> CalendarSync {
        CalendarSync::new(Arc::new(
            MemorySource::new().with_calendar(CalendarInfo::new("work", "Work"), vec![todays_event()]),
        ))
    }

    async fn listener(hub: &HubHandle) -> mpsc::Receiver<Outbound> {
        let (tx, rx) = mpsc::channel(8);
        hub.register("listener", tx).await.unwrap();
        rx
    }

    #[test]
    fn state_bookkeeping() {
        let mut state = SchedulerState::default();
        state.record_failure("boom", true);
        state.record_failure("boom again", false);
        assert_eq!(state.consecutive_failures, 2);
        assert_eq!(state.last_error.as_deref(), Some("boom again"));
        assert!(state.last_error_permanent);
        assert!(state.last_sync.is_none());

        state.record_success(3);
        assert_eq!(state.consecutive_failures, 0);
        assert_eq!(state.total_syncs, 1);
        assert_eq!(state.last_count, 3);
        assert!(state.last_error.is_none());
        assert!(!state.last_error_permanent);
    }

    #[tokio::test(start_paused = true)]
    async fn refreshes_on_interval_and_broadcasts() {
        let (hub, _hub_task) = Hub::spawn(16);
        let mut rx = listener(&hub).await;
        let cache = BusyCache::new();

        let scheduler = Scheduler::new(SchedulerConfig::new(INTERVAL), memory_sync(), cache.clone(), hub);
        let handle = scheduler.handle();
        let task = tokio::spawn(scheduler.run());

        // nothing before the first tick
        tokio::time::sleep(INTERVAL / 2).await;
        assert_eq!(handle.state().await.total_syncs, 0);

        tokio::time::sleep(INTERVAL).await;
        let state = handle.state().await;
        assert_eq!(state.total_syncs, 1);
        assert_eq!(state.last_count, 1);
        assert_eq!(cache.snapshot().await.len(), 1);
        assert_eq!(
            rx.recv().await.unwrap().as_str(),
            r#"{"type":"EVENTS_UPDATED","payload":null}"#
        );

        handle.stop().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn sync_now_without_broadcast() {
        let (hub, _hub_task) = Hub::spawn(16);
        let mut rx = listener(&hub).await;
        let cache = BusyCache::new();

        let config = SchedulerConfig::new(INTERVAL).with_broadcast(false);
        let scheduler = Scheduler::new(config, memory_sync(), cache.clone(), hub.clone());
        let handle = scheduler.handle();
        let task = tokio::spawn(scheduler.run());

        handle.sync_now().await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(handle.state().await.total_syncs, 1);
        assert_eq!(cache.snapshot().await.len(), 1);
        hub.sessions().await.unwrap();
        assert!(rx.try_recv().is_err());

        handle.stop().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn failure_keeps_previous_cache() {
        let (hub, _hub_task) = Hub::spawn(16);
        let mut rx = listener(&hub).await;
        let cache = BusyCache::new();
        let today = Utc::now().date_naive();
        cache.replace(Vec::new(), today, today).await;
        let before = cache.snapshot().await;

        let sync = CalendarSync::new(Arc::new(ErrorSource::new(
            "offline",
            IntegrationError::network("unreachable"),
        )));
        let scheduler = Scheduler::new(SchedulerConfig::new(INTERVAL), sync, cache.clone(), hub.clone());
        let handle = scheduler.handle();
        let task = tokio::spawn(scheduler.run());

        tokio::time::sleep(INTERVAL * 2 + Duration::from_secs(1)).await;

        let state = handle.state().await;
        assert_eq!(state.consecutive_failures, 2);
        assert!(state.last_error.as_deref().unwrap_or_default().contains("unreachable"));
        assert!(!state.last_error_permanent);
        assert!(Arc::ptr_eq(&before, &cache.snapshot().await));
        hub.sessions().await.unwrap();
        assert!(rx.try_recv().is_err());

        handle.stop().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn sync_now_does_not_delay_periodic_refresh() {
        let (hub, _hub_task) = Hub::spawn(16);
        let cache = BusyCache::new();
        let config = SchedulerConfig::new(INTERVAL).with_broadcast(false);
        let scheduler = Scheduler::new(config, memory_sync(), cache, hub);
        let handle = scheduler.handle();
        let task = tokio::spawn(scheduler.run());

        tokio::time::sleep(INTERVAL / 2).await;
        handle.sync_now().await.unwrap();

        // the periodic tick still lands at INTERVAL
        tokio::time::sleep(INTERVAL / 2 + Duration::from_secs(1)).await;
        assert_eq!(handle.state().await.total_syncs, 2);

        handle.stop().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn misconfigured_source_is_flagged_permanent() {
        let (hub, _hub_task) = Hub::spawn(16);
        let sync = CalendarSync::new(Arc::new(ErrorSource::new(
            "memory",
            IntegrationError::configuration("cannot read events file"),
        )));
        let scheduler = Scheduler::new(SchedulerConfig::new(INTERVAL), sync, BusyCache::new(), hub);
        let handle = scheduler.handle();
        let task = tokio::spawn(scheduler.run());

        handle.sync_now().await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        let state = handle.state().await;
        assert_eq!(state.consecutive_failures, 1);
        assert!(state.last_error_permanent);

        handle.stop().await.unwrap();
        task.await.unwrap();
    }
}
