//! Inbound message dispatch.

use std::sync::Arc;

use caldave_core::{ScheduleConfig, available_slots};
use caldave_protocol::{AvailabilityRequest, Message, decode_text};
use chrono::NaiveDate;
use caldave_sync::CalendarSync;
use tracing::{debug, instrument, warn};

use crate::cache::BusyCache;
use crate::error::ServerResult;
use crate::hub::HubHandle;

/// Routes decoded frames to their handlers.
///
/// Availability answers and update notices go back to the requesting
/// session only; everything else is relayed to all sessions verbatim.
#[derive(Debug, Clone)]
pub struct Router {
    hub: HubHandle,
    cache: BusyCache,
    sync: CalendarSync,
    schedule: Arc<ScheduleConfig>,
}

impl Router {
    pub fn new(
        hub: HubHandle,
        cache: BusyCache,
        sync: CalendarSync,
        schedule: Arc<ScheduleConfig>,
    ) -> Self {
        Self {
            hub,
            cache,
            sync,
            schedule,
        }
    }

    /// Handles one inbound text frame from `session_id`.
    ///
    /// Undecodable frames are logged and dropped. The only error returned is
    /// a stopped hub.
    #[instrument(skip_all, fields(session_id = %session_id, len = text.len()))]
    pub async fn route(&self, session_id: &str, text: &str) -> ServerResult<()> {
        let message = match decode_text(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "dropping undecodable message");
                return Ok(());
            }
        };

        match message {
            Message::RequestAvailability { request, day } => {
                self.availability(session_id, &request, day).await
            }
            Message::UpdateAvailability { start, end, .. } => {
                self.update(session_id, start, end).await
            }
            other => {
                debug!(kind = %other.kind(), "relaying");
                self.hub.broadcast_text(text).await
            }
        }
    }

    async fn availability(
        &self,
        session_id: &str,
        request: &AvailabilityRequest,
        day: NaiveDate,
    ) -> ServerResult<()> {
        let snapshot = self.cache.snapshot().await;
        let slots = available_slots(day, &snapshot.intervals, &self.schedule);
        debug!(date = %day, slots = slots.len(), "computed availability");

        let response = Message::availability_response(request.date.clone(), slots);
        self.hub.deliver(session_id, &response).await
    }

    async fn update(&self, session_id: &str, start: NaiveDate, end: NaiveDate) -> ServerResult<()> {
        match self.sync.fetch_busy_intervals(start, end).await {
            Ok(intervals) => {
                self.cache.replace(intervals, start, end).await;
                self.hub.deliver(session_id, &Message::EventsUpdated).await
            }
            Err(e) => {
                warn!(error = %e, %start, %end, "calendar sync failed, keeping cached events");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::{Hub, Outbound};
    use caldave_sync::{
        CalendarInfo, ErrorSource, IntegrationError, MemorySource, SourceEvent,
    };
    use tokio::sync::mpsc;

    const SESSION: &str = "127.0.0.1:5000";
    const OTHER: &str = "127.0.0.1:5001";

    struct Fixture {
        hub: HubHandle,
        router: Router,
        cache: BusyCache,
        requester: mpsc::Receiver<Outbound>,
        other: mpsc::Receiver<Outbound>,
    }

    async fn fixture(sync: CalendarSync) -> Fixture {
        let (hub, _task) = Hub::spawn(16);
        let (tx, requester) = mpsc::channel(8);
        hub.register(SESSION, tx).await.unwrap();
        let (tx, other) = mpsc::channel(8);
        hub.register(OTHER, tx).await.unwrap();

        let cache = BusyCache::new();
        let router = Router::new(
            hub.clone(),
            cache.clone(),
            sync,
            Arc::new(ScheduleConfig::default()),
        );
        Fixture {
            hub,
            router,
            cache,
            requester,
            other,
        }
    }

    fn memory_sync() -> CalendarSync {
        CalendarSync::new(Arc::new(MemorySource::new().with_calendar(
            CalendarInfo::new("work", "Work"),
            vec![SourceEvent::new(
                "Lunch",
                "2024-10-14T12:00:00Z",
                "2024-10-14T12:30:00Z",
            )],
        )))
    }

    fn json(frame: &Outbound) -> serde_json::Value {
        serde_json::from_str(frame).unwrap()
    }

    #[tokio::test]
    async fn update_then_availability() {
        let mut f = fixture(memory_sync()).await;

        f.router
            .route(
                SESSION,
                r#"{"type":"UPDATE_AVAILABILITY","payload":{"startDate":"2024-10-01","endDate":"2024-10-31"}}"#,
            )
            .await
            .unwrap();
        let notice = f.requester.recv().await.unwrap();
        assert_eq!(json(&notice)["type"], "EVENTS_UPDATED");
        assert_eq!(f.cache.snapshot().await.len(), 1);

        // Monday 2024-10-14: 08:00-17:00 with a 10 minute buffer
        f.router
            .route(
                SESSION,
                r#"{"type":"REQUEST_AVAILABILITY","payload":{"date":"2024-10-14T00:00:00.000Z"}}"#,
            )
            .await
            .unwrap();
        let response = json(&f.requester.recv().await.unwrap());
        assert_eq!(response["type"], "AVAILABILITY_RESPONSE");
        assert_eq!(response["payload"]["date"], "2024-10-14T00:00:00.000Z");
        assert_eq!(
            response["payload"]["availableTimes"],
            serde_json::json!([
                {"start": "08:00", "end": "11:50"},
                {"start": "12:40", "end": "17:00"}
            ])
        );

        // nothing leaked to the other session
        f.hub.sessions().await.unwrap();
        assert!(f.other.try_recv().is_err());
    }

    #[tokio::test]
    async fn unknown_and_echoed_types_are_broadcast_verbatim() {
        let mut f = fixture(memory_sync()).await;
        let chat = r#"{"type":"CHAT","payload":{"text":"hi","z":1,"a":2}}"#;
        let echoed = r#"{"type":"EVENTS_UPDATED","payload":null}"#;

        f.router.route(SESSION, chat).await.unwrap();
        f.router.route(SESSION, echoed).await.unwrap();

        for rx in [&mut f.requester, &mut f.other] {
            assert_eq!(rx.recv().await.unwrap().as_str(), chat);
            assert_eq!(rx.recv().await.unwrap().as_str(), echoed);
        }
    }

    #[tokio::test]
    async fn malformed_messages_are_dropped() {
        let mut f = fixture(memory_sync()).await;

        for text in [
            "{oops",
            r#"{"type":"REQUEST_AVAILABILITY","payload":{"date":"someday"}}"#,
            r#"{"type":"UPDATE_AVAILABILITY","payload":{"from":"2024-10-01"}}"#,
        ] {
            f.router.route(SESSION, text).await.unwrap();
        }

        f.hub.sessions().await.unwrap();
        assert!(f.requester.try_recv().is_err());
        assert!(f.other.try_recv().is_err());
    }

    #[tokio::test]
    async fn sync_failure_sends_nothing_and_keeps_cache() {
        let sync = CalendarSync::new(Arc::new(ErrorSource::new(
            "offline",
            IntegrationError::network("unreachable"),
        )));
        let mut f = fixture(sync).await;
        let day = chrono::NaiveDate::from_ymd_opt(2024, 10, 14).unwrap();
        f.cache.replace(Vec::new(), day, day).await;
        let before = f.cache.snapshot().await;

        f.router
            .route(
                SESSION,
                r#"{"type":"UPDATE_AVAILABILITY","payload":{"startDate":"2024-10-01","endDate":"2024-10-31"}}"#,
            )
            .await
            .unwrap();

        f.hub.sessions().await.unwrap();
        assert!(f.requester.try_recv().is_err());
        assert!(Arc::ptr_eq(&before, &f.cache.snapshot().await));
    }

    #[tokio::test]
    async fn reversed_update_range_sends_nothing() {
        let mut f = fixture(memory_sync()).await;
        f.router
            .route(
                SESSION,
                r#"{"type":"UPDATE_AVAILABILITY","payload":{"startDate":"2024-10-31","endDate":"2024-10-01"}}"#,
            )
            .await
            .unwrap();
        f.hub.sessions().await.unwrap();
        assert!(f.requester.try_recv().is_err());
        assert!(f.cache.snapshot().await.updated_at.is_none());
    }
}
