//! End-to-end tests using a real WebSocket client.

use std::sync::Arc;
use std::time::Duration;

use caldave_server::{RunningServer, Server, ServerConfig, ServerError};
use caldave_sync::{CalendarInfo, ErrorSource, IntegrationError, MemorySource, SourceEvent};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

const TIMEOUT: Duration = Duration::from_secs(5);

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

fn source() -> MemorySource {
    MemorySource::new().with_calendar(
        CalendarInfo::new("work", "Work"),
        vec![SourceEvent::new(
            "Lunch",
            "2024-10-14T12:00:00Z",
            "2024-10-14T12:30:00Z",
        )],
    )
}

async fn boot_server() -> (String, RunningServer) {
    boot_with(ServerConfig::new("127.0.0.1:0".parse().unwrap()).with_mailbox_capacity(32)).await
}

async fn boot_with(config: ServerConfig) -> (String, RunningServer) {
    let running = Server::new(config, Arc::new(source()))
        .start()
        .await
        .unwrap();
    let url = format!("ws://{}/ws", running.local_addr());
    (url, running)
}

async fn connect(url: &str) -> WsStream {
    let (ws, _) = connect_async(url).await.unwrap();
    ws
}

/// Waits until the hub has `count` sessions.
async fn wait_for_sessions(server: &RunningServer, count: usize) {
    timeout(TIMEOUT, async {
        while server.hub().sessions().await.unwrap().len() != count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("timeout waiting for sessions");
}

async fn send(ws: &mut WsStream, value: Value) {
    ws.send(Message::text(value.to_string())).await.unwrap();
}

async fn read_json(ws: &mut WsStream) -> Value {
    loop {
        let msg = timeout(TIMEOUT, ws.next())
            .await
            .expect("timeout waiting for message")
            .expect("stream closed")
            .expect("ws error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

fn update_request() -> Value {
    json!({
        "type": "UPDATE_AVAILABILITY",
        "payload": {"startDate": "2024-10-01", "endDate": "2024-10-31"}
    })
}

#[tokio::test]
async fn update_then_request_availability() {
    let (url, server) = boot_server().await;
    let mut ws = connect(&url).await;

    send(&mut ws, update_request()).await;
    let notice = read_json(&mut ws).await;
    assert_eq!(notice, json!({"type": "EVENTS_UPDATED", "payload": null}));

    send(
        &mut ws,
        json!({"type": "REQUEST_AVAILABILITY", "payload": {"date": "2024-10-14"}}),
    )
    .await;
    let response = read_json(&mut ws).await;
    assert_eq!(
        response,
        json!({
            "type": "AVAILABILITY_RESPONSE",
            "payload": {
                "date": "2024-10-14",
                "availableTimes": [
                    {"start": "08:00", "end": "11:50"},
                    {"start": "12:40", "end": "17:00"}
                ]
            }
        })
    );

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn sunday_has_no_availability() {
    let (url, server) = boot_server().await;
    let mut ws = connect(&url).await;

    send(
        &mut ws,
        json!({"type": "REQUEST_AVAILABILITY", "payload": {"date": "2024-10-20T09:00:00Z"}}),
    )
    .await;
    let response = read_json(&mut ws).await;
    assert_eq!(response["payload"]["date"], "2024-10-20T09:00:00Z");
    assert_eq!(response["payload"]["availableTimes"], json!([]));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn unknown_type_is_broadcast_to_everyone() {
    let (url, server) = boot_server().await;
    let mut alice = connect(&url).await;
    let mut bob = connect(&url).await;
    wait_for_sessions(&server, 2).await;

    let chat = json!({"type": "CHAT", "payload": {"text": "booked 10:00"}});
    send(&mut alice, chat.clone()).await;

    assert_eq!(read_json(&mut alice).await, chat);
    assert_eq!(read_json(&mut bob).await, chat);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn responses_only_reach_the_requester() {
    let (url, server) = boot_server().await;
    let mut alice = connect(&url).await;
    let mut bob = connect(&url).await;
    wait_for_sessions(&server, 2).await;

    send(
        &mut alice,
        json!({"type": "REQUEST_AVAILABILITY", "payload": {"date": "2024-10-15"}}),
    )
    .await;
    assert_eq!(read_json(&mut alice).await["type"], "AVAILABILITY_RESPONSE");

    // bob's first message is the broadcast, not alice's answer
    let marker = json!({"type": "MARKER", "payload": 1});
    send(&mut alice, marker.clone()).await;
    assert_eq!(read_json(&mut bob).await, marker);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn malformed_message_keeps_connection_open() {
    let (url, server) = boot_server().await;
    let mut ws = connect(&url).await;

    ws.send(Message::text("not valid json".to_string())).await.unwrap();
    send(
        &mut ws,
        json!({"type": "REQUEST_AVAILABILITY", "payload": {"when": "2024-10-14"}}),
    )
    .await;
    send(
        &mut ws,
        json!({"type": "REQUEST_AVAILABILITY", "payload": {"date": "2024-10-14"}}),
    )
    .await;

    let response = read_json(&mut ws).await;
    assert_eq!(response["type"], "AVAILABILITY_RESPONSE");
    assert_eq!(response["payload"]["date"], "2024-10-14");

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn disconnect_unregisters_session() {
    let (url, server) = boot_server().await;
    let mut ws = connect(&url).await;
    wait_for_sessions(&server, 1).await;

    ws.close(None).await.unwrap();
    wait_for_sessions(&server, 0).await;

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn shutdown_closes_open_sessions() {
    let (url, server) = boot_server().await;
    let mut ws = connect(&url).await;
    wait_for_sessions(&server, 1).await;

    server.shutdown().await.unwrap();

    let next = timeout(TIMEOUT, ws.next()).await.expect("timeout waiting for close");
    assert!(matches!(next, None | Some(Ok(Message::Close(_))) | Some(Err(_))));
}

#[tokio::test]
async fn evicted_session_is_closed_and_silenced() {
    let config = ServerConfig::new("127.0.0.1:0".parse().unwrap()).with_mailbox_capacity(2);
    let (url, server) = boot_with(config).await;
    let mut idle = connect(&url).await;
    let mut busy = connect(&url).await;
    wait_for_sessions(&server, 2).await;

    // idle never reads, so its socket and then its mailbox fill up
    let filler = "x".repeat(512 * 1024);
    let mut rounds = 0;
    while server.hub().sessions().await.unwrap().len() == 2 {
        assert!(rounds < 200, "idle session was never evicted");
        send(&mut busy, json!({"type": "CHAT", "payload": filler.clone()})).await;
        assert_eq!(read_json(&mut busy).await["type"], "CHAT");
        rounds += 1;
    }

    let late = json!({"type": "CHAT", "payload": "from-evicted"});
    let _ = idle.send(Message::text(late.to_string())).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    let marker = json!({"type": "MARKER", "payload": 1});
    send(&mut busy, marker.clone()).await;
    assert_eq!(read_json(&mut busy).await, marker);

    let closed = timeout(Duration::from_secs(10), async {
        loop {
            match idle.next().await {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "evicted connection was left open");

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn failed_initial_sync_is_fatal() {
    let config = ServerConfig::new("127.0.0.1:0".parse().unwrap());
    let source = ErrorSource::new("offline", IntegrationError::network("unreachable"));

    let result = Server::new(config, Arc::new(source)).start().await;
    assert!(matches!(result, Err(ServerError::StartupSync(_))));
}
