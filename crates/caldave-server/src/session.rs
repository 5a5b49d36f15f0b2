//! Per-connection session.
//!
//! A session is two loops. The reader decodes inbound frames and hands them
//! to the [`Router`] one at a time. The writer drains the session mailbox
//! into the socket. They share only the session id and the mailbox, whose
//! sending half lives in the hub. When the hub drops the session (eviction,
//! replacement or shutdown) the reader stops at once and the writer is given
//! a short grace period to send a close frame before the connection is
//! dropped.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

use crate::error::ServerError;
use crate::hub::{HubHandle, Outbound};
use crate::router::Router;

/// Time a closing session's writer gets to flush before it is aborted.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Runs a session until the peer disconnects or the session is evicted.
pub async fn run_session<S>(
    ws: WebSocketStream<S>,
    peer: SocketAddr,
    hub: HubHandle,
    router: Router,
    mailbox_capacity: usize,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mailbox_tx, mailbox_rx) = mpsc::channel(mailbox_capacity.max(1));
    let ticket = match hub.register(peer.to_string(), mailbox_tx).await {
        Ok(ticket) => ticket,
        Err(e) => {
            warn!(%peer, error = %e, "rejecting connection");
            return;
        }
    };
    info!(session_id = %ticket.id, "client connected");

    let (sink, mut stream) = ws.split();
    let mut writer = tokio::spawn(write_loop(sink, mailbox_rx, ticket.id.clone()));

    loop {
        tokio::select! {
            biased;
            () = ticket.removed() => {
                debug!(session_id = %ticket.id, "removed by the hub, closing session");
                break;
            }
            frame = stream.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    if let Err(ServerError::HubClosed) = router.route(&ticket.id, text.as_str()).await {
                        debug!(session_id = %ticket.id, "hub stopped, closing session");
                        break;
                    }
                }
                Some(Ok(WsMessage::Binary(data))) => {
                    warn!(session_id = %ticket.id, len = data.len(), "dropping binary frame");
                }
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(session_id = %ticket.id, error = %e, "read failed");
                    break;
                }
            },
        }
    }

    if let Err(e) = hub.release(&ticket).await {
        debug!(session_id = %ticket.id, error = %e, "hub stopped before release");
    }

    // a peer that stopped reading can hold the writer inside a send
    if timeout(CLOSE_GRACE, &mut writer).await.is_err() {
        warn!(session_id = %ticket.id, "writer still blocked, dropping connection");
        writer.abort();
    }
    info!(session_id = %ticket.id, "client disconnected");
}

async fn write_loop<S>(
    mut sink: SplitSink<WebSocketStream<S>, WsMessage>,
    mut mailbox: mpsc::Receiver<Outbound>,
    session_id: String,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    while let Some(frame) = mailbox.recv().await {
        if let Err(e) = sink.send(WsMessage::text(frame.as_str().to_owned())).await {
            debug!(%session_id, error = %e, "write failed");
            return;
        }
    }

    // mailbox closed: unregistered, evicted or replaced
    if let Err(e) = sink.close().await {
        debug!(%session_id, error = %e, "close failed");
    }
    debug!(%session_id, "writer stopped");
}
