//! Connection hub.
//!
//! The hub is a single task owning the map of live sessions. Everything else
//! talks to it through a cloneable [`HubHandle`] that submits commands over a
//! bounded channel, so the map is only ever touched inside [`Hub::run`].
//!
//! Each session is represented in the map by the sending half of its
//! mailbox and a removal signal. Removing the entry drops both: the mailbox
//! closes, so the writer sends a close frame, and [`SessionTicket::removed`]
//! completes, so the reader stops routing frames.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use caldave_protocol::{Message, encode_text};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{ServerError, ServerResult};

/// Session identifier, the remote peer address.
pub type SessionId = String;

/// A pre-encoded text frame shared between mailboxes.
pub type Outbound = Arc<String>;

/// Proof of one registration.
///
/// Ids can collide when a peer address is reused; the epoch lets a session
/// that was replaced unregister without removing its successor.
#[derive(Debug, Clone)]
pub struct SessionTicket {
    pub id: SessionId,
    epoch: u64,
    removed: watch::Receiver<()>,
}

impl SessionTicket {
    /// Completes once the hub no longer holds this registration, whether it
    /// was unregistered, evicted, replaced or the hub stopped.
    pub async fn removed(&self) {
        let mut removed = self.removed.clone();
        // nothing is ever sent: changed() only returns once the sender is gone
        while removed.changed().await.is_ok() {}
    }

    /// Returns true if the hub no longer holds this registration.
    pub fn is_removed(&self) -> bool {
        self.removed.has_changed().is_err()
    }
}

impl PartialEq for SessionTicket {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.epoch == other.epoch
    }
}

impl Eq for SessionTicket {}

#[derive(Debug)]
enum HubCommand {
    Register {
        id: SessionId,
        entry: SessionEntry,
    },
    Unregister {
        id: SessionId,
        epoch: Option<u64>,
    },
    Broadcast(Outbound),
    Deliver {
        id: SessionId,
        frame: Outbound,
    },
    Sessions(oneshot::Sender<Vec<SessionId>>),
    Shutdown,
}

#[derive(Debug)]
struct SessionEntry {
    epoch: u64,
    mailbox: mpsc::Sender<Outbound>,
    // dropped together with the entry
    _removal: watch::Sender<()>,
}

/// The hub control loop.
pub struct Hub {
    sessions: HashMap<SessionId, SessionEntry>,
    commands: mpsc::Receiver<HubCommand>,
}

impl Hub {
    /// Creates a hub and the handle used to drive it.
    pub fn new(queue_capacity: usize) -> (Self, HubHandle) {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let hub = Self {
            sessions: HashMap::new(),
            commands: rx,
        };
        let handle = HubHandle {
            commands: tx,
            epochs: Arc::new(AtomicU64::new(0)),
        };
        (hub, handle)
    }

    /// Creates a hub and runs it on a new task.
    pub fn spawn(queue_capacity: usize) -> (HubHandle, JoinHandle<()>) {
        let (hub, handle) = Self::new(queue_capacity);
        (handle, tokio::spawn(hub.run()))
    }

    /// Processes commands until shutdown or until every handle is dropped.
    pub async fn run(mut self) {
        debug!("hub started");
        while let Some(command) = self.commands.recv().await {
            match command {
                HubCommand::Register { id, entry } => self.register(id, entry),
                HubCommand::Unregister { id, epoch } => self.unregister(&id, epoch),
                HubCommand::Broadcast(frame) => self.broadcast(&frame),
                HubCommand::Deliver { id, frame } => self.deliver(&id, frame),
                HubCommand::Sessions(reply) => {
                    let mut ids: Vec<_> = self.sessions.keys().cloned().collect();
                    ids.sort();
                    let _ = reply.send(ids);
                }
                HubCommand::Shutdown => break,
            }
        }

        let count = self.sessions.len();
        self.sessions.clear();
        info!(sessions = count, "hub stopped");
    }

    fn register(&mut self, id: SessionId, entry: SessionEntry) {
        let replaced = self.sessions.insert(id.clone(), entry);
        if replaced.is_some() {
            info!(session_id = %id, "session replaced by a new connection");
        } else {
            debug!(session_id = %id, total = self.sessions.len(), "session registered");
        }
    }

    fn unregister(&mut self, id: &str, epoch: Option<u64>) {
        let matches = match (self.sessions.get(id), epoch) {
            (Some(entry), Some(epoch)) => entry.epoch == epoch,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if matches {
            self.sessions.remove(id);
            debug!(session_id = %id, total = self.sessions.len(), "session unregistered");
        }
    }

    fn broadcast(&mut self, frame: &Outbound) {
        let mut evicted = Vec::new();
        for (id, entry) in &self.sessions {
            if let Err(err) = entry.mailbox.try_send(Arc::clone(frame)) {
                evicted.push((id.clone(), matches!(err, TrySendError::Full(_))));
            }
        }
        debug!(
            recipients = self.sessions.len() - evicted.len(),
            evicted = evicted.len(),
            "broadcast"
        );
        for (id, full) in evicted {
            self.evict(&id, full);
        }
    }

    fn deliver(&mut self, id: &str, frame: Outbound) {
        let Some(entry) = self.sessions.get(id) else {
            warn!(session_id = %id, "dropping message for unknown session");
            return;
        };
        if let Err(err) = entry.mailbox.try_send(frame) {
            self.evict(id, matches!(err, TrySendError::Full(_)));
        }
    }

    fn evict(&mut self, id: &str, full: bool) {
        self.sessions.remove(id);
        if full {
            warn!(session_id = %id, "mailbox full, evicting session");
        } else {
            debug!(session_id = %id, "mailbox closed, removing session");
        }
    }
}

/// Cloneable handle to the hub.
#[derive(Debug, Clone)]
pub struct HubHandle {
    commands: mpsc::Sender<HubCommand>,
    epochs: Arc<AtomicU64>,
}

impl HubHandle {
    async fn send(&self, command: HubCommand) -> ServerResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ServerError::HubClosed)
    }

    /// Registers a session mailbox under `id`, replacing any session with
    /// the same id.
    pub async fn register(
        &self,
        id: impl Into<SessionId>,
        mailbox: mpsc::Sender<Outbound>,
    ) -> ServerResult<SessionTicket> {
        let id = id.into();
        let epoch = self.epochs.fetch_add(1, Ordering::Relaxed);
        let (removal, removed) = watch::channel(());
        self.send(HubCommand::Register {
            id: id.clone(),
            entry: SessionEntry {
                epoch,
                mailbox,
                _removal: removal,
            },
        })
        .await?;
        Ok(SessionTicket { id, epoch, removed })
    }

    /// Removes the session registered under `id`, if any.
    pub async fn unregister(&self, id: impl Into<SessionId>) -> ServerResult<()> {
        self.send(HubCommand::Unregister {
            id: id.into(),
            epoch: None,
        })
        .await
    }

    /// Removes the session only if it is still the one behind `ticket`.
    pub async fn release(&self, ticket: &SessionTicket) -> ServerResult<()> {
        self.send(HubCommand::Unregister {
            id: ticket.id.clone(),
            epoch: Some(ticket.epoch),
        })
        .await
    }

    /// Encodes `message` once and offers it to every session.
    pub async fn broadcast(&self, message: &Message) -> ServerResult<()> {
        let frame = encode_text(message)?;
        self.broadcast_text(frame).await
    }

    /// Offers an already encoded frame to every session.
    pub async fn broadcast_text(&self, frame: impl Into<String>) -> ServerResult<()> {
        self.send(HubCommand::Broadcast(Arc::new(frame.into())))
            .await
    }

    /// Sends `message` to one session.
    pub async fn deliver(&self, id: impl Into<SessionId>, message: &Message) -> ServerResult<()> {
        let frame = Arc::new(encode_text(message)?);
        self.send(HubCommand::Deliver {
            id: id.into(),
            frame,
        })
        .await
    }

    /// Returns the registered session ids, sorted.
    pub async fn sessions(&self) -> ServerResult<Vec<SessionId>> {
        let (tx, rx) = oneshot::channel();
        self.send(HubCommand::Sessions(tx)).await?;
        rx.await.map_err(|_| ServerError::HubClosed)
    }

    /// Closes every mailbox and stops the control loop.
    pub async fn shutdown(&self) -> ServerResult<()> {
        self.send(HubCommand::Shutdown).await
    }
}
