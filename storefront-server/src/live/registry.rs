use dashmap::DashMap;
use shared::realtime::{AdminEvent, ClientEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

use super::{ActorKey, EventPublisher, SessionId};

struct Session<T> {
    id: SessionId,
    tx: mpsc::Sender<T>,
}

/// In-process connection registry.
///
/// DashMap shards keep registrations for different actors from contending;
/// delivery is `try_send` into a bounded per-session queue, so a slow socket
/// loses events instead of stalling the producer (reconnect replays history).
pub struct ConnectionRegistry {
    buffer: usize,
    users: DashMap<i64, Session<ClientEvent>>,
    admins: DashMap<SessionId, Session<AdminEvent>>,
    /// session_id → actor, for `unregister(session_id)`
    index: DashMap<SessionId, ActorKey>,
    closed: AtomicBool,
}

impl ConnectionRegistry {
    pub fn new(buffer: usize) -> Self {
        Self {
            buffer: buffer.max(1),
            users: DashMap::new(),
            admins: DashMap::new(),
            index: DashMap::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Register a customer session, replacing any previous one for the user.
    ///
    /// The replaced session is not closed; it notices disconnection on its own.
    pub fn register_user(&self, user_id: i64) -> (SessionId, mpsc::Receiver<ClientEvent>) {
        let (tx, rx) = mpsc::channel(self.buffer);
        let id = SessionId::new();
        if self.closed.load(Ordering::Acquire) {
            // tx dropped here: the receiver ends immediately
            return (id, rx);
        }

        self.index.insert(id, ActorKey::User(user_id));
        if let Some(previous) = self.users.insert(user_id, Session { id, tx }) {
            tracing::debug!(user_id, replaced = %previous.id, session = %id, "Customer session replaced");
        }
        (id, rx)
    }

    /// Join the admin room
    pub fn register_admin(&self) -> (SessionId, mpsc::Receiver<AdminEvent>) {
        let (tx, rx) = mpsc::channel(self.buffer);
        let id = SessionId::new();
        if self.closed.load(Ordering::Acquire) {
            return (id, rx);
        }

        self.index.insert(id, ActorKey::Admin);
        self.admins.insert(id, Session { id, tx });
        (id, rx)
    }

    /// Drop a session. A replaced customer session never evicts its replacement.
    pub fn unregister(&self, session_id: SessionId) {
        let Some((_, actor)) = self.index.remove(&session_id) else {
            return;
        };
        match actor {
            ActorKey::User(user_id) => {
                self.users
                    .remove_if(&user_id, |_, session| session.id == session_id);
            }
            ActorKey::Admin => {
                self.admins.remove(&session_id);
            }
        }
    }

    pub fn is_online(&self, actor: ActorKey) -> bool {
        match actor {
            ActorKey::User(user_id) => self.users.contains_key(&user_id),
            ActorKey::Admin => !self.admins.is_empty(),
        }
    }

    pub fn admin_count(&self) -> usize {
        self.admins.len()
    }

    /// Drop every session; open sockets see their queue end. Later
    /// registrations get an already-closed queue.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.users.clear();
        self.admins.clear();
        self.index.clear();
        tracing::info!("Connection registry closed");
    }
}

fn deliver<T>(session: &Session<T>, event: T) -> bool {
    match session.tx.try_send(event) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            tracing::warn!(session = %session.id, "Session queue full, event dropped");
            false
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}

impl EventPublisher for ConnectionRegistry {
    fn send_to_user(&self, user_id: i64, event: ClientEvent) -> bool {
        match self.users.get(&user_id) {
            Some(session) => deliver(&session, event),
            None => false,
        }
    }

    fn broadcast_admins(&self, event: AdminEvent) -> usize {
        self.admins
            .iter()
            .filter(|session| deliver(session.value(), event.clone()))
            .count()
    }
}
