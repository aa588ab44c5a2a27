//! Live connection registry
//!
//! ```text
//! ws_client / ws_admin handler
//!       │ register → (SessionId, Receiver)
//!       ▼
//! ConnectionRegistry
//!   ├── users:  user_id → one session (last registration wins)
//!   └── admins: session_id → session (the admin room)
//!       ▲
//!       │ EventPublisher::{send_to_user, broadcast_admins}
//! OrdersManager / Notifier
//! ```
//!
//! Everything here is in-memory and non-blocking. Producers depend only on
//! [`EventPublisher`], so a shared broker can replace the local registry
//! for multi-instance deployments.

mod registry;

pub use registry::ConnectionRegistry;

use shared::realtime::{AdminEvent, ClientEvent};
use std::fmt;
use uuid::Uuid;

/// Logical address of a live connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActorKey {
    User(i64),
    /// The admin room; any number of sessions
    Admin,
}

/// Physical transport session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Publish side of the registry
pub trait EventPublisher: Send + Sync {
    /// Unicast to a customer. `false` when no live session took the event.
    fn send_to_user(&self, user_id: i64, event: ClientEvent) -> bool;

    /// Fan out to every admin session. Returns the number of sessions reached.
    fn broadcast_admins(&self, event: AdminEvent) -> usize;
}
