//! Live WebSocket protocol
//!
//! Server → mini-app: [`ClientEvent`] / mini-app → server: [`ClientCommand`]
//! Server → admin console: [`AdminEvent`] / console → server: [`AdminCommand`]

pub mod admin;
pub mod client;

pub use admin::{AdminCommand, AdminEvent};
pub use client::{ClientCommand, ClientEvent};
