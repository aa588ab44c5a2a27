//! Shared types for the storefront
//!
//! Domain models, the order status table, the live socket protocol and the
//! unified error system used by the server and its clients.

pub mod error;
pub mod models;
pub mod money;
pub mod order;
pub mod realtime;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

pub use money::Amount;
pub use order::{Currency, OrderStatus, PaymentStatus, TransactionKind};
