//! Order lifecycle types
//!
//! The transition table lives here so the mini-app, the admin console and
//! the server agree on which status changes are allowed.

pub mod status;

pub use status::{Currency, OrderStatus, PaymentStatus, TransactionKind};
