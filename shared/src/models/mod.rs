//! Data models
//!
//! Shared between the server, the mini-app and the admin console.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY AUTOINCREMENT).

pub mod chat;
pub mod offer;
pub mod order;
pub mod order_details;
pub mod payment;
pub mod referral;
pub mod transaction;
pub mod user;

// Re-exports
pub use chat::*;
pub use offer::*;
pub use order::*;
pub use order_details::*;
pub use payment::*;
pub use referral::*;
pub use transaction::*;
pub use user::*;
