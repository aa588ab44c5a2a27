//! Referral settlement and refunds
//!
//! - [`SettlementEngine::settle_completed_order`] credits the referrer of a
//!   completed order exactly once (unique `(order_id, kind)` ledger row).
//! - [`SettlementEngine::refund`] sends the wallet transfer for a cancellation.
//! - [`SettlementRetryWorker`] retries failed settlements with backoff.

mod engine;
mod retry;

pub use engine::{SettlementEngine, refund_spend_id};
pub use retry::{RetryJob, RetryQueue, SettlementRetryWorker};
