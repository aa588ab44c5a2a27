//! Order lifecycle
//!
//! [`OrdersManager`] is the only writer of `orders.status`. The legal moves
//! live in [`shared::order::OrderStatus::can_transition_to`]; this module
//! runs their side effects (refund, settlement, chat messages, fanout).

mod manager;
mod messages;

pub use manager::{Actor, OrdersManager};
