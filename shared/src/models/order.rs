//! Order Model

use serde::{Deserialize, Serialize};

use crate::order::{Currency, OrderStatus};

/// Order entity (订单), exactly one per completed payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Order {
    pub id: i64,
    pub payment_id: i64,
    pub user_id: i64,
    pub offer_id: i64,
    pub order_details_id: Option<i64>,
    pub status: OrderStatus,
    pub currency: Currency,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Admin status change payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
}
