//! Order Details Model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Delivery credentials the customer submits for an order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderDetails {
    pub id: i64,
    pub order_id: i64,
    pub user_id: i64,
    /// Free-form form fields (login, nickname, server, ...)
    #[cfg_attr(feature = "db", sqlx(json))]
    pub fields: Map<String, Value>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Details submission payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetailsSubmit {
    pub fields: Map<String, Value>,
}
