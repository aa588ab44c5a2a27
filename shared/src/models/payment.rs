//! Payment Model

use serde::{Deserialize, Serialize};

use crate::money::Amount;
use crate::order::{Currency, PaymentStatus};

/// One row per provider invoice; `external_id` is the idempotency key
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Payment {
    pub id: i64,
    pub external_id: String,
    pub user_id: i64,
    pub offer_id: i64,
    pub order_id: Option<i64>,
    pub amount_to_pay: Amount,
    pub currency: Currency,
    pub status: PaymentStatus,
    pub pay_url: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create payment payload
#[derive(Debug, Clone)]
pub struct PaymentCreate {
    pub external_id: String,
    pub user_id: i64,
    pub offer_id: i64,
    pub amount_to_pay: Amount,
    pub currency: Currency,
    pub pay_url: Option<String>,
}

/// Invoice request from the mini-app
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceRequest {
    pub offer_id: i64,
    pub currency: Currency,
}

/// Invoice handed back to the mini-app
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceResponse {
    pub payment_id: i64,
    pub external_id: String,
    pub pay_url: String,
    pub amount: Amount,
    pub currency: Currency,
}
