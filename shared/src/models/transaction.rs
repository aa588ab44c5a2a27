//! Transaction Model

use serde::{Deserialize, Serialize};

use crate::money::Amount;
use crate::order::{Currency, TransactionKind};

/// Append-only money movement record, at most one per (order, kind)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Transaction {
    pub id: i64,
    pub kind: TransactionKind,
    pub order_id: i64,
    /// Buyer of the order
    pub user_id: i64,
    /// Credited referrer (`order` kind only)
    pub referrer_id: Option<i64>,
    pub currency: Currency,
    /// Payment amount for payouts, transferred amount for refunds
    pub amount: Amount,
    /// Commission credited to the referrer
    pub earned: Option<Amount>,
    pub created_at: i64,
}

/// Create transaction payload
#[derive(Debug, Clone)]
pub struct TransactionCreate {
    pub kind: TransactionKind,
    pub order_id: i64,
    pub user_id: i64,
    pub referrer_id: Option<i64>,
    pub currency: Currency,
    pub amount: Amount,
    pub earned: Option<Amount>,
}
