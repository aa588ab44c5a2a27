//! Referral Model

use serde::{Deserialize, Serialize};

/// Immutable edge: `user_id` was invited by `refer_id`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Referral {
    pub id: i64,
    pub user_id: i64,
    pub refer_id: i64,
}
