//! User Model

use serde::{Deserialize, Serialize};

use crate::money::Amount;
use crate::order::Currency;

/// Storefront customer, keyed by Telegram identity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct User {
    pub id: i64,
    pub telegram_id: i64,
    pub username: Option<String>,
    pub balance_rub: Amount,
    pub balance_usdt: Amount,
    pub orders_count: i64,
    /// Share of a referred user's payment credited to this user
    pub referral_percent: Amount,
    pub is_banned: bool,
    pub created_at: i64,
}

impl User {
    pub fn balance(&self, currency: Currency) -> Amount {
        match currency {
            Currency::Rub => self.balance_rub,
            Currency::Usdt => self.balance_usdt,
        }
    }
}

/// Create user payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCreate {
    pub telegram_id: i64,
    pub username: Option<String>,
    /// Inviting user, recorded as a referral edge on first sight
    pub refer_id: Option<i64>,
}

/// Admin user management payload; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserAdminUpdate {
    #[serde(default)]
    pub is_banned: Option<bool>,
    #[serde(default)]
    pub referral_percent: Option<Amount>,
}
