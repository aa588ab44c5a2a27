//! Offer Model

use serde::{Deserialize, Serialize};

use crate::money::Amount;
use crate::order::Currency;

/// Catalog item, read-only to the order engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Offer {
    pub id: i64,
    pub game_id: String,
    pub title: String,
    pub price_rub: Amount,
    pub price_usdt: Amount,
}

impl Offer {
    pub fn price(&self, currency: Currency) -> Amount {
        match currency {
            Currency::Rub => self.price_rub,
            Currency::Usdt => self.price_usdt,
        }
    }
}
