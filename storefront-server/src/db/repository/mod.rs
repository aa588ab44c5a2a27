//! Repository Module
//!
//! Free async functions over any SQLite executor: pass `&SqlitePool` for a
//! standalone statement or `&mut *tx` to run inside an open transaction.

pub mod chat;
pub mod offer;
pub mod order;
pub mod order_details;
pub mod payment;
pub mod referral;
pub mod transaction;
pub mod user;

use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => RepoError::NotFound(err.to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepoError::Duplicate(db.message().to_string())
            }
            _ => RepoError::Database(err.to_string()),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

#[cfg(test)]
pub(crate) mod tests {
    use crate::db::DbService;
    use shared::models::{Offer, User, UserCreate};
    use shared::money::Amount;
    use sqlx::SqlitePool;

    pub async fn test_pool() -> SqlitePool {
        DbService::in_memory().await.unwrap().pool
    }

    pub async fn seed_user(pool: &SqlitePool, telegram_id: i64) -> User {
        let mut conn = pool.acquire().await.unwrap();
        let (user, _) = super::user::find_or_create(
            &mut conn,
            UserCreate {
                telegram_id,
                username: Some(format!("user{telegram_id}")),
                refer_id: None,
            },
        )
        .await
        .unwrap();
        user
    }

    pub async fn seed_offer(pool: &SqlitePool, price_usdt: i64) -> Offer {
        super::offer::create(
            pool,
            "pubg",
            "60 UC",
            Amount::from(price_usdt * 90),
            Amount::from(price_usdt),
        )
        .await
        .unwrap()
    }
}
