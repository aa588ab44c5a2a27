//! Referral Repository

use super::RepoResult;
use shared::models::Referral;
use sqlx::{Executor, Sqlite};

pub async fn find_by_user<'e, E>(db: E, user_id: i64) -> RepoResult<Option<Referral>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, Referral>(
        "SELECT id, user_id, refer_id FROM referrals WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

/// Record `user_id → refer_id` once; an existing edge is left untouched
pub async fn create<'e, E>(db: E, user_id: i64, refer_id: i64) -> RepoResult<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        "INSERT INTO referrals (user_id, refer_id) VALUES (?1, ?2) ON CONFLICT(user_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(refer_id)
    .execute(db)
    .await?;
    Ok(rows.rows_affected() == 1)
}
