//! Payment Repository
//!
//! `external_id` is the idempotency key for provider events: status updates
//! are guarded in the WHERE clause and callers check `rows_affected`.

use super::RepoResult;
use shared::models::{Payment, PaymentCreate};
use shared::order::PaymentStatus;
use sqlx::{Executor, Sqlite};

const PAYMENT_COLUMNS: &str = "id, external_id, user_id, offer_id, order_id, amount_to_pay, currency, status, pay_url, created_at, updated_at";

pub async fn find_by_id<'e, E>(db: E, id: i64) -> RepoResult<Option<Payment>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = ?");
    let row = sqlx::query_as::<_, Payment>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

pub async fn find_by_external_id<'e, E>(db: E, external_id: &str) -> RepoResult<Option<Payment>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE external_id = ?");
    let row = sqlx::query_as::<_, Payment>(&sql)
        .bind(external_id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

pub async fn create<'e, E>(db: E, data: PaymentCreate) -> RepoResult<Payment>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = shared::util::now_millis();
    let sql = format!(
        "INSERT INTO payments (external_id, user_id, offer_id, amount_to_pay, currency, status, pay_url, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6, ?7, ?7) RETURNING {PAYMENT_COLUMNS}"
    );
    let row = sqlx::query_as::<_, Payment>(&sql)
        .bind(&data.external_id)
        .bind(data.user_id)
        .bind(data.offer_id)
        .bind(data.amount_to_pay)
        .bind(data.currency)
        .bind(&data.pay_url)
        .bind(now)
        .fetch_one(db)
        .await?;
    Ok(row)
}

/// Flip to `completed` unless already completed.
///
/// Returns `false` when another caller won the race.
pub async fn mark_completed<'e, E>(db: E, external_id: &str) -> RepoResult<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE payments SET status = 'completed', updated_at = ?1 WHERE external_id = ?2 AND status != 'completed'",
    )
    .bind(now)
    .bind(external_id)
    .execute(db)
    .await?;
    Ok(rows.rows_affected() == 1)
}

/// Move a still-pending payment to `status` (failed / canceled)
pub async fn resolve_pending<'e, E>(
    db: E,
    external_id: &str,
    status: PaymentStatus,
) -> RepoResult<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE payments SET status = ?1, updated_at = ?2 WHERE external_id = ?3 AND status = 'pending'",
    )
    .bind(status)
    .bind(now)
    .bind(external_id)
    .execute(db)
    .await?;
    Ok(rows.rows_affected() == 1)
}

pub async fn link_order<'e, E>(db: E, payment_id: i64, order_id: i64) -> RepoResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = shared::util::now_millis();
    sqlx::query("UPDATE payments SET order_id = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(order_id)
        .bind(now)
        .bind(payment_id)
        .execute(db)
        .await?;
    Ok(())
}
