//! Order Repository

use super::RepoResult;
use shared::models::{Order, Payment};
use shared::order::OrderStatus;
use sqlx::{Executor, Sqlite};

const ORDER_COLUMNS: &str =
    "id, payment_id, user_id, offer_id, order_details_id, status, currency, created_at, updated_at";

pub async fn find_by_id<'e, E>(db: E, id: i64) -> RepoResult<Option<Order>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?");
    let row = sqlx::query_as::<_, Order>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

pub async fn find_by_payment<'e, E>(db: E, payment_id: i64) -> RepoResult<Option<Order>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE payment_id = ?");
    let row = sqlx::query_as::<_, Order>(&sql)
        .bind(payment_id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

pub async fn find_by_user<'e, E>(db: E, user_id: i64) -> RepoResult<Vec<Order>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = ? ORDER BY id DESC");
    let rows = sqlx::query_as::<_, Order>(&sql)
        .bind(user_id)
        .fetch_all(db)
        .await?;
    Ok(rows)
}

/// Admin snapshot, newest first
pub async fn find_all<'e, E>(db: E) -> RepoResult<Vec<Order>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY id DESC");
    let rows = sqlx::query_as::<_, Order>(&sql).fetch_all(db).await?;
    Ok(rows)
}

/// Completed orders of referred customers with no `order` ledger row yet
pub async fn find_unsettled_referred<'e, E>(db: E) -> RepoResult<Vec<Order>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {ORDER_COLUMNS} FROM orders o \
         WHERE o.status = 'completed' \
           AND EXISTS (SELECT 1 FROM referrals r WHERE r.user_id = o.user_id) \
           AND NOT EXISTS (SELECT 1 FROM transactions t WHERE t.order_id = o.id AND t.kind = 'order') \
         ORDER BY o.id"
    );
    let rows = sqlx::query_as::<_, Order>(&sql).fetch_all(db).await?;
    Ok(rows)
}

/// Insert the `pending` order for a completed payment
pub async fn create<'e, E>(db: E, payment: &Payment) -> RepoResult<Order>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = shared::util::now_millis();
    let sql = format!(
        "INSERT INTO orders (payment_id, user_id, offer_id, status, currency, created_at, updated_at) \
         VALUES (?1, ?2, ?3, 'pending', ?4, ?5, ?5) RETURNING {ORDER_COLUMNS}"
    );
    let row = sqlx::query_as::<_, Order>(&sql)
        .bind(payment.id)
        .bind(payment.user_id)
        .bind(payment.offer_id)
        .bind(payment.currency)
        .bind(now)
        .fetch_one(db)
        .await?;
    Ok(row)
}

/// Compare-and-set the status. `None` when the stored status is no longer `from`.
pub async fn update_status<'e, E>(
    db: E,
    id: i64,
    from: OrderStatus,
    to: OrderStatus,
) -> RepoResult<Option<Order>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = shared::util::now_millis();
    let sql = format!(
        "UPDATE orders SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4 RETURNING {ORDER_COLUMNS}"
    );
    let row = sqlx::query_as::<_, Order>(&sql)
        .bind(to)
        .bind(now)
        .bind(id)
        .bind(from)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

pub async fn set_details<'e, E>(db: E, id: i64, order_details_id: i64) -> RepoResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = shared::util::now_millis();
    sqlx::query("UPDATE orders SET order_details_id = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(order_details_id)
        .bind(now)
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}
