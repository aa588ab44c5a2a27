//! Transaction Repository (append-only ledger)

use super::RepoResult;
use shared::models::{Transaction, TransactionCreate};
use shared::order::TransactionKind;
use sqlx::{Executor, Sqlite};

const TRANSACTION_COLUMNS: &str =
    "id, kind, order_id, user_id, referrer_id, currency, amount, earned, created_at";

/// Append a ledger entry. `None` when the (order, kind) entry already exists.
pub async fn insert<'e, E>(db: E, data: TransactionCreate) -> RepoResult<Option<Transaction>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = shared::util::now_millis();
    let sql = format!(
        "INSERT INTO transactions (kind, order_id, user_id, referrer_id, currency, amount, earned, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
         ON CONFLICT(order_id, kind) DO NOTHING \
         RETURNING {TRANSACTION_COLUMNS}"
    );
    let row = sqlx::query_as::<_, Transaction>(&sql)
        .bind(data.kind)
        .bind(data.order_id)
        .bind(data.user_id)
        .bind(data.referrer_id)
        .bind(data.currency)
        .bind(data.amount)
        .bind(data.earned)
        .bind(now)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

pub async fn find_by_order<'e, E>(db: E, order_id: i64) -> RepoResult<Vec<Transaction>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE order_id = ? ORDER BY id");
    let rows = sqlx::query_as::<_, Transaction>(&sql)
        .bind(order_id)
        .fetch_all(db)
        .await?;
    Ok(rows)
}

pub async fn find_by_order_kind<'e, E>(
    db: E,
    order_id: i64,
    kind: TransactionKind,
) -> RepoResult<Option<Transaction>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql =
        format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE order_id = ? AND kind = ?");
    let row = sqlx::query_as::<_, Transaction>(&sql)
        .bind(order_id)
        .bind(kind)
        .fetch_optional(db)
        .await?;
    Ok(row)
}
