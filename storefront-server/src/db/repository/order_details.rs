//! Order Details Repository

use super::{RepoError, RepoResult};
use serde_json::{Map, Value};
use shared::models::OrderDetails;
use sqlx::types::Json;
use sqlx::{Executor, Sqlite};

const DETAILS_COLUMNS: &str = "id, order_id, user_id, fields, created_at, updated_at";

pub async fn find_by_order<'e, E>(db: E, order_id: i64) -> RepoResult<Option<OrderDetails>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {DETAILS_COLUMNS} FROM order_details WHERE order_id = ?");
    let row = sqlx::query_as::<_, OrderDetails>(&sql)
        .bind(order_id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

/// Insert the details for an order, or replace the fields of an existing row
pub async fn upsert<'e, E>(
    db: E,
    order_id: i64,
    user_id: i64,
    fields: &Map<String, Value>,
) -> RepoResult<OrderDetails>
where
    E: Executor<'e, Database = Sqlite>,
{
    if fields.is_empty() {
        return Err(RepoError::Validation("order details must not be empty".into()));
    }
    let now = shared::util::now_millis();
    let sql = format!(
        "INSERT INTO order_details (order_id, user_id, fields, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4) \
         ON CONFLICT(order_id) DO UPDATE SET fields = excluded.fields, updated_at = excluded.updated_at \
         RETURNING {DETAILS_COLUMNS}"
    );
    let row = sqlx::query_as::<_, OrderDetails>(&sql)
        .bind(order_id)
        .bind(user_id)
        .bind(Json(fields))
        .bind(now)
        .fetch_one(db)
        .await?;
    Ok(row)
}
