//! Offer Repository (catalog is read-only to the order engine)

use super::{RepoError, RepoResult};
use shared::models::Offer;
use shared::money::Amount;
use sqlx::{Executor, Sqlite};

pub async fn find_by_id<'e, E>(db: E, id: i64) -> RepoResult<Option<Offer>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, Offer>(
        "SELECT id, game_id, title, price_rub, price_usdt FROM offers WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

/// Catalog seeding
pub async fn create<'e, E>(
    db: E,
    game_id: &str,
    title: &str,
    price_rub: Amount,
    price_usdt: Amount,
) -> RepoResult<Offer>
where
    E: Executor<'e, Database = Sqlite>,
{
    if !price_rub.is_positive() || !price_usdt.is_positive() {
        return Err(RepoError::Validation("offer prices must be positive".into()));
    }
    let row = sqlx::query_as::<_, Offer>(
        "INSERT INTO offers (game_id, title, price_rub, price_usdt) VALUES (?1, ?2, ?3, ?4) RETURNING id, game_id, title, price_rub, price_usdt",
    )
    .bind(game_id)
    .bind(title)
    .bind(price_rub)
    .bind(price_usdt)
    .fetch_one(db)
    .await?;
    Ok(row)
}
