//! User Repository

use super::{RepoError, RepoResult};
use shared::models::{User, UserCreate};
use shared::money::Amount;
use shared::order::Currency;
use sqlx::{Connection, Executor, Sqlite, SqliteConnection};

const USER_SELECT: &str = "SELECT id, telegram_id, username, balance_rub, balance_usdt, orders_count, referral_percent, is_banned, created_at FROM users";

pub async fn find_by_id<'e, E>(db: E, id: i64) -> RepoResult<Option<User>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{USER_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, User>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

pub async fn find_by_telegram_id<'e, E>(db: E, telegram_id: i64) -> RepoResult<Option<User>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{USER_SELECT} WHERE telegram_id = ?");
    let row = sqlx::query_as::<_, User>(&sql)
        .bind(telegram_id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

/// Get the user for a Telegram identity, creating it on first sight.
///
/// Returns `(user, created)`. A referral edge is recorded only for a newly
/// created user whose inviter exists; the edge is never rewritten later.
/// The user row and its edge commit together.
pub async fn find_or_create(
    conn: &mut SqliteConnection,
    data: UserCreate,
) -> RepoResult<(User, bool)> {
    if let Some(user) = find_by_telegram_id(&mut *conn, data.telegram_id).await? {
        return Ok((user, false));
    }

    let mut tx = conn.begin().await?;
    let now = shared::util::now_millis();
    let inserted = sqlx::query(
        "INSERT INTO users (telegram_id, username, created_at) VALUES (?1, ?2, ?3) ON CONFLICT(telegram_id) DO NOTHING",
    )
    .bind(data.telegram_id)
    .bind(&data.username)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let user = find_by_telegram_id(&mut *tx, data.telegram_id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create user".into()))?;
    let created = inserted.rows_affected() == 1;

    if created
        && let Some(refer_id) = data.refer_id
        && refer_id != user.id
        && find_by_id(&mut *tx, refer_id).await?.is_some()
    {
        super::referral::create(&mut *tx, user.id, refer_id).await?;
    }

    tx.commit().await?;
    Ok((user, created))
}

/// Keep the stored username in sync with Telegram
pub async fn update_username<'e, E>(db: E, id: i64, username: Option<&str>) -> RepoResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE users SET username = ?1 WHERE id = ?2 AND username IS NOT ?1")
        .bind(username)
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn increment_orders_count<'e, E>(db: E, id: i64) -> RepoResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query("UPDATE users SET orders_count = orders_count + 1 WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("User {id} not found")));
    }
    Ok(())
}

/// Atomically add `amount` to the balance in `currency`
pub async fn credit_balance<'e, E>(
    db: E,
    id: i64,
    currency: Currency,
    amount: Amount,
) -> RepoResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = match currency {
        Currency::Rub => "UPDATE users SET balance_rub = balance_rub + ?1 WHERE id = ?2",
        Currency::Usdt => "UPDATE users SET balance_usdt = balance_usdt + ?1 WHERE id = ?2",
    };
    let rows = sqlx::query(sql).bind(amount).bind(id).execute(db).await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("User {id} not found")));
    }
    Ok(())
}

pub async fn set_referral_percent<'e, E>(db: E, id: i64, percent: Amount) -> RepoResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    if percent < Amount::ZERO || percent > Amount::from(100) {
        return Err(RepoError::Validation(format!(
            "referral percent out of range: {percent}"
        )));
    }
    sqlx::query("UPDATE users SET referral_percent = ? WHERE id = ?")
        .bind(percent)
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn set_banned<'e, E>(db: E, id: i64, banned: bool) -> RepoResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query("UPDATE users SET is_banned = ? WHERE id = ?")
        .bind(banned)
        .bind(id)
        .execute(db)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("User {id} not found")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::tests::{seed_user, test_pool};

    #[tokio::test]
    async fn test_find_or_create_is_stable() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let data = UserCreate {
            telegram_id: 1001,
            username: Some("alice".into()),
            refer_id: None,
        };
        let (first, created) = find_or_create(&mut conn, data.clone()).await.unwrap();
        assert!(created);
        let (second, created) = find_or_create(&mut conn, data).await.unwrap();
        assert!(!created, "second call must reuse the existing row");
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_referral_edge_only_on_creation() {
        let pool = test_pool().await;
        let inviter = seed_user(&pool, 1).await;
        let mut conn = pool.acquire().await.unwrap();

        let (invited, _) = find_or_create(
            &mut conn,
            UserCreate {
                telegram_id: 2,
                username: None,
                refer_id: Some(inviter.id),
            },
        )
        .await
        .unwrap();

        let edge = crate::db::repository::referral::find_by_user(&mut *conn, invited.id)
            .await
            .unwrap()
            .expect("edge created");
        assert_eq!(edge.refer_id, inviter.id);
    }

    #[tokio::test]
    async fn test_failed_referral_edge_rolls_back_user() {
        let pool = test_pool().await;
        let inviter = seed_user(&pool, 1).await;
        let mut conn = pool.acquire().await.unwrap();
        sqlx::query(
            "CREATE TEMP TRIGGER reject_referrals BEFORE INSERT ON referrals \
             BEGIN SELECT RAISE(ABORT, 'edge rejected'); END",
        )
        .execute(&mut *conn)
        .await
        .unwrap();

        let data = UserCreate {
            telegram_id: 2,
            username: None,
            refer_id: Some(inviter.id),
        };
        assert!(find_or_create(&mut conn, data.clone()).await.is_err());
        assert!(find_by_telegram_id(&mut *conn, 2).await.unwrap().is_none());

        // next sign-in creates both
        sqlx::query("DROP TRIGGER reject_referrals")
            .execute(&mut *conn)
            .await
            .unwrap();
        let (invited, created) = find_or_create(&mut conn, data).await.unwrap();
        assert!(created);
        let edge = crate::db::repository::referral::find_by_user(&mut *conn, invited.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(edge.refer_id, inviter.id);
    }

    #[tokio::test]
    async fn test_credit_balance_per_currency() {
        let pool = test_pool().await;
        let user = seed_user(&pool, 7).await;

        credit_balance(&pool, user.id, Currency::Usdt, Amount::from_micros(2_500_000))
            .await
            .unwrap();
        credit_balance(&pool, user.id, Currency::Usdt, Amount::from(1))
            .await
            .unwrap();

        let user = find_by_id(&pool, user.id).await.unwrap().unwrap();
        assert_eq!(user.balance_usdt, Amount::from_micros(3_500_000));
        assert_eq!(user.balance_rub, Amount::ZERO);
    }

    #[tokio::test]
    async fn test_credit_unknown_user_is_not_found() {
        let pool = test_pool().await;
        let err = credit_balance(&pool, 999, Currency::Rub, Amount::from(1))
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::NotFound(_)));
    }
}
