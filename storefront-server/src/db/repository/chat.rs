//! Chat Repository
//!
//! Owns the unread bookkeeping: `unread_admin_count` always equals the
//! number of messages with `sender != 0` and `id > last_read_by_admin`.

use super::{RepoError, RepoResult};
use shared::models::{Chat, ChatMessage, ChatOverview, ChatSender};
use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};

const CHAT_COLUMNS: &str = "id, user_id, last_read_by_user, last_read_by_admin, unread_admin_count";
const MESSAGE_COLUMNS: &str = "id, chat_id, sender, content, created_at";

pub async fn find_by_user<'e, E>(db: E, user_id: i64) -> RepoResult<Option<Chat>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {CHAT_COLUMNS} FROM chats WHERE user_id = ?");
    let row = sqlx::query_as::<_, Chat>(&sql)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

pub async fn get_or_create(conn: &mut SqliteConnection, user_id: i64) -> RepoResult<Chat> {
    sqlx::query("INSERT INTO chats (user_id) VALUES (?) ON CONFLICT(user_id) DO NOTHING")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    find_by_user(&mut *conn, user_id)
        .await?
        .ok_or_else(|| RepoError::Database(format!("Failed to create chat for user {user_id}")))
}

/// Append a message and bump the admin unread counter in one transaction.
///
/// Returns the stored message and the chat's `unread_admin_count` after the insert.
pub async fn append_message(
    pool: &SqlitePool,
    user_id: i64,
    sender: ChatSender,
    content: &str,
) -> RepoResult<(ChatMessage, i64)> {
    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;

    let chat = get_or_create(&mut *tx, user_id).await?;

    let sql = format!(
        "INSERT INTO chat_messages (chat_id, sender, content, created_at) VALUES (?1, ?2, ?3, ?4) RETURNING {MESSAGE_COLUMNS}"
    );
    let message = sqlx::query_as::<_, ChatMessage>(&sql)
        .bind(chat.id)
        .bind(sender.to_db())
        .bind(content)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

    let unread = if sender.counts_as_unread_for_admin() {
        sqlx::query_scalar::<_, i64>(
            "UPDATE chats SET unread_admin_count = unread_admin_count + 1 WHERE id = ? RETURNING unread_admin_count",
        )
        .bind(chat.id)
        .fetch_one(&mut *tx)
        .await?
    } else {
        chat.unread_admin_count
    };

    tx.commit().await?;
    Ok((message, unread))
}

/// Admin opened the chat: everything up to the newest message is read
pub async fn mark_read_by_admin<'e, E>(db: E, user_id: i64) -> RepoResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "UPDATE chats SET \
           last_read_by_admin = COALESCE((SELECT MAX(id) FROM chat_messages WHERE chat_id = chats.id), last_read_by_admin), \
           unread_admin_count = 0 \
         WHERE user_id = ?",
    )
    .bind(user_id)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn mark_read_by_user<'e, E>(db: E, user_id: i64) -> RepoResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "UPDATE chats SET \
           last_read_by_user = COALESCE((SELECT MAX(id) FROM chat_messages WHERE chat_id = chats.id), last_read_by_user) \
         WHERE user_id = ?",
    )
    .bind(user_id)
    .execute(db)
    .await?;
    Ok(())
}

/// Full history, oldest first
pub async fn history<'e, E>(db: E, user_id: i64) -> RepoResult<Vec<ChatMessage>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, ChatMessage>(
        "SELECT m.id, m.chat_id, m.sender, m.content, m.created_at \
         FROM chat_messages m JOIN chats c ON m.chat_id = c.id \
         WHERE c.user_id = ? ORDER BY m.id ASC",
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Admin and system messages the customer has not seen yet
pub async fn unread_for_user<'e, E>(db: E, user_id: i64) -> RepoResult<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(m.id) FROM chat_messages m JOIN chats c ON m.chat_id = c.id \
         WHERE c.user_id = ?1 AND m.id > c.last_read_by_user AND m.sender <= 0",
    )
    .bind(user_id)
    .fetch_one(db)
    .await?;
    Ok(count)
}

/// Admin chat list, most recent activity first
pub async fn all_chats<'e, E>(db: E) -> RepoResult<Vec<ChatOverview>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, ChatOverview>(
        "SELECT c.id AS chat_id, c.user_id, u.telegram_id, u.username, c.unread_admin_count, \
                m.content AS last_message, m.created_at AS last_message_at \
         FROM chats c \
         JOIN users u ON u.id = c.user_id \
         LEFT JOIN chat_messages m ON m.id = (SELECT MAX(id) FROM chat_messages WHERE chat_id = c.id) \
         ORDER BY COALESCE(m.id, 0) DESC",
    )
    .fetch_all(db)
    .await?;
    Ok(rows)
}
