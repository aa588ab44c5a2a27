//! Chat Models

use serde::{Deserialize, Serialize};

/// Sender column value for admin replies
pub const SENDER_ADMIN: i64 = 0;
/// Sender column value for system (state machine) messages
pub const SENDER_SYSTEM: i64 = -1;

/// Who wrote a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "user_id", rename_all = "lowercase")]
pub enum ChatSender {
    Admin,
    System,
    /// The chat's customer
    User(i64),
}

impl ChatSender {
    /// Encoded column value: `0` admin, `-1` system, `>0` user id
    pub fn to_db(self) -> i64 {
        match self {
            ChatSender::Admin => SENDER_ADMIN,
            ChatSender::System => SENDER_SYSTEM,
            ChatSender::User(id) => id,
        }
    }

    pub fn from_db(value: i64) -> Self {
        match value {
            SENDER_ADMIN => ChatSender::Admin,
            SENDER_SYSTEM => ChatSender::System,
            id => ChatSender::User(id),
        }
    }

    /// Messages not written by the admin count toward the admin unread badge
    pub fn counts_as_unread_for_admin(self) -> bool {
        !matches!(self, ChatSender::Admin)
    }
}

/// One chat per user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Chat {
    pub id: i64,
    pub user_id: i64,
    /// Highest message id the customer has seen
    pub last_read_by_user: i64,
    /// Highest message id the admin has seen
    pub last_read_by_admin: i64,
    /// Messages with `sender != 0` after `last_read_by_admin`
    pub unread_admin_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ChatMessage {
    pub id: i64,
    pub chat_id: i64,
    pub sender: i64,
    pub content: String,
    pub created_at: i64,
}

impl ChatMessage {
    pub fn sender(&self) -> ChatSender {
        ChatSender::from_db(self.sender)
    }
}

/// Row of the admin chat list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ChatOverview {
    pub chat_id: i64,
    pub user_id: i64,
    pub telegram_id: i64,
    pub username: Option<String>,
    pub unread_admin_count: i64,
    pub last_message: Option<String>,
    pub last_message_at: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_encoding() {
        assert_eq!(ChatSender::Admin.to_db(), 0);
        assert_eq!(ChatSender::System.to_db(), -1);
        assert_eq!(ChatSender::User(42).to_db(), 42);
        assert_eq!(ChatSender::from_db(0), ChatSender::Admin);
        assert_eq!(ChatSender::from_db(-1), ChatSender::System);
        assert_eq!(ChatSender::from_db(42), ChatSender::User(42));
    }

    #[test]
    fn test_unread_bookkeeping_excludes_admin() {
        assert!(!ChatSender::Admin.counts_as_unread_for_admin());
        assert!(ChatSender::System.counts_as_unread_for_admin());
        assert!(ChatSender::User(7).counts_as_unread_for_admin());
    }
}
