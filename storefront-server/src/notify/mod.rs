//! Notification fanout
//!
//! Persist a chat message, then deliver it wherever it needs to go: the
//! customer's live session, the admin room, and the bot push channel when
//! the customer is offline. Delivery never fails the caller.

use shared::models::{ChatMessage, ChatSender};
use shared::realtime::{AdminEvent, ClientEvent};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::bot::{PushMessage, PushQueue};
use crate::db::repository::{RepoResult, chat, user};
use crate::live::EventPublisher;

/// A stored message on its way out
#[derive(Debug, Clone)]
pub struct NotifyEvent {
    pub target_user_id: i64,
    pub message: ChatMessage,
    /// Admin unread counter after the message was stored
    pub unread_admin_count: i64,
    pub also_notify_admin: bool,
}

#[derive(Clone)]
pub struct Notifier {
    pool: SqlitePool,
    publisher: Arc<dyn EventPublisher>,
    push: PushQueue,
    webapp_url: String,
}

impl Notifier {
    pub fn new(
        pool: SqlitePool,
        publisher: Arc<dyn EventPublisher>,
        push: PushQueue,
        webapp_url: impl Into<String>,
    ) -> Self {
        Self {
            pool,
            publisher,
            push,
            webapp_url: webapp_url.into(),
        }
    }

    /// Store a message in the user's chat and fan it out
    pub async fn post(
        &self,
        user_id: i64,
        sender: ChatSender,
        content: &str,
        also_notify_admin: bool,
    ) -> RepoResult<ChatMessage> {
        let (message, unread_admin_count) =
            chat::append_message(&self.pool, user_id, sender, content).await?;

        self.notify(NotifyEvent {
            target_user_id: user_id,
            message: message.clone(),
            unread_admin_count,
            also_notify_admin,
        })
        .await;

        Ok(message)
    }

    /// Deliver an already stored message
    pub async fn notify(&self, event: NotifyEvent) {
        let NotifyEvent {
            target_user_id,
            message,
            unread_admin_count,
            also_notify_admin,
        } = event;

        if also_notify_admin {
            self.publisher.broadcast_admins(AdminEvent::Message {
                message: message.clone(),
                user_id: target_user_id,
                unread_admin_count,
            });
        }

        let delivered = self.publisher.send_to_user(
            target_user_id,
            ClientEvent::Message {
                message: message.clone(),
            },
        );
        if delivered {
            return;
        }

        // the customer's own words never bounce back as a push
        if message.sender() == ChatSender::User(target_user_id) {
            return;
        }

        match user::find_by_id(&self.pool, target_user_id).await {
            Ok(Some(customer)) => {
                let push = PushMessage::new(customer.telegram_id, message.content)
                    .with_web_app("Open chat", self.chat_url());
                self.push.push(push);
            }
            Ok(None) => {
                tracing::warn!(user_id = target_user_id, "Push skipped, user not found");
            }
            Err(e) => {
                tracing::warn!(user_id = target_user_id, error = %e, "Push skipped, user lookup failed");
            }
        }
    }

    pub fn chat_url(&self) -> String {
        format!("{}/chat", self.webapp_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::PushButton;
    use crate::db::repository::tests::{seed_user, test_pool};
    use crate::live::ConnectionRegistry;

    async fn setup() -> (
        SqlitePool,
        Arc<ConnectionRegistry>,
        Notifier,
        tokio::sync::mpsc::Receiver<PushMessage>,
    ) {
        let pool = test_pool().await;
        let registry = Arc::new(ConnectionRegistry::new(8));
        let (push, push_rx) = PushQueue::channel(8);
        let notifier = Notifier::new(pool.clone(), registry.clone(), push, "https://shop.example/");
        (pool, registry, notifier, push_rx)
    }

    #[tokio::test]
    async fn test_offline_customer_gets_push_with_exact_content() {
        let (pool, _registry, notifier, mut push_rx) = setup().await;
        let customer = seed_user(&pool, 5001).await;

        notifier
            .post(customer.id, ChatSender::Admin, "Your order is ready", false)
            .await
            .unwrap();

        let push = push_rx.try_recv().unwrap();
        assert_eq!(push.chat_id, 5001);
        assert_eq!(push.text, "Your order is ready");
        assert_eq!(
            push.button,
            Some(PushButton::WebApp {
                text: "Open chat".into(),
                url: "https://shop.example/chat".into(),
            })
        );
        assert!(push_rx.try_recv().is_err());

        // the push reuses the stored message, history holds it once
        let history = crate::db::repository::chat::history(&pool, customer.id)
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "Your order is ready");
    }

    #[tokio::test]
    async fn test_online_customer_gets_event_not_push() {
        let (pool, registry, notifier, mut push_rx) = setup().await;
        let customer = seed_user(&pool, 5002).await;
        let (_sid, mut rx) = registry.register_user(customer.id);

        let stored = notifier
            .post(customer.id, ChatSender::System, "Order #1 created", false)
            .await
            .unwrap();

        match rx.recv().await {
            Some(ClientEvent::Message { message }) => assert_eq!(message, stored),
            other => panic!("unexpected {other:?}"),
        }
        assert!(push_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_customer_message_goes_to_admins_without_push() {
        let (pool, registry, notifier, mut push_rx) = setup().await;
        let customer = seed_user(&pool, 5003).await;
        let (_admin, mut admin_rx) = registry.register_admin();

        notifier
            .post(customer.id, ChatSender::User(customer.id), "hello?", true)
            .await
            .unwrap();
        notifier
            .post(customer.id, ChatSender::User(customer.id), "anyone?", true)
            .await
            .unwrap();

        let mut counts = Vec::new();
        while let Ok(AdminEvent::Message {
            user_id,
            unread_admin_count,
            ..
        }) = admin_rx.try_recv()
        {
            assert_eq!(user_id, customer.id);
            counts.push(unread_admin_count);
        }
        assert_eq!(counts, vec![1, 2]);
        assert!(push_rx.try_recv().is_err(), "own messages are never pushed");
    }
}
