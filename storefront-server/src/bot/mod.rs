//! Telegram bot push channel
//!
//! Out-of-band messages for customers without a live session. Pushes go
//! through a bounded queue drained by [`PushWorker`]; enqueueing never waits
//! on the Bot API.

mod push;
mod telegram;

pub use push::{PushQueue, PushWorker};
pub use telegram::TelegramBot;

use async_trait::async_trait;

/// Inline keyboard button attached to a push
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushButton {
    /// Opens the mini-app at the given URL
    WebApp { text: String, url: String },
    Url { text: String, url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
    /// Telegram chat id (the customer's telegram id)
    pub chat_id: i64,
    pub text: String,
    pub button: Option<PushButton>,
}

impl PushMessage {
    pub fn new(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            button: None,
        }
    }

    pub fn with_web_app(mut self, text: impl Into<String>, url: impl Into<String>) -> Self {
        self.button = Some(PushButton::WebApp {
            text: text.into(),
            url: url.into(),
        });
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("Bot API rejected message: {0}")]
    Rejected(String),
    #[error("Bot API transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Outbound bot messaging
#[async_trait]
pub trait BotApi: Send + Sync {
    async fn send_message(&self, message: &PushMessage) -> Result<(), BotError>;
}
