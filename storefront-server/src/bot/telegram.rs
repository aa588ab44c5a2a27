use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

use super::{BotApi, BotError, PushButton, PushMessage};

/// Telegram Bot API client (plain REST, no SDK)
pub struct TelegramBot {
    client: reqwest::Client,
    api_url: String,
    token: String,
}

#[derive(Deserialize)]
struct BotResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramBot {
    pub fn new(api_url: &str, token: &str, timeout: Duration) -> Result<Self, BotError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }
}

fn reply_markup(button: &PushButton) -> Value {
    let button = match button {
        PushButton::WebApp { text, url } => json!({ "text": text, "web_app": { "url": url } }),
        PushButton::Url { text, url } => json!({ "text": text, "url": url }),
    };
    json!({ "inline_keyboard": [[button]] })
}

pub(super) fn send_message_body(message: &PushMessage) -> Value {
    let mut body = json!({
        "chat_id": message.chat_id,
        "text": message.text,
    });
    if let Some(button) = &message.button {
        body["reply_markup"] = reply_markup(button);
    }
    body
}

#[async_trait]
impl BotApi for TelegramBot {
    async fn send_message(&self, message: &PushMessage) -> Result<(), BotError> {
        let url = format!("{}/bot{}/sendMessage", self.api_url, self.token);
        let resp: BotResponse = self
            .client
            .post(url)
            .json(&send_message_body(message))
            .send()
            .await?
            .json()
            .await?;

        if resp.ok {
            Ok(())
        } else {
            Err(BotError::Rejected(
                resp.description.unwrap_or_else(|| "unknown error".into()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_message_has_no_markup() {
        let body = send_message_body(&PushMessage::new(42, "hi"));
        assert_eq!(body["chat_id"], 42);
        assert_eq!(body["text"], "hi");
        assert!(body.get("reply_markup").is_none());
    }

    #[test]
    fn test_web_app_button() {
        let msg = PushMessage::new(42, "new reply").with_web_app("Open chat", "https://shop/chat");
        let body = send_message_body(&msg);
        let button = &body["reply_markup"]["inline_keyboard"][0][0];
        assert_eq!(button["text"], "Open chat");
        assert_eq!(button["web_app"]["url"], "https://shop/chat");
    }
}
