use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{BotApi, PushMessage};

/// Producer side of the push queue
#[derive(Clone)]
pub struct PushQueue {
    tx: mpsc::Sender<PushMessage>,
}

impl PushQueue {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<PushMessage>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Enqueue without waiting. Returns `false` when the queue is full or closed.
    pub fn push(&self, message: PushMessage) -> bool {
        match self.tx.try_send(message) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(m)) => {
                tracing::warn!(chat_id = m.chat_id, "Push queue full, message dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(m)) => {
                tracing::warn!(chat_id = m.chat_id, "Push queue closed, message dropped");
                false
            }
        }
    }
}

/// Drains the push queue into the Bot API
pub struct PushWorker {
    bot: Arc<dyn BotApi>,
}

impl PushWorker {
    pub fn new(bot: Arc<dyn BotApi>) -> Self {
        Self { bot }
    }

    pub async fn run(self, mut rx: mpsc::Receiver<PushMessage>, shutdown: CancellationToken) {
        tracing::info!("Push worker started");
        loop {
            tokio::select! {
                maybe = rx.recv() => {
                    let Some(message) = maybe else {
                        tracing::info!("Push queue closed");
                        return;
                    };
                    // best effort: failures are logged, never retried
                    if let Err(e) = self.bot.send_message(&message).await {
                        tracing::warn!(chat_id = message.chat_id, error = %e, "Bot push failed");
                    }
                }
                _ = shutdown.cancelled() => {
                    tracing::info!("Push worker received shutdown signal");
                    return;
                }
            }
        }
    }
}
