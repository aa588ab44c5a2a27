use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::SettlementEngine;
use crate::db::repository::order;

/// A settlement to retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryJob {
    pub order_id: i64,
    /// Attempts already made
    pub attempt: u32,
}

/// Producer side of the settlement retry queue
#[derive(Clone)]
pub struct RetryQueue {
    tx: mpsc::Sender<RetryJob>,
}

impl RetryQueue {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<RetryJob>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Queue a first retry after an inline settlement failed.
    ///
    /// Waits for room when the queue is full. `false` only once the worker
    /// has stopped; the startup sweep picks the order up again.
    pub async fn enqueue(&self, order_id: i64) -> bool {
        self.send(RetryJob {
            order_id,
            attempt: 1,
        })
        .await
    }

    async fn send(&self, job: RetryJob) -> bool {
        match self.tx.send(job).await {
            Ok(()) => true,
            Err(_) => {
                tracing::error!(order_id = job.order_id, "Settlement retry not queued, worker stopped");
                false
            }
        }
    }
}

/// Background worker: at-least-once settlement with exponential backoff
pub struct SettlementRetryWorker {
    engine: Arc<SettlementEngine>,
    pool: SqlitePool,
    queue: RetryQueue,
    max_attempts: u32,
    base_delay: Duration,
}

impl SettlementRetryWorker {
    pub fn new(
        engine: Arc<SettlementEngine>,
        pool: SqlitePool,
        queue: RetryQueue,
        max_attempts: u32,
        base_delay: Duration,
    ) -> Self {
        Self {
            engine,
            pool,
            queue,
            max_attempts,
            base_delay,
        }
    }

    /// `base * 2^(attempt-1)`, capped at 64x
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.pow(attempt.saturating_sub(1).min(6))
    }

    pub async fn run(self, mut rx: mpsc::Receiver<RetryJob>, shutdown: CancellationToken) {
        tracing::info!(max_attempts = self.max_attempts, "Settlement retry worker started");
        self.sweep_unsettled(&shutdown).await;
        loop {
            tokio::select! {
                maybe = rx.recv() => {
                    let Some(job) = maybe else {
                        return;
                    };
                    self.process(job, &shutdown).await;
                }
                _ = shutdown.cancelled() => {
                    tracing::info!("Settlement retry worker received shutdown signal");
                    return;
                }
            }
        }
    }

    /// Settle completed referred orders left without a ledger row by a
    /// previous run (queue lost on restart)
    async fn sweep_unsettled(&self, shutdown: &CancellationToken) {
        let pending = match order::find_unsettled_referred(&self.pool).await {
            Ok(pending) => pending,
            Err(e) => {
                tracing::error!(error = %e, "Settlement sweep failed");
                return;
            }
        };
        if pending.is_empty() {
            return;
        }

        tracing::info!(count = pending.len(), "Settling orders left over from a previous run");
        for unsettled in pending {
            self.process(
                RetryJob {
                    order_id: unsettled.id,
                    attempt: 1,
                },
                shutdown,
            )
            .await;
        }
    }

    async fn process(&self, job: RetryJob, shutdown: &CancellationToken) {
        let order = match order::find_by_id(&self.pool, job.order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                tracing::warn!(order_id = job.order_id, "Settlement retry dropped, order not found");
                return;
            }
            Err(e) => {
                self.reschedule(job, &e.to_string(), shutdown);
                return;
            }
        };

        match self.engine.settle_completed_order(&order).await {
            Ok(Some(entry)) => {
                tracing::info!(order_id = order.id, transaction_id = entry.id, attempt = job.attempt, "Settlement retry succeeded");
            }
            Ok(None) => {
                tracing::debug!(order_id = order.id, "Settlement retry found nothing to do");
            }
            Err(e) => self.reschedule(job, &e.to_string(), shutdown),
        }
    }

    fn reschedule(&self, job: RetryJob, error: &str, shutdown: &CancellationToken) {
        if job.attempt >= self.max_attempts {
            tracing::error!(order_id = job.order_id, attempts = job.attempt, error, "Settlement gave up");
            return;
        }

        let delay = self.backoff(job.attempt);
        tracing::warn!(order_id = job.order_id, attempt = job.attempt, delay_ms = delay.as_millis() as u64, error, "Settlement failed, retrying");

        let next = RetryJob {
            order_id: job.order_id,
            attempt: job.attempt + 1,
        };
        let queue = self.queue.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    queue.send(next).await;
                }
                _ = shutdown.cancelled() => {}
            }
        });
    }
}
