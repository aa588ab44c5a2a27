//! 后台任务管理
//!
//! Long-running workers (bot push, settlement retry) are spawned here and
//! stopped together through one cancellation token.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct RegisteredTask {
    name: &'static str,
    handle: JoinHandle<()>,
}

pub struct BackgroundTasks {
    tasks: Vec<RegisteredTask>,
    shutdown: CancellationToken,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Token the workers select on
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Spawn a worker; a panic is caught and logged instead of vanishing
    pub fn spawn<F>(&mut self, name: &'static str, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let shutdown = self.shutdown.clone();
        let wrapped = async move {
            match AssertUnwindSafe(future).catch_unwind().await {
                Ok(()) if shutdown.is_cancelled() => {}
                Ok(()) => tracing::warn!(task = name, "Background task exited unexpectedly"),
                Err(panic) => {
                    let msg = panic
                        .downcast_ref::<&str>()
                        .map(|s| (*s).to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".into());
                    tracing::error!(task = name, panic = %msg, "Background task panicked");
                }
            }
        };

        self.tasks.push(RegisteredTask {
            name,
            handle: tokio::spawn(wrapped),
        });
        tracing::debug!(task = name, "Registered background task");
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Cancel every task and wait for it to finish
    pub async fn shutdown(self) {
        tracing::info!("Shutting down {} background tasks...", self.tasks.len());
        self.shutdown.cancel();
        for task in self.tasks {
            if let Err(e) = task.handle.await {
                tracing::error!(task = task.name, error = ?e, "Task join failed");
            }
        }
        tracing::info!("All background tasks stopped");
    }
}

impl Default for BackgroundTasks {
    fn default() -> Self {
        Self::new()
    }
}
