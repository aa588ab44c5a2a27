use anyhow::Context;
use std::sync::Arc;

use storefront_server::bot::{PushQueue, PushWorker, TelegramBot};
use storefront_server::db::DbService;
use storefront_server::settlement::{RetryQueue, SettlementRetryWorker};
use storefront_server::wallet::CryptoPayClient;
use storefront_server::{BackgroundTasks, Config, ServerState, api, init_logger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 环境 (.env) 与日志
    let _ = dotenvy::dotenv();
    let config = Config::from_env().map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    init_logger(Some(&config.log_level), config.log_dir.as_deref());

    tracing::info!(env = %config.environment, "Storefront server starting");

    // 2. 数据库
    let db = DbService::new(&config.database_url)
        .await
        .context("database startup failed")?;

    // 3. 外部服务客户端
    let wallet = Arc::new(
        CryptoPayClient::new(&config.wallet_api_url, &config.wallet_api_token, config.wallet_timeout)
            .context("wallet client")?,
    );
    let bot = Arc::new(
        TelegramBot::new(&config.bot_api_url, &config.bot_token, config.bot_timeout)
            .context("bot client")?,
    );

    // 4. 状态 + 后台任务
    let (push, push_rx) = PushQueue::channel(config.push_queue_capacity);
    let (retry, retry_rx) = RetryQueue::channel(config.settlement_queue_capacity);
    let state = ServerState::new(config.clone(), db.pool.clone(), wallet, push, retry.clone());

    let mut tasks = BackgroundTasks::new();
    let shutdown = tasks.shutdown_token();
    tasks.spawn("push_worker", PushWorker::new(bot).run(push_rx, shutdown.clone()));
    tasks.spawn(
        "settlement_retry",
        SettlementRetryWorker::new(
            state.settlement.clone(),
            db.pool.clone(),
            retry,
            config.settlement_max_attempts,
            config.settlement_retry_delay,
        )
        .run(retry_rx, shutdown.clone()),
    );

    // 5. HTTP
    let registry = state.registry.clone();
    let app = api::create_router(state);
    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    tracing::info!("HTTP listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await
        .context("HTTP server error")?;

    // 关闭所有会话队列，socket 循环随之退出
    registry.close();
    tasks.shutdown().await;
    db.pool.close().await;

    tracing::info!("Storefront server stopped");
    Ok(())
}
