use sqlx::SqlitePool;
use std::sync::Arc;

use super::Config;
use crate::bot::PushQueue;
use crate::live::ConnectionRegistry;
use crate::notify::Notifier;
use crate::orders::OrdersManager;
use crate::reconciler::PaymentReconciler;
use crate::settlement::{RetryQueue, SettlementEngine};
use crate::wallet::WalletProvider;

/// 服务器状态 - 持有所有服务的共享引用
///
/// | 字段 | 说明 |
/// |------|------|
/// | config | 配置项 (不可变) |
/// | pool | SQLite 连接池 |
/// | registry | 在线连接表 (客户 / 管理员房间) |
/// | notifier | 聊天消息持久化 + 推送 |
/// | orders | 订单状态机 |
/// | reconciler | 支付回调对账 |
/// | settlement | 推荐返佣 / 退款 |
///
/// Cloning is cheap: every service sits behind an `Arc` or is itself a handle.
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub pool: SqlitePool,
    pub registry: Arc<ConnectionRegistry>,
    pub notifier: Notifier,
    pub orders: Arc<OrdersManager>,
    pub reconciler: Arc<PaymentReconciler>,
    pub settlement: Arc<SettlementEngine>,
}

impl ServerState {
    /// Wire the engine together. The push and retry queues are created by
    /// the caller, which also owns their receiving workers.
    pub fn new(
        config: Config,
        pool: SqlitePool,
        wallet: Arc<dyn WalletProvider>,
        push: PushQueue,
        retry: RetryQueue,
    ) -> Self {
        let registry = Arc::new(ConnectionRegistry::new(config.session_buffer));
        let settlement = Arc::new(SettlementEngine::new(
            pool.clone(),
            wallet.clone(),
            push.clone(),
            config.wallet_timeout,
        ));
        let notifier = Notifier::new(
            pool.clone(),
            registry.clone(),
            push.clone(),
            config.webapp_url.clone(),
        );
        let orders = Arc::new(OrdersManager::new(
            pool.clone(),
            settlement.clone(),
            notifier.clone(),
            registry.clone(),
            push,
            retry,
            config.webapp_url.clone(),
        ));
        let reconciler = Arc::new(PaymentReconciler::new(
            pool.clone(),
            wallet,
            orders.clone(),
            &config.wallet_api_token,
            config.reconcile_timeout,
            config.wallet_timeout,
        ));

        Self {
            config,
            pool,
            registry,
            notifier,
            orders,
            reconciler,
            settlement,
        }
    }
}
