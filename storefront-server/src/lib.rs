//! Storefront server - Telegram 小程序店铺的订单与实时同步引擎
//!
//! # 模块结构
//!
//! ```text
//! storefront-server/src/
//! ├── core/          # 配置、状态、后台任务
//! ├── api/           # HTTP 路由、webhook、WebSocket
//! ├── auth/          # Telegram initData 校验、管理员令牌
//! ├── db/            # SQLite 连接池 + repository
//! ├── reconciler/    # 支付回调对账
//! ├── orders/        # 订单状态机
//! ├── settlement/    # 推荐返佣、退款、重试
//! ├── live/          # 在线连接表
//! ├── notify/        # 聊天消息持久化 + 推送
//! ├── wallet/        # Crypto Pay 客户端
//! ├── bot/           # Telegram Bot 推送
//! └── utils/         # 日志
//! ```

pub mod api;
pub mod auth;
pub mod bot;
pub mod core;
pub mod db;
pub mod error;
pub mod live;
pub mod notify;
pub mod orders;
pub mod reconciler;
pub mod settlement;
pub mod utils;
pub mod wallet;

pub use core::{BackgroundTasks, Config, ServerState};
pub use error::{CoreError, CoreResult};
pub use utils::init_logger;
