//! Admin console socket protocol

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{ChatMessage, ChatOverview, Order};
use crate::order::OrderStatus;

/// Server → Console 推送消息
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AdminEvent {
    /// 握手完成，携带全部会话、订单和未读数
    Ready {
        chats: Vec<ChatOverview>,
        orders: Vec<Order>,
        /// user_id → unread_admin_count
        unread_counts: BTreeMap<i64, i64>,
    },

    /// 选中会话后的完整历史
    ChatHistory {
        user_id: i64,
        messages: Vec<ChatMessage>,
    },

    /// 任一会话的新消息，附带最新未读数，console 无需重新查询
    Message {
        message: ChatMessage,
        user_id: i64,
        unread_admin_count: i64,
    },

    /// 订单新建或状态变化
    OrderUpdated { order: Order },

    /// 命令处理失败
    Error { code: u16, message: String },
}

/// Console → Server 命令
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AdminCommand {
    /// 打开会话：返回历史并清零未读
    SelectChat { user_id: i64 },
    Reply { user_id: i64, content: String },
    ChangeStatus { order_id: i64, status: OrderStatus },
}
