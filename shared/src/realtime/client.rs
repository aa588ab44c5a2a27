//! Customer socket protocol

use serde::{Deserialize, Serialize};

use crate::models::{ChatMessage, Order};

/// Server → 客户端 推送消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// 握手完成，携带完整聊天记录（重连即补齐漏推的消息）
    Ready {
        history: Vec<ChatMessage>,
        unread_count: i64,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        orders: Vec<Order>,
    },

    /// 新聊天消息（管理员回复或系统消息）
    Message { message: ChatMessage },

    /// 自己的订单状态变化
    OrderUpdated { order: Order },

    /// 命令处理失败
    Error { code: u16, message: String },
}

/// 客户端 → Server 命令
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientCommand {
    SendMessage { content: String },
    MarkRead,
}
