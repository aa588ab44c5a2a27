//! Live sockets
//!
//! - GET /ws/client?init_data=<initData> - 客户：聊天 + 自己的订单
//! - GET /ws/admin?token=<token>         - 管理员房间：全部会话 + 订单
//!
//! Browsers cannot set headers on a WebSocket upgrade, so credentials ride
//! in the query string. Each socket registers with the connection registry
//! and unregisters by session id when it closes.

mod admin;
mod client;

use axum::Router;
use axum::extract::ws::Message;
use axum::routing::get;
use futures::SinkExt;
use serde::Serialize;
use shared::error::AppError;
use std::time::Duration;

use crate::core::ServerState;
use crate::error::CoreError;

const PING_INTERVAL: Duration = Duration::from_secs(30);

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/ws/client", get(client::handle_client_ws))
        .route("/ws/admin", get(admin::handle_admin_ws))
}

async fn send_message<S, T>(sink: &mut S, msg: &T) -> Result<(), ()>
where
    S: futures::Sink<Message, Error = axum::Error> + Unpin,
    T: Serialize,
{
    let json = serde_json::to_string(msg).map_err(|_| ())?;
    sink.send(Message::Text(json.into())).await.map_err(|_| ())
}

/// `(code, message)` for an `Error` socket event
fn error_parts(err: CoreError) -> (u16, String) {
    let app: AppError = err.into();
    (app.code.code(), app.message)
}
