//! Admin console socket
//!
//! 协议:
//! - Server → Console: AdminEvent (Ready, ChatHistory, Message, OrderUpdated, Error)
//! - Console → Server: AdminCommand (SelectChat, Reply, ChangeStatus)

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use shared::models::ChatSender;
use shared::realtime::{AdminCommand, AdminEvent};

use super::{PING_INTERVAL, error_parts, send_message};
use crate::auth::AdminSession;
use crate::core::ServerState;
use crate::db::repository::{RepoResult, chat, order};
use crate::error::CoreError;
use crate::orders::Actor;

/// GET /ws/admin?token=<token>
pub async fn handle_admin_ws(
    State(state): State<ServerState>,
    _admin: AdminSession,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| admin_session(socket, state))
}

async fn ready_event(state: &ServerState) -> RepoResult<AdminEvent> {
    let chats = chat::all_chats(&state.pool).await?;
    let unread_counts = chats
        .iter()
        .map(|c| (c.user_id, c.unread_admin_count))
        .collect();
    Ok(AdminEvent::Ready {
        chats,
        orders: order::find_all(&state.pool).await?,
        unread_counts,
    })
}

async fn admin_session(socket: WebSocket, state: ServerState) {
    let (mut sink, mut stream) = socket.split();

    let (session_id, mut rx) = state.registry.register_admin();
    tracing::info!(session = %session_id, admins = state.registry.admin_count(), "Admin WS connected");

    let ready = match ready_event(&state).await {
        Ok(event) => event,
        Err(e) => {
            tracing::error!(error = %e, "Admin handshake failed");
            let (code, message) = error_parts(CoreError::from(e));
            let _ = send_message(&mut sink, &AdminEvent::Error { code, message }).await;
            state.registry.unregister(session_id);
            return;
        }
    };
    if send_message(&mut sink, &ready).await.is_ok() {
        let mut ping_interval = tokio::time::interval(PING_INTERVAL);
        ping_interval.tick().await;

        loop {
            tokio::select! {
                _ = ping_interval.tick() => {
                    if sink.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }

                event = rx.recv() => {
                    let Some(event) = event else { break };
                    if send_message(&mut sink, &event).await.is_err() {
                        break;
                    }
                }

                msg = stream.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            let reply = match serde_json::from_str::<AdminCommand>(&text) {
                                Ok(cmd) => handle_command(&state, cmd).await,
                                Err(e) => Some(AdminEvent::Error {
                                    code: shared::error::ErrorCode::InvalidRequest.code(),
                                    message: format!("Unknown command: {e}"),
                                }),
                            };
                            if let Some(reply) = reply
                                && send_message(&mut sink, &reply).await.is_err()
                            {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Err(_)) => break,
                        _ => {}
                    }
                }
            }
        }
    }

    state.registry.unregister(session_id);
    tracing::info!(session = %session_id, "Admin WS disconnected");
}

/// Direct reply for this session, if any
async fn handle_command(state: &ServerState, cmd: AdminCommand) -> Option<AdminEvent> {
    let result = match cmd {
        AdminCommand::SelectChat { user_id } => select_chat(state, user_id).await,
        AdminCommand::Reply { user_id, content } => {
            let content = content.trim();
            if content.is_empty() {
                Err(CoreError::Validation("reply must not be empty".into()))
            } else {
                // 其他管理员和客户都经由 registry 收到
                state
                    .notifier
                    .post(user_id, ChatSender::Admin, content, true)
                    .await
                    .map(|_| None)
                    .map_err(CoreError::from)
            }
        }
        AdminCommand::ChangeStatus { order_id, status } => state
            .orders
            .transition(order_id, status, Actor::Admin)
            .await
            .map(|_| None),
    };

    match result {
        Ok(reply) => reply,
        Err(e) => {
            let (code, message) = error_parts(e);
            Some(AdminEvent::Error { code, message })
        }
    }
}

/// Open a chat: unread resets to zero, full history goes back to the caller
async fn select_chat(state: &ServerState, user_id: i64) -> Result<Option<AdminEvent>, CoreError> {
    chat::mark_read_by_admin(&state.pool, user_id).await?;
    let messages = chat::history(&state.pool, user_id).await?;
    Ok(Some(AdminEvent::ChatHistory { user_id, messages }))
}
