//! Customer socket
//!
//! 协议:
//! - Server → Client: ClientEvent (Ready, Message, OrderUpdated, Error)
//! - Client → Server: ClientCommand (SendMessage, MarkRead)

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use shared::models::{ChatSender, User};
use shared::realtime::{ClientCommand, ClientEvent};

use super::{PING_INTERVAL, error_parts, send_message};
use crate::auth::CurrentCustomer;
use crate::core::ServerState;
use crate::db::repository::{RepoResult, chat, order};
use crate::error::CoreError;

/// GET /ws/client?init_data=<initData>
pub async fn handle_client_ws(
    State(state): State<ServerState>,
    CurrentCustomer(customer): CurrentCustomer,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| client_session(socket, state, customer))
}

/// History, unread count and orders for the handshake
async fn ready_event(state: &ServerState, user_id: i64) -> RepoResult<ClientEvent> {
    Ok(ClientEvent::Ready {
        history: chat::history(&state.pool, user_id).await?,
        unread_count: chat::unread_for_user(&state.pool, user_id).await?,
        orders: order::find_by_user(&state.pool, user_id).await?,
    })
}

async fn client_session(socket: WebSocket, state: ServerState, customer: User) {
    let (mut sink, mut stream) = socket.split();
    let user_id = customer.id;

    // 先注册再取快照：期间的事件留在队列里，Ready 之后补发
    let (session_id, mut rx) = state.registry.register_user(user_id);
    tracing::info!(user_id, session = %session_id, "Client WS connected");

    let ready = match ready_event(&state, user_id).await {
        Ok(event) => event,
        Err(e) => {
            tracing::error!(user_id, error = %e, "Client handshake failed");
            let (code, message) = error_parts(CoreError::from(e));
            let _ = send_message(&mut sink, &ClientEvent::Error { code, message }).await;
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
                    match event {
                        Some(event) => {
                            if send_message(&mut sink, &event).await.is_err() {
                                break;
                            }
                        }
                        // registry closed
                        None => break,
                    }
                }

                msg = stream.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            let reply = match serde_json::from_str::<ClientCommand>(&text) {
                                Ok(cmd) => handle_command(&state, user_id, cmd).await,
                                Err(e) => Some(ClientEvent::Error {
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
    tracing::info!(user_id, session = %session_id, "Client WS disconnected");
}

/// Returns an event for the caller only when the command failed
async fn handle_command(state: &ServerState, user_id: i64, cmd: ClientCommand) -> Option<ClientEvent> {
    let result = match cmd {
        ClientCommand::SendMessage { content } => {
            let content = content.trim();
            if content.is_empty() {
                Err(CoreError::Validation("message must not be empty".into()))
            } else {
                // 发送者自己通过 registry 收到回显
                state
                    .notifier
                    .post(user_id, ChatSender::User(user_id), content, true)
                    .await
                    .map(|_| ())
                    .map_err(CoreError::from)
            }
        }
        ClientCommand::MarkRead => chat::mark_read_by_user(&state.pool, user_id)
            .await
            .map_err(CoreError::from),
    };

    result.err().map(|e| {
        let (code, message) = error_parts(e);
        ClientEvent::Error { code, message }
    })
}
