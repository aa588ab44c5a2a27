use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use serde::Serialize;

use crate::core::ServerState;
use crate::error::CoreResult;
use crate::wallet::signature::SIGNATURE_HEADER;

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub created: bool,
    pub order_id: Option<i64>,
}

/// POST /webhooks/wallet
///
/// 200 on success or replay, 401 bad signature, 404 unknown payment,
/// 503 when the provider should retry.
pub async fn wallet_webhook(
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: Bytes,
) -> CoreResult<Json<WebhookAck>> {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    let outcome = state.reconciler.handle_webhook(&body, signature).await?;
    Ok(Json(WebhookAck {
        created: outcome.created,
        order_id: outcome.order.map(|o| o.id),
    }))
}
