//! Wallet webhook
//!
//! POST /webhooks/wallet - raw body, signature in `crypto-pay-api-signature`

mod handler;

use axum::Router;
use axum::routing::post;

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/webhooks/wallet", post(handler::wallet_webhook))
}
