//! Payments API

mod handler;

use axum::Router;
use axum::routing::post;

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/payments", post(handler::create))
}
