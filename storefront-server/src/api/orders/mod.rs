//! Customer order API

mod handler;

use axum::Router;
use axum::routing::{get, post};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/orders", get(handler::list_mine))
        .route("/api/orders/{id}", get(handler::get_by_id))
        .route("/api/orders/{id}/details", post(handler::submit_details))
}
