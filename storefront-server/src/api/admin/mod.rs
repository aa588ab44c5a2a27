//! Admin API (static admin token)

mod handler;

use axum::Router;
use axum::routing::{get, patch};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/admin/orders", get(handler::list_orders))
        .route("/api/admin/orders/{id}", get(handler::get_order))
        .route("/api/admin/orders/{id}/status", patch(handler::change_status))
        .route("/api/admin/users/{id}", patch(handler::update_user))
}
