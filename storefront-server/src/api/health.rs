//! Health check endpoint

use axum::Json;
use axum::extract::State;

use crate::core::ServerState;

pub async fn health_check(State(state): State<ServerState>) -> Json<serde_json::Value> {
    let database = sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&state.pool)
        .await
        .is_ok();
    Json(serde_json::json!({
        "status": if database { "ok" } else { "degraded" },
        "service": "storefront-server",
        "version": env!("CARGO_PKG_VERSION"),
        "admins_online": state.registry.admin_count(),
    }))
}
