use axum::Json;
use axum::extract::{Path, State};
use shared::error::{AppError, AppResult};
use shared::models::{Order, OrderStatusUpdate, User, UserAdminUpdate};

use crate::auth::AdminSession;
use crate::core::ServerState;
use crate::db::repository::{order, user};
use crate::error::CoreError;
use crate::orders::Actor;

/// GET /api/admin/orders - 全部订单（最新在前）
pub async fn list_orders(
    State(state): State<ServerState>,
    _admin: AdminSession,
) -> AppResult<Json<Vec<Order>>> {
    let orders = order::find_all(&state.pool).await.map_err(CoreError::from)?;
    Ok(Json(orders))
}

/// GET /api/admin/orders/{id}
pub async fn get_order(
    State(state): State<ServerState>,
    _admin: AdminSession,
    Path(id): Path<i64>,
) -> AppResult<Json<Order>> {
    let found = order::find_by_id(&state.pool, id)
        .await
        .map_err(CoreError::from)?
        .ok_or_else(|| AppError::from(CoreError::OrderNotFound(id)))?;
    Ok(Json(found))
}

/// PATCH /api/admin/orders/{id}/status
pub async fn change_status(
    State(state): State<ServerState>,
    _admin: AdminSession,
    Path(id): Path<i64>,
    Json(payload): Json<OrderStatusUpdate>,
) -> AppResult<Json<Order>> {
    let updated = state
        .orders
        .transition(id, payload.status, Actor::Admin)
        .await?;
    Ok(Json(updated))
}

/// PATCH /api/admin/users/{id} - 封禁 / 返佣比例
pub async fn update_user(
    State(state): State<ServerState>,
    _admin: AdminSession,
    Path(id): Path<i64>,
    Json(payload): Json<UserAdminUpdate>,
) -> AppResult<Json<User>> {
    if let Some(percent) = payload.referral_percent {
        user::set_referral_percent(&state.pool, id, percent)
            .await
            .map_err(CoreError::from)?;
    }
    if let Some(banned) = payload.is_banned {
        user::set_banned(&state.pool, id, banned)
            .await
            .map_err(CoreError::from)?;
        tracing::info!(user_id = id, banned, "User ban flag changed");
    }

    let updated = user::find_by_id(&state.pool, id)
        .await
        .map_err(CoreError::from)?
        .ok_or_else(|| AppError::not_found(format!("User {id}")))?;
    Ok(Json(updated))
}
