use axum::Json;
use axum::extract::{Path, State};
use shared::error::{AppError, AppResult};
use shared::models::{Order, OrderDetailsSubmit};

use crate::auth::CurrentCustomer;
use crate::core::ServerState;
use crate::db::repository::order;
use crate::error::CoreError;

/// GET /api/orders - 当前用户的订单
pub async fn list_mine(
    State(state): State<ServerState>,
    CurrentCustomer(customer): CurrentCustomer,
) -> AppResult<Json<Vec<Order>>> {
    let orders = order::find_by_user(&state.pool, customer.id)
        .await
        .map_err(CoreError::from)?;
    Ok(Json(orders))
}

/// GET /api/orders/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    CurrentCustomer(customer): CurrentCustomer,
    Path(id): Path<i64>,
) -> AppResult<Json<Order>> {
    let found = order::find_by_id(&state.pool, id)
        .await
        .map_err(CoreError::from)?
        .filter(|o| o.user_id == customer.id)
        .ok_or_else(|| AppError::from(CoreError::OrderNotFound(id)))?;
    Ok(Json(found))
}

/// POST /api/orders/{id}/details - 提交订单资料（pending / invalid → process）
pub async fn submit_details(
    State(state): State<ServerState>,
    CurrentCustomer(customer): CurrentCustomer,
    Path(id): Path<i64>,
    Json(payload): Json<OrderDetailsSubmit>,
) -> AppResult<Json<Order>> {
    let updated = state
        .orders
        .submit_details(id, customer.id, payload.fields)
        .await?;
    Ok(Json(updated))
}
