use axum::Json;
use axum::extract::State;
use shared::error::AppResult;
use shared::models::{InvoiceRequest, InvoiceResponse};

use crate::auth::CurrentCustomer;
use crate::core::ServerState;

/// POST /api/payments - 创建发票
pub async fn create(
    State(state): State<ServerState>,
    CurrentCustomer(customer): CurrentCustomer,
    Json(payload): Json<InvoiceRequest>,
) -> AppResult<Json<InvoiceResponse>> {
    let invoice = state
        .reconciler
        .create_invoice(&customer, payload.offer_id, payload.currency)
        .await?;
    Ok(Json(invoice))
}
