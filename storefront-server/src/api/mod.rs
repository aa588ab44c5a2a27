//! API 路由模块
//!
//! - [`health`] - 健康检查
//! - [`webhooks`] - 钱包支付回调
//! - [`payments`] - 创建发票
//! - [`orders`] - 订单查询 / 提交订单资料
//! - [`admin`] - 订单状态 / 用户管理
//! - [`ws`] - 客户与管理员实时连接

pub mod admin;
pub mod health;
pub mod orders;
pub mod payments;
pub mod webhooks;
pub mod ws;

use axum::Router;
use axum::routing::get;
use http::{HeaderName, HeaderValue};
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::core::ServerState;

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Only the mini-app origin may call the API from a browser
fn cors_layer(webapp_url: &str) -> CorsLayer {
    let origin = url::Url::parse(webapp_url)
        .ok()
        .map(|u| u.origin().ascii_serialization())
        .and_then(|o| HeaderValue::from_str(&o).ok());
    match origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any),
        None => {
            tracing::warn!(webapp_url, "WEBAPP_URL has no usable origin, CORS is permissive");
            CorsLayer::permissive()
        }
    }
}

/// Build the full router
pub fn create_router(state: ServerState) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    Router::new()
        .route("/health", get(health::health_check))
        .merge(webhooks::router())
        .merge(payments::router())
        .merge(orders::router())
        .merge(admin::router())
        .merge(ws::router())
        .layer(cors_layer(&state.config.webapp_url))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id.clone(), UuidRequestId))
        .layer(PropagateRequestIdLayer::new(request_id))
        .with_state(state)
}
