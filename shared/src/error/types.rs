//! `AppError` and the JSON error body

use super::codes::ErrorCode;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Error as the mini-app and the console see it
///
/// The code picks the HTTP status (and is echoed in socket `Error` events),
/// `details` carries ids the client can act on.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<HashMap<String, Value>>,
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Default message for `code`
    pub fn new(code: ErrorCode) -> Self {
        Self::with_message(code, code.message())
    }

    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ValidationFailed, msg)
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        let resource = resource.into();
        Self::with_message(ErrorCode::NotFound, format!("{resource} not found"))
            .with_detail("resource", resource)
    }

    pub fn not_authenticated() -> Self {
        Self::new(ErrorCode::NotAuthenticated)
    }

    pub fn invalid_token(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::TokenInvalid, msg)
    }

    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::PermissionDenied, msg)
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::AlreadyExists, msg)
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::DatabaseError, msg)
    }

    /// Status change rejected by the transition table
    pub fn invalid_transition(order_id: i64, from: &str, to: &str) -> Self {
        Self::with_message(
            ErrorCode::InvalidTransition,
            format!("order {order_id}: cannot move from {from} to {to}"),
        )
        .with_detail("order_id", order_id)
        .with_detail("current", from)
        .with_detail("requested", to)
    }

    /// Refund or payout transfer failed
    pub fn settlement_failed(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::SettlementFailed, msg)
    }

    /// 503: the wallet provider redelivers, clients may retry
    pub fn retriable(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::Retriable, msg)
    }
}

/// `{"code": 4008, "message": "...", "details": {...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Value>>,
}

impl From<&AppError> for ErrorBody {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.code.code(),
            message: err.message.clone(),
            details: err.details.clone(),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        if self.code.category().is_system() {
            tracing::error!(code = %self.code, message = %self.message, "System error");
        }
        (self.http_status(), axum::Json(ErrorBody::from(&self))).into_response()
    }
}
