//! Engine error type
//!
//! `CoreError` is what the reconciler, the state machine and the settlement
//! engine return. HTTP and socket handlers convert it into `AppError`, which
//! carries the numeric code and status the clients switch on.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};
use shared::order::OrderStatus;
use thiserror::Error;

use crate::db::repository::RepoError;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Provider signature did not verify; nothing was written
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Order {0} not found")]
    OrderNotFound(i64),

    #[error("Payment {0} not found")]
    PaymentNotFound(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Order {order_id}: cannot move from {current} to {requested}")]
    InvalidTransition {
        order_id: i64,
        current: OrderStatus,
        requested: OrderStatus,
    },

    /// Wallet transfer failed; a cancellation was not committed
    #[error("Settlement failed: {0}")]
    Settlement(String),

    /// Wallet refused or failed to create an invoice
    #[error("Invoice creation failed: {0}")]
    Invoice(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    /// Transient failure (timeout, database busy); safe to retry
    #[error("Retriable: {0}")]
    Retriable(String),

    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl CoreError {
    pub fn invalid_transition(order_id: i64, current: OrderStatus, requested: OrderStatus) -> Self {
        CoreError::InvalidTransition {
            order_id,
            current,
            requested,
        }
    }

    /// Collapse storage failures into `Retriable` (domain errors pass through)
    pub fn into_retriable(self) -> Self {
        match self {
            CoreError::Repo(RepoError::Database(msg)) => CoreError::Retriable(msg),
            other => other,
        }
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Authentication(msg) => {
                AppError::with_message(ErrorCode::WebhookSignatureInvalid, msg)
            }
            CoreError::OrderNotFound(id) => {
                AppError::with_message(ErrorCode::OrderNotFound, format!("Order {id} not found"))
                    .with_detail("order_id", id)
            }
            CoreError::PaymentNotFound(external_id) => AppError::with_message(
                ErrorCode::PaymentNotFound,
                format!("Payment {external_id} not found"),
            )
            .with_detail("external_id", external_id),
            CoreError::NotFound(what) => AppError::not_found(what),
            CoreError::InvalidTransition {
                order_id,
                current,
                requested,
            } => AppError::invalid_transition(order_id, current.as_str(), requested.as_str()),
            CoreError::Settlement(msg) => AppError::settlement_failed(msg),
            CoreError::Invoice(msg) => AppError::with_message(ErrorCode::InvoiceFailed, msg),
            CoreError::Conflict(msg) => AppError::conflict(msg),
            CoreError::Forbidden(msg) => AppError::permission_denied(msg),
            CoreError::Validation(msg) => AppError::validation(msg),
            CoreError::Retriable(msg) => AppError::retriable(msg),
            CoreError::Repo(repo) => match repo {
                RepoError::NotFound(msg) => AppError::not_found(msg),
                RepoError::Duplicate(msg) => AppError::conflict(msg),
                RepoError::Validation(msg) => AppError::validation(msg),
                RepoError::Database(msg) => {
                    tracing::error!(error = %msg, "Repository error");
                    AppError::new(ErrorCode::DatabaseError)
                }
            },
        }
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
