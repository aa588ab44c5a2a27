//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // 404 Not Found
            Self::NotFound | Self::OrderNotFound | Self::PaymentNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::AlreadyExists | Self::InvalidTransition => StatusCode::CONFLICT,

            // 401 Unauthorized
            Self::NotAuthenticated
            | Self::TokenExpired
            | Self::TokenInvalid
            | Self::WebhookSignatureInvalid => StatusCode::UNAUTHORIZED,

            // 403 Forbidden
            Self::PermissionDenied | Self::UserBanned => StatusCode::FORBIDDEN,

            // 502 Bad Gateway (the wallet refused or failed)
            Self::SettlementFailed | Self::InvoiceFailed => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable (transient errors, client can retry)
            Self::Retriable => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            Self::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,

            // 400 Bad Request
            Self::ValidationFailed | Self::InvalidRequest => StatusCode::BAD_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_status() {
        assert_eq!(ErrorCode::NotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::OrderNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::PaymentNotFound.http_status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_webhook_signature_is_unauthorized() {
        assert_eq!(
            ErrorCode::WebhookSignatureInvalid.http_status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_invalid_transition_is_conflict() {
        assert_eq!(ErrorCode::InvalidTransition.http_status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_retriable_is_service_unavailable() {
        assert_eq!(
            ErrorCode::Retriable.http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ErrorCode::DatabaseError.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_settlement_is_bad_gateway() {
        assert_eq!(ErrorCode::SettlementFailed.http_status(), StatusCode::BAD_GATEWAY);
    }
}
