//! Unified error codes for the storefront
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Order errors
//! - 5xxx: Payment / settlement errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so the mini-app and the
/// admin console can switch on them without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists (or already applied)
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,

    // ==================== 1xxx: Auth ====================
    /// Caller is not authenticated
    NotAuthenticated = 1001,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,
    /// Provider webhook signature did not verify
    WebhookSignatureInvalid = 1008,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// User is banned from the store
    UserBanned = 2006,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Requested status change is not allowed from the current status
    InvalidTransition = 4008,

    // ==================== 5xxx: Payment ====================
    /// Payment not found
    PaymentNotFound = 5006,
    /// Wallet transfer (refund or payout) failed
    SettlementFailed = 5007,
    /// Invoice could not be created
    InvoiceFailed = 5008,

    // ==================== 9xxx: System ====================
    /// Database error
    DatabaseError = 9002,
    /// Transient failure, the caller should retry
    Retriable = 9404,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 17] = [
        ErrorCode::ValidationFailed,
        ErrorCode::NotFound,
        ErrorCode::AlreadyExists,
        ErrorCode::InvalidRequest,
        ErrorCode::NotAuthenticated,
        ErrorCode::TokenExpired,
        ErrorCode::TokenInvalid,
        ErrorCode::WebhookSignatureInvalid,
        ErrorCode::PermissionDenied,
        ErrorCode::UserBanned,
        ErrorCode::OrderNotFound,
        ErrorCode::InvalidTransition,
        ErrorCode::PaymentNotFound,
        ErrorCode::SettlementFailed,
        ErrorCode::InvoiceFailed,
        ErrorCode::DatabaseError,
        ErrorCode::Retriable,
    ];

    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",

            // Auth
            ErrorCode::NotAuthenticated => "Caller is not authenticated",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",
            ErrorCode::WebhookSignatureInvalid => "Webhook signature is invalid",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::UserBanned => "User is banned",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::InvalidTransition => "Order status change is not allowed",

            // Payment
            ErrorCode::PaymentNotFound => "Payment not found",
            ErrorCode::SettlementFailed => "Wallet transfer failed",
            ErrorCode::InvoiceFailed => "Invoice could not be created",

            // System
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::Retriable => "Temporary failure, please retry later",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        ErrorCode::ALL
            .into_iter()
            .find(|code| code.code() == value)
            .ok_or(InvalidErrorCode(value))
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::ValidationFailed.code(), 2);
        assert_eq!(ErrorCode::NotFound.code(), 3);
        assert_eq!(ErrorCode::WebhookSignatureInvalid.code(), 1008);
        assert_eq!(ErrorCode::OrderNotFound.code(), 4001);
        assert_eq!(ErrorCode::InvalidTransition.code(), 4008);
        assert_eq!(ErrorCode::SettlementFailed.code(), 5007);
        assert_eq!(ErrorCode::Retriable.code(), 9404);
    }

    #[test]
    fn test_codes_are_unique_and_resolvable() {
        let mut seen = std::collections::HashSet::new();
        for code in ErrorCode::ALL {
            assert!(seen.insert(code.code()), "duplicate code {code}");
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
        }
    }

    #[test]
    fn test_try_from_rejects_unknown() {
        assert_eq!(ErrorCode::try_from(7777), Err(InvalidErrorCode(7777)));
        // retired codes stay unassigned
        assert_eq!(ErrorCode::try_from(0), Err(InvalidErrorCode(0)));
        assert_eq!(ErrorCode::try_from(9001), Err(InvalidErrorCode(9001)));
    }

    #[test]
    fn test_serde_as_number() {
        let json = serde_json::to_string(&ErrorCode::InvalidTransition).unwrap();
        assert_eq!(json, "4008");
        let code: ErrorCode = serde_json::from_str("5007").unwrap();
        assert_eq!(code, ErrorCode::SettlementFailed);
    }
}
