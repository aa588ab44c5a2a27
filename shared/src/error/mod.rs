//! Error codes shared by the server, the mini-app and the admin console
//!
//! ```
//! use shared::error::{AppError, ErrorBody};
//!
//! let err = AppError::invalid_transition(3, "completed", "canceled");
//! assert_eq!(ErrorBody::from(&err).code, 4008);
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{AppError, AppResult, ErrorBody};
