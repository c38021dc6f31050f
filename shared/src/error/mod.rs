//! Unified error system for the marketplace services
//!
//! - [`ErrorCode`]: Standardized numeric error codes
//! - [`AppError`]: Rich error type with code, message and details
//! - [`ErrorBody`]: The `{code, message}` body every failing endpoint returns
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode};
//!
//! let err = AppError::with_message(ErrorCode::InvalidCredentials, "Invalid credentials");
//! assert_eq!(err.http_status(), shared::http::StatusCode::UNAUTHORIZED);
//!
//! let err = AppError::validation("Name is required").with_detail("field", "name");
//! assert_eq!(err.code, ErrorCode::ValidationFailed);
//! ```

mod codes;
mod http;
mod types;

pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{AppError, AppResult, ErrorBody};
