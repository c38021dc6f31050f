//! Shared types for the Ayurveda marketplace
//!
//! Wire DTOs, the user/role model and the unified error types used by the
//! backend services and the session client.

pub mod client;
pub mod error;
pub mod models;

// Re-exports
pub use http;
pub use serde::{Deserialize, Serialize};

pub use client::{AuthSession, LoginRequest, PasswordUpdate, ProfileUpdate, RegisterRequest};
pub use error::{AppError, AppResult, ErrorBody, ErrorCode};
pub use models::{Role, RoleQuery, UserRecord};
