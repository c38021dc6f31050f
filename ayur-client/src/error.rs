//! Client error types

use thiserror::Error;

use crate::storage::StorageError;

/// Text shown when the backend could not be reached at all
pub const UNREACHABLE_MESSAGE: &str =
    "Cannot reach the server. Please check your connection and try again.";

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// No response received (connection refused, DNS, timeout)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Backend answered with a non-2xx status
    #[error("API error ({status}): {}", .message.as_deref().unwrap_or("no message"))]
    Api {
        status: u16,
        /// `message` field of the error body, when present
        message: Option<String>,
    },

    /// 2xx response missing required fields or not decodable
    #[error("Malformed server response: {0}")]
    MalformedResponse(String),

    /// Local pre-check failed before any request was sent
    #[error("Validation error: {0}")]
    Validation(String),

    /// Persisted session storage failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Session was cleared or replaced while the request was in flight
    #[error("Session changed while the request was in flight")]
    SessionChanged,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// HTTP status of an API failure
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the backend rejected the credential itself (401)
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Message suitable for inline display.
    ///
    /// Server messages are surfaced verbatim; unreachable servers get a
    /// connectivity message; everything else falls back to `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ClientError::Network(_) => UNREACHABLE_MESSAGE.to_string(),
            ClientError::Api {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            ClientError::Validation(message) => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
