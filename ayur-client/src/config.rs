//! Client configuration

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ClientError, ClientResult};

/// Default API base URL (the Express backend mounts its routes under `/api`)
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// Client configuration for connecting to the marketplace API
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL (e.g., "http://localhost:5000/api")
    pub base_url: String,

    /// Request timeout. `None` keeps the HTTP client's own default (no bound).
    pub timeout: Option<Duration>,

    /// Directory holding the persisted session file.
    /// `None` keeps the session in memory only.
    pub storage_dir: Option<PathBuf>,
}

impl ClientConfig {
    /// Create a new client configuration
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: None,
            storage_dir: None,
        }
    }

    /// Read configuration from the environment (and a `.env` file if present).
    ///
    /// - `AYUR_API_URL`: base URL, defaults to [`DEFAULT_API_URL`]
    /// - `AYUR_HTTP_TIMEOUT_SECS`: request timeout in seconds
    /// - `AYUR_SESSION_DIR`: directory for the persisted session
    pub fn from_env() -> ClientResult<Self> {
        dotenvy::dotenv().ok();

        let base_url =
            std::env::var("AYUR_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let timeout = match std::env::var("AYUR_HTTP_TIMEOUT_SECS") {
            Ok(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    ClientError::Config(format!("AYUR_HTTP_TIMEOUT_SECS is not a number: {raw}"))
                })?;
                Some(Duration::from_secs(secs))
            }
            Err(_) => None,
        };

        let storage_dir = std::env::var("AYUR_SESSION_DIR").ok().map(PathBuf::from);

        Ok(Self {
            base_url,
            timeout,
            storage_dir,
        })
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Persist the session under `dir`
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = Some(dir.into());
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = ClientConfig::new("http://api.test")
            .with_timeout(Duration::from_secs(10))
            .with_storage_dir("/tmp/ayur");
        assert_eq!(config.base_url, "http://api.test");
        assert_eq!(config.timeout, Some(Duration::from_secs(10)));
        assert_eq!(config.storage_dir, Some(PathBuf::from("/tmp/ayur")));
    }

    #[test]
    fn test_default_has_no_timeout() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_API_URL);
        assert!(config.timeout.is_none());
        assert!(config.storage_dir.is_none());
    }
}
