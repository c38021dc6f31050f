//! Ayur Client - session client for the Ayurveda marketplace API
//!
//! Owns the signed-in session: restoring it at startup, signing in and out,
//! keeping the HTTP credential in step and answering role questions.

pub mod config;
pub mod error;
pub mod guard;
pub mod http;
pub mod session;
pub mod storage;

pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use guard::{Access, RouteGuard, landing_route};
pub use http::{AuthApi, NetworkHttpClient};
pub use session::{SessionManager, SessionSnapshot, SessionStatus};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};

// Re-export shared types for convenience
pub use shared::client::AuthSession;
pub use shared::{LoginRequest, PasswordUpdate, ProfileUpdate, RegisterRequest, Role, UserRecord};
