//! Ayur Auth Mock - stand-in for the marketplace auth backend
//!
//! Serves the register/login/me/profile endpoints with an in-memory user
//! store, argon2 password hashes and HS256 tokens. Used for local development
//! and by the session client's integration tests.

pub mod api;
pub mod config;
pub mod jwt;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub use config::Config;
pub use state::AppState;

/// Mock server running on a background task
pub struct MockServer {
    pub addr: SocketAddr,
    pub state: Arc<AppState>,
    handle: JoinHandle<()>,
}

impl MockServer {
    /// Bind `127.0.0.1:{config.port}` and serve until dropped
    pub async fn start(config: Config) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", config.port)).await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(AppState::new(config)?);
        let app = api::router(state.clone());

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Mock server stopped");
            }
        });
        tracing::info!(%addr, "ayur-auth-mock listening");

        Ok(Self {
            addr,
            state,
            handle,
        })
    }

    /// Base URL clients should be configured with
    pub fn api_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
