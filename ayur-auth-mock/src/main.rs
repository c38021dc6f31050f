use std::sync::Arc;

use ayur_auth_mock::{AppState, Config, api};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ayur_auth_mock=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env();
    let addr = format!("0.0.0.0:{}", config.port);
    if !config.auth_delay.is_zero() {
        info!(delay_ms = config.auth_delay.as_millis() as u64, "Auth latency enabled");
    }

    let state = Arc::new(AppState::new(config)?);
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("ayur-auth-mock listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
