//! REST routes of the marketplace auth contract
//!
//! Everything is mounted under `/api`, matching the base URL clients use.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequestParts, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use shared::client::{AuthSession, MeResponse, ProfileResponse, SuccessResponse};
use shared::{
    AppError, AppResult, LoginRequest, PasswordUpdate, ProfileUpdate, RegisterRequest, UserRecord,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::jwt::JwtService;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/profile", put(update_profile))
        .route("/profile/password", put(update_password));

    Router::new()
        .nest("/api", api)
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Signed-in user resolved from the bearer token
pub struct AuthUser(pub UserRecord);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let Some(token) = header.and_then(JwtService::extract_from_header) else {
            tracing::warn!(uri = %parts.uri, "Missing bearer token");
            return Err(AppError::not_authenticated());
        };

        match state.verify(token).await {
            Ok(user) => Ok(AuthUser(user)),
            Err(e) => {
                tracing::warn!(uri = %parts.uri, error = %e, "Rejected bearer token");
                Err(e)
            }
        }
    }
}

/// Body decoding failures become 400s with the standard error body
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::validation(rejection.body_text()))
}

async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<AuthSession>)> {
    let req = body(payload)?;
    state.simulate_latency().await;

    let user = state.register(req).await?;
    let token = state.issue_token(&user)?;
    Ok((StatusCode::CREATED, Json(AuthSession { token, user })))
}

async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<AuthSession>> {
    let req = body(payload)?;
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::validation("Please provide email and password"));
    }
    state.simulate_latency().await;

    let user = state
        .authenticate(&req.email, &req.password)
        .await
        .inspect_err(|_| tracing::warn!(email = %req.email, "Login failed"))?;
    let token = state.issue_token(&user)?;
    tracing::info!(user_id = %user.id, "User logged in");
    Ok(Json(AuthSession { token, user }))
}

async fn me(State(state): State<Arc<AppState>>, AuthUser(user): AuthUser) -> Json<MeResponse> {
    state.simulate_latency().await;
    Json(MeResponse { data: Some(user) })
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    payload: Result<Json<ProfileUpdate>, JsonRejection>,
) -> AppResult<Json<ProfileResponse>> {
    let update = body(payload)?;
    let updated = state.update_profile(&user.id, update).await?;
    Ok(Json(ProfileResponse {
        success: true,
        data: Some(updated),
        message: None,
    }))
}

async fn update_password(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    payload: Result<Json<PasswordUpdate>, JsonRejection>,
) -> AppResult<Json<SuccessResponse>> {
    let update = body(payload)?;
    state.change_password(&user.id, update).await?;
    Ok(Json(SuccessResponse {
        success: true,
        message: Some("Password updated successfully".to_string()),
    }))
}
