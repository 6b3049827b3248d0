//! Authentication API endpoints
//!
//! - POST /auth/login - Exchange credentials for an access/refresh pair
//! - POST /auth/register - Self-service registration
//! - POST /auth/refresh - Exchange a refresh token for a new access token
//! - POST /auth/verify - Check that a token is genuine and unexpired

use axum::{extract::State, http::StatusCode, routing::post, Router};
use serde::{Deserialize, Serialize};

use crate::api::extract::Json;
use crate::api::middleware::{ApiError, AppState};
use crate::api::users::UserResponse;
use crate::models::CreateUserInput;
use crate::services::TokenPair;

/// Request body for user login
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VerifyRequest {
    pub token: String,
}

/// Build the auth router. None of these routes require a token.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/refresh", post(refresh))
        .route("/auth/verify", post(verify))
}

async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let pair = state.user_service.login(&body.username, &body.password).await?;
    Ok(Json(pair))
}

async fn register(
    State(state): State<AppState>,
    Json(input): Json<CreateUserInput>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let user = state.user_service.register(input).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let access = state.user_service.refresh(&body.refresh).await?;
    Ok(Json(RefreshResponse { access }))
}

async fn verify(
    State(state): State<AppState>,
    Json(body): Json<VerifyRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.user_service.verify_token(&body.token)?;
    Ok(Json(serde_json::json!({})))
}
