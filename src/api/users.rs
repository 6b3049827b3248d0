//! User API endpoints
//!
//! Reading, creating and deleting accounts is limited to superusers and
//! admins. Updates are superuser-only; admins get a dedicated refusal.
//!
//! - GET/POST /users
//! - GET/PUT/PATCH/DELETE /users/{id}

use axum::{extract::State, http::StatusCode, routing::get, Router};
use serde::Serialize;

use crate::api::extract::{Json, Path};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{CreateUserInput, UpdateUserInput, User};
use crate::services::UpdateMode;

/// Response for user info
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_admin: bool,
    pub is_manager: bool,
    pub is_superuser: bool,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            phone_number: user.phone_number,
            is_active: user.is_active,
            is_staff: user.is_staff,
            is_admin: user.is_admin,
            is_manager: user.is_manager,
            is_superuser: user.is_superuser,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Build the users router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user)
                .put(replace_user)
                .patch(patch_user)
                .delete(delete_user),
        )
}

async fn list_users(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.user_service.list(&actor).await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

async fn create_user(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Json(input): Json<CreateUserInput>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let user = state.user_service.create(&actor, input).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

async fn get_user(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.user_service.retrieve(&actor, id).await?;
    Ok(Json(user.into()))
}

async fn replace_user(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(input): Json<UpdateUserInput>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .user_service
        .update(&actor, id, input, UpdateMode::Replace)
        .await?;
    Ok(Json(user.into()))
}

async fn patch_user(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(input): Json<UpdateUserInput>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .user_service
        .update(&actor, id, input, UpdateMode::Partial)
        .await?;
    Ok(Json(user.into()))
}

async fn delete_user(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.user_service.delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
