//! Category API endpoints
//!
//! - GET /categories - List categories
//! - POST /categories - Create category (staff, admin, superuser)
//! - GET /categories/{id} - Get category
//! - PUT/PATCH /categories/{id} - Rename category
//! - DELETE /categories/{id} - Delete category with its news and comments

use axum::{extract::State, http::StatusCode, routing::get, Router};
use serde::Serialize;

use crate::api::extract::{Json, Path};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{Category, CreateCategoryInput, UpdateCategoryInput};
use crate::services::UpdateMode;

/// Response for a single category
#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
            slug: category.slug,
            created_at: category.created_at.to_rfc3339(),
            updated_at: category.updated_at.to_rfc3339(),
        }
    }
}

/// Build the categories router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/{id}",
            get(get_category)
                .put(replace_category)
                .patch(patch_category)
                .delete(delete_category),
        )
}

async fn list_categories(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<CategoryResponse>>, ApiError> {
    let categories = state.category_service.list(&user).await?;
    Ok(Json(categories.into_iter().map(Into::into).collect()))
}

async fn create_category(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(input): Json<CreateCategoryInput>,
) -> Result<(StatusCode, Json<CategoryResponse>), ApiError> {
    let category = state.category_service.create(&user, input).await?;
    Ok((StatusCode::CREATED, Json(category.into())))
}

async fn get_category(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let category = state.category_service.retrieve(&user, id).await?;
    Ok(Json(category.into()))
}

async fn replace_category(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(input): Json<UpdateCategoryInput>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let category = state
        .category_service
        .update(&user, id, input, UpdateMode::Replace)
        .await?;
    Ok(Json(category.into()))
}

async fn patch_category(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(input): Json<UpdateCategoryInput>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let category = state
        .category_service
        .update(&user, id, input, UpdateMode::Partial)
        .await?;
    Ok(Json(category.into()))
}

async fn delete_category(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.category_service.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
