//! Comment API endpoints
//!
//! - GET /comments?news={id} - List comments, optionally on one news item
//! - POST /comments - Comment as the caller (everyone but managers)
//! - GET /comments/{id} - Get comment
//! - PUT/PATCH /comments/{id} - Edit comment (admin only)
//! - DELETE /comments/{id} - Delete comment (admin only)

use axum::{extract::State, http::StatusCode, routing::get, Router};
use serde::{Deserialize, Serialize};

use crate::api::extract::{Json, Path, Query};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{Comment, CreateCommentInput, UpdateCommentInput};
use crate::services::UpdateMode;

/// Query parameters for listing comments
#[derive(Debug, Default, Deserialize)]
pub struct ListCommentsQuery {
    pub news: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: i64,
    pub content: String,
    pub news: i64,
    pub user: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            content: comment.content,
            news: comment.news_id,
            user: comment.user_id,
            created_at: comment.created_at.to_rfc3339(),
            updated_at: comment.updated_at.to_rfc3339(),
        }
    }
}

/// Build the comments router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/comments", get(list_comments).post(create_comment))
        .route(
            "/comments/{id}",
            get(get_comment)
                .put(replace_comment)
                .patch(patch_comment)
                .delete(delete_comment),
        )
}

async fn list_comments(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<ListCommentsQuery>,
) -> Result<Json<Vec<CommentResponse>>, ApiError> {
    let comments = state.comment_service.list(&user, query.news).await?;
    Ok(Json(comments.into_iter().map(Into::into).collect()))
}

async fn create_comment(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(input): Json<CreateCommentInput>,
) -> Result<(StatusCode, Json<CommentResponse>), ApiError> {
    let comment = state.comment_service.create(&user, input).await?;
    Ok((StatusCode::CREATED, Json(comment.into())))
}

async fn get_comment(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<CommentResponse>, ApiError> {
    let comment = state.comment_service.retrieve(&user, id).await?;
    Ok(Json(comment.into()))
}

async fn replace_comment(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(input): Json<UpdateCommentInput>,
) -> Result<Json<CommentResponse>, ApiError> {
    let comment = state
        .comment_service
        .update(&user, id, input, UpdateMode::Replace)
        .await?;
    Ok(Json(comment.into()))
}

async fn patch_comment(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(input): Json<UpdateCommentInput>,
) -> Result<Json<CommentResponse>, ApiError> {
    let comment = state
        .comment_service
        .update(&user, id, input, UpdateMode::Partial)
        .await?;
    Ok(Json(comment.into()))
}

async fn delete_comment(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.comment_service.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
