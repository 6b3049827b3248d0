//! News API endpoints
//!
//! - GET /news?category={id} - List news, optionally by category
//! - POST /news - Publish news as the caller
//! - GET /news/{id} - Get news
//! - PUT/PATCH /news/{id} - Edit news (author or staff/admin/superuser)
//! - DELETE /news/{id} - Delete news and its comments

use axum::{extract::State, http::StatusCode, routing::get, Router};
use serde::{Deserialize, Serialize};

use crate::api::extract::{Json, Path, Query};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{CreateNewsInput, News, UpdateNewsInput};
use crate::services::UpdateMode;

/// Query parameters for listing news
#[derive(Debug, Default, Deserialize)]
pub struct ListNewsQuery {
    pub category: Option<i64>,
}

/// Response for a single news item
#[derive(Debug, Serialize)]
pub struct NewsResponse {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category: i64,
    pub author: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<News> for NewsResponse {
    fn from(news: News) -> Self {
        Self {
            id: news.id,
            title: news.title,
            content: news.content,
            category: news.category_id,
            author: news.author_id,
            created_at: news.created_at.to_rfc3339(),
            updated_at: news.updated_at.to_rfc3339(),
        }
    }
}

/// Build the news router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/news", get(list_news).post(create_news))
        .route(
            "/news/{id}",
            get(get_news)
                .put(replace_news)
                .patch(patch_news)
                .delete(delete_news),
        )
}

async fn list_news(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<ListNewsQuery>,
) -> Result<Json<Vec<NewsResponse>>, ApiError> {
    let news = state.news_service.list(&user, query.category).await?;
    Ok(Json(news.into_iter().map(Into::into).collect()))
}

async fn create_news(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(input): Json<CreateNewsInput>,
) -> Result<(StatusCode, Json<NewsResponse>), ApiError> {
    let news = state.news_service.create(&user, input).await?;
    Ok((StatusCode::CREATED, Json(news.into())))
}

async fn get_news(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<NewsResponse>, ApiError> {
    let news = state.news_service.retrieve(&user, id).await?;
    Ok(Json(news.into()))
}

async fn replace_news(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(input): Json<UpdateNewsInput>,
) -> Result<Json<NewsResponse>, ApiError> {
    let news = state
        .news_service
        .update(&user, id, input, UpdateMode::Replace)
        .await?;
    Ok(Json(news.into()))
}

async fn patch_news(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(input): Json<UpdateNewsInput>,
) -> Result<Json<NewsResponse>, ApiError> {
    let news = state
        .news_service
        .update(&user, id, input, UpdateMode::Partial)
        .await?;
    Ok(Json(news.into()))
}

async fn delete_news(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.news_service.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
