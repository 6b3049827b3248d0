//! API middleware
//!
//! Contains:
//! - Shared application state
//! - The JSON error envelope and its mapping from service errors
//! - Bearer token authentication

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::config::AuthConfig;
use crate::db::repositories::{
    SqlxCategoryRepository, SqlxCommentRepository, SqlxNewsRepository, SqlxUserRepository,
};
use crate::models::User;
use crate::services::{
    CategoryService, CategoryServiceError, CommentService, CommentServiceError, FieldErrors,
    NewsService, NewsServiceError, TokenIssuer, UserService, UserServiceError,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub user_service: Arc<UserService>,
    pub category_service: Arc<CategoryService>,
    pub news_service: Arc<NewsService>,
    pub comment_service: Arc<CommentService>,
}

impl AppState {
    /// Wire repositories and services over one pool
    pub fn new(pool: SqlitePool, auth: &AuthConfig) -> Self {
        let users = SqlxUserRepository::boxed(pool.clone());
        let categories = SqlxCategoryRepository::boxed(pool.clone());
        let news = SqlxNewsRepository::boxed(pool.clone());
        let comments = SqlxCommentRepository::boxed(pool.clone());
        let tokens = Arc::new(TokenIssuer::new(auth));

        Self {
            user_service: Arc::new(UserService::new(users, tokens)),
            category_service: Arc::new(CategoryService::new(categories.clone())),
            news_service: Arc::new(NewsService::new(news.clone(), categories)),
            comment_service: Arc::new(CommentService::new(comments, news)),
            pool,
        }
    }
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication credentials were not provided."))
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    /// A 400 carrying per-field messages under `details`
    pub fn invalid_fields(errors: &FieldErrors) -> Self {
        match serde_json::to_value(errors) {
            Ok(details) => Self::with_details("VALIDATION_ERROR", "Invalid input.", details),
            Err(_) => Self::validation_error(errors.to_string()),
        }
    }

    /// Log the cause and hide it from the client
    pub fn internal_error(err: impl std::fmt::Display) -> Self {
        tracing::error!("Internal error: {}", err);
        Self::new("INTERNAL_ERROR", "Internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::Authentication(message) => ApiError::unauthorized(message),
            UserServiceError::Token(e) => ApiError::unauthorized(e.to_string()),
            UserServiceError::Validation(errors) => ApiError::invalid_fields(&errors),
            UserServiceError::PermissionDenied(denied) => ApiError::forbidden(denied.reason),
            UserServiceError::NotFound(_) => ApiError::not_found("User not found"),
            UserServiceError::InternalError(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<CategoryServiceError> for ApiError {
    fn from(err: CategoryServiceError) -> Self {
        match err {
            CategoryServiceError::NotFound(_) => ApiError::not_found("Category not found"),
            CategoryServiceError::PermissionDenied(denied) => ApiError::forbidden(denied.reason),
            CategoryServiceError::Validation(errors) => ApiError::invalid_fields(&errors),
            CategoryServiceError::InternalError(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<NewsServiceError> for ApiError {
    fn from(err: NewsServiceError) -> Self {
        match err {
            NewsServiceError::NotFound(_) => ApiError::not_found("News not found"),
            NewsServiceError::PermissionDenied(denied) => ApiError::forbidden(denied.reason),
            NewsServiceError::Validation(errors) => ApiError::invalid_fields(&errors),
            NewsServiceError::InternalError(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<CommentServiceError> for ApiError {
    fn from(err: CommentServiceError) -> Self {
        match err {
            CommentServiceError::NotFound(_) => ApiError::not_found("Comment not found"),
            CommentServiceError::PermissionDenied(denied) => ApiError::forbidden(denied.reason),
            CommentServiceError::Validation(errors) => ApiError::invalid_fields(&errors),
            CommentServiceError::InternalError(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

/// Extract a bearer token from the Authorization header
fn extract_bearer_token(request: &Request) -> Option<String> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?
        .trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Authentication middleware
///
/// Resolves the access token to an active user and stores it in the request
/// extensions for [`AuthenticatedUser`].
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&request)
        .ok_or_else(|| ApiError::unauthorized("Authentication credentials were not provided."))?;

    let user = match state.user_service.authenticate(&token).await {
        Ok(user) => user,
        Err(UserServiceError::InternalError(e)) => {
            return Err(ApiError::internal_error(format!("{:#}", e)))
        }
        Err(e) => {
            tracing::debug!("Rejected bearer token: {}", e);
            return Err(ApiError::unauthorized(e.to_string()));
        }
    };

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}
