//! API layer - HTTP handlers and routing
//!
//! - Auth endpoints (public)
//! - Category, news, comment and user endpoints (bearer token required)

pub mod auth;
pub mod categories;
pub mod comments;
pub mod extract;
pub mod middleware;
pub mod news;
pub mod users;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use middleware::{ApiError, AppState, AuthenticatedUser};

fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if origin == "*" {
        return cors.allow_origin(Any);
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => cors.allow_origin(value),
        Err(_) => {
            tracing::warn!("Ignoring invalid CORS origin: {}", origin);
            cors
        }
    }
}

/// Build the application router
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let protected = Router::new()
        .merge(categories::router())
        .merge(news::router())
        .merge(comments::router())
        .merge(users::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .merge(auth::router())
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origin))
        .with_state(state)
}
