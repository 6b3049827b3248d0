//! Database layer
//!
//! SQLite storage for users, categories, news and comments.
//!
//! The store owns every uniqueness constraint (username, email, phone number,
//! category slug) and every cascade rule. Services pre-check uniqueness to
//! produce friendly messages, but a concurrent writer that slips past the
//! pre-check is still rejected here; see [`is_unique_violation`].
//!
//! # Usage
//!
//! ```ignore
//! use newsroom::config::DatabaseConfig;
//! use newsroom::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool, ping};

/// Whether an error chain bottoms out in a UNIQUE constraint failure.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<sqlx::Error>(),
            Some(sqlx::Error::Database(db)) if db.is_unique_violation()
        )
    })
}

/// The `table.column` named by a UNIQUE constraint failure, if any.
///
/// SQLite reports these as `UNIQUE constraint failed: users.email`.
pub fn unique_violation_column(err: &anyhow::Error) -> Option<String> {
    err.chain().find_map(|cause| match cause.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db)) if db.is_unique_violation() => db
            .message()
            .split_once("constraint failed:")
            .map(|(_, columns)| columns.trim().to_string()),
        _ => None,
    })
}
