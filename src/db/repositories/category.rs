//! Category repository
//!
//! Database operations for categories.
//!
//! This module provides:
//! - `CategoryRepository` trait defining the interface for category data access
//! - `SqlxCategoryRepository` implementing the trait for SQLite

use crate::models::Category;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Create a new category
    async fn create(&self, category: &Category) -> Result<Category>;

    /// Get category by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    /// Get category by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>>;

    /// List all categories ordered by ID
    async fn list(&self) -> Result<Vec<Category>>;

    /// Update a category's name. The slug is fixed at creation.
    async fn update(&self, category: &Category) -> Result<Category>;

    /// Delete a category together with its news and their comments
    async fn delete(&self, id: i64) -> Result<()>;

    /// Check if a category slug already exists
    async fn exists_by_slug(&self, slug: &str) -> Result<bool>;
}

/// SQLx-based category repository implementation
pub struct SqlxCategoryRepository {
    pool: SqlitePool,
}

impl SqlxCategoryRepository {
    /// Create a new SQLx category repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: SqlitePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, category: &Category) -> Result<Category> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO categories (name, slug, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&category.name)
        .bind(&category.slug)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to create category")?;

        Ok(Category {
            id: result.last_insert_rowid(),
            name: category.name.clone(),
            slug: category.slug.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, slug, created_at, updated_at
            FROM categories
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get category by ID")?;

        row.as_ref().map(row_to_category).transpose()
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, slug, created_at, updated_at
            FROM categories
            WHERE slug = ?
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get category by slug")?;

        row.as_ref().map(row_to_category).transpose()
    }

    async fn list(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, slug, created_at, updated_at
            FROM categories
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list categories")?;

        rows.iter().map(row_to_category).collect()
    }

    async fn update(&self, category: &Category) -> Result<Category> {
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE categories
            SET name = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&category.name)
        .bind(now)
        .bind(category.id)
        .execute(&self.pool)
        .await
        .context("Failed to update category")?;

        self.get_by_id(category.id)
            .await?
            .context("Category vanished during update")
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM comments WHERE news_id IN (SELECT id FROM news WHERE category_id = ?)")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete comments of category news")?;

        sqlx::query("DELETE FROM news WHERE category_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete category news")?;

        sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete category")?;

        tx.commit().await.context("Failed to commit category deletion")?;
        Ok(())
    }

    async fn exists_by_slug(&self, slug: &str) -> Result<bool> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM categories WHERE slug = ?")
            .bind(slug)
            .fetch_one(&self.pool)
            .await
            .context("Failed to check category slug existence")?;

        let count: i64 = row.try_get("count")?;
        Ok(count > 0)
    }
}

fn row_to_category(row: &sqlx::sqlite::SqliteRow) -> Result<Category> {
    Ok(Category {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, is_unique_violation, migrations};

    async fn setup_test_repo() -> (SqlitePool, SqlxCategoryRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxCategoryRepository::new(pool.clone());
        (pool, repo)
    }

    fn create_test_category(name: &str, slug: &str) -> Category {
        Category::new(name.to_string(), slug.to_string())
    }

    async fn count(pool: &SqlitePool, table: &str) -> i64 {
        sqlx::query(&format!("SELECT COUNT(*) as count FROM {}", table))
            .fetch_one(pool)
            .await
            .expect("count")
            .get("count")
    }

    #[tokio::test]
    async fn test_create_category() {
        let (_pool, repo) = setup_test_repo().await;

        let created = repo
            .create(&create_test_category("Test Category", "test-category"))
            .await
            .expect("Failed to create category");

        assert!(created.id > 0);
        assert_eq!(created.slug, "test-category");
        assert_eq!(created.name, "Test Category");
    }

    #[tokio::test]
    async fn test_get_category_by_id_and_slug() {
        let (_pool, repo) = setup_test_repo().await;
        let created = repo
            .create(&create_test_category("Sports", "sports"))
            .await
            .expect("create");

        let by_id = repo.get_by_id(created.id).await.expect("query");
        let by_slug = repo.get_by_slug("sports").await.expect("query");

        assert_eq!(by_id.map(|c| c.name), Some("Sports".to_string()));
        assert_eq!(by_slug.map(|c| c.id), Some(created.id));
        assert!(repo.get_by_id(9999).await.expect("query").is_none());
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create(&create_test_category("World", "world"))
            .await
            .expect("first");

        let err = repo
            .create(&create_test_category("WORLD", "world"))
            .await
            .expect_err("duplicate slug");

        assert!(is_unique_violation(&err));
        assert!(repo.exists_by_slug("world").await.expect("exists"));
        assert!(!repo.exists_by_slug("other").await.expect("exists"));
    }

    #[tokio::test]
    async fn test_update_category() {
        let (_pool, repo) = setup_test_repo().await;
        let mut created = repo
            .create(&create_test_category("Old", "old"))
            .await
            .expect("create");

        created.name = "New".to_string();
        created.slug = "new".to_string();
        repo.update(&created).await.expect("update");

        let stored = repo
            .get_by_id(created.id)
            .await
            .expect("query")
            .expect("exists");
        assert_eq!(stored.name, "New");
        assert_eq!(stored.slug, "old");
    }

    #[tokio::test]
    async fn test_list_categories() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create(&create_test_category("A", "a")).await.expect("a");
        repo.create(&create_test_category("B", "b")).await.expect("b");

        let all = repo.list().await.expect("list");
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].slug, "a");
    }

    #[tokio::test]
    async fn test_delete_category_cascades() {
        let (pool, repo) = setup_test_repo().await;
        let keep = repo.create(&create_test_category("Keep", "keep")).await.expect("keep");
        let gone = repo.create(&create_test_category("Gone", "gone")).await.expect("gone");

        let now = Utc::now();
        sqlx::query("INSERT INTO users (username, password_hash, created_at, updated_at) VALUES ('u', 'h', ?, ?)")
            .bind(now)
            .bind(now)
            .execute(&pool)
            .await
            .expect("user");
        for category_id in [keep.id, gone.id] {
            sqlx::query("INSERT INTO news (title, content, category_id, author_id, created_at, updated_at) VALUES ('t', 'c', ?, 1, ?, ?)")
                .bind(category_id)
                .bind(now)
                .bind(now)
                .execute(&pool)
                .await
                .expect("news");
        }
        sqlx::query("INSERT INTO comments (content, news_id, user_id, created_at, updated_at) SELECT 'x', id, 1, ?, ? FROM news")
            .bind(now)
            .bind(now)
            .execute(&pool)
            .await
            .expect("comments");

        repo.delete(gone.id).await.expect("delete");

        assert!(repo.get_by_id(gone.id).await.expect("query").is_none());
        assert!(repo.get_by_id(keep.id).await.expect("query").is_some());
        assert_eq!(count(&pool, "news").await, 1);
        assert_eq!(count(&pool, "comments").await, 1);
    }
}
