//! News repository
//!
//! Database operations for news items.

use crate::models::News;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

/// News repository trait
#[async_trait]
pub trait NewsRepository: Send + Sync {
    /// Create a news item
    async fn create(&self, news: &News) -> Result<News>;

    /// Get news by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<News>>;

    /// List news, optionally restricted to one category
    async fn list(&self, category_id: Option<i64>) -> Result<Vec<News>>;

    /// Update title, content and category. The author is never rewritten.
    async fn update(&self, news: &News) -> Result<News>;

    /// Delete a news item together with its comments
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based news repository implementation
pub struct SqlxNewsRepository {
    pool: SqlitePool,
}

impl SqlxNewsRepository {
    /// Create a new SQLx news repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: SqlitePool) -> Arc<dyn NewsRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl NewsRepository for SqlxNewsRepository {
    async fn create(&self, news: &News) -> Result<News> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO news (title, content, category_id, author_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&news.title)
        .bind(&news.content)
        .bind(news.category_id)
        .bind(news.author_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to create news")?;

        Ok(News {
            id: result.last_insert_rowid(),
            created_at: now,
            updated_at: now,
            ..news.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<News>> {
        let row = sqlx::query(
            r#"
            SELECT id, title, content, category_id, author_id, created_at, updated_at
            FROM news
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get news by ID")?;

        row.as_ref().map(row_to_news).transpose()
    }

    async fn list(&self, category_id: Option<i64>) -> Result<Vec<News>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, content, category_id, author_id, created_at, updated_at
            FROM news
            WHERE ? IS NULL OR category_id = ?
            ORDER BY id
            "#,
        )
        .bind(category_id)
        .bind(category_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list news")?;

        rows.iter().map(row_to_news).collect()
    }

    async fn update(&self, news: &News) -> Result<News> {
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE news
            SET title = ?, content = ?, category_id = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&news.title)
        .bind(&news.content)
        .bind(news.category_id)
        .bind(now)
        .bind(news.id)
        .execute(&self.pool)
        .await
        .context("Failed to update news")?;

        self.get_by_id(news.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("News not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM comments WHERE news_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete news comments")?;

        sqlx::query("DELETE FROM news WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete news")?;

        tx.commit().await.context("Failed to commit news deletion")?;
        Ok(())
    }
}

fn row_to_news(row: &sqlx::sqlite::SqliteRow) -> Result<News> {
    Ok(News {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        category_id: row.try_get("category_id")?,
        author_id: row.try_get("author_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        CategoryRepository, SqlxCategoryRepository, SqlxUserRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Category, User};

    struct Fixture {
        pool: SqlitePool,
        repo: SqlxNewsRepository,
        author: User,
        tech: Category,
        sport: Category,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let author = SqlxUserRepository::new(pool.clone())
            .create(&User::new("author".to_string(), None, "h".to_string()))
            .await
            .expect("author");
        let categories = SqlxCategoryRepository::new(pool.clone());
        let tech = categories
            .create(&Category::new("Tech".to_string(), "tech".to_string()))
            .await
            .expect("tech");
        let sport = categories
            .create(&Category::new("Sport".to_string(), "sport".to_string()))
            .await
            .expect("sport");

        Fixture {
            repo: SqlxNewsRepository::new(pool.clone()),
            pool,
            author,
            tech,
            sport,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_news() {
        let f = setup().await;
        let created = f
            .repo
            .create(&News::new("Hello".to_string(), "World".to_string(), f.tech.id, f.author.id))
            .await
            .expect("create");

        let found = f
            .repo
            .get_by_id(created.id)
            .await
            .expect("query")
            .expect("exists");

        assert_eq!(found.title, "Hello");
        assert_eq!(found.author_id, f.author.id);
        assert_eq!(found.category_id, f.tech.id);
    }

    #[tokio::test]
    async fn test_create_news_with_missing_category_fails() {
        let f = setup().await;
        let result = f
            .repo
            .create(&News::new("t".to_string(), "c".to_string(), 999, f.author.id))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_list_news_filtered_by_category() {
        let f = setup().await;
        for category in [f.tech.id, f.tech.id, f.sport.id] {
            f.repo
                .create(&News::new("t".to_string(), "c".to_string(), category, f.author.id))
                .await
                .expect("create");
        }

        assert_eq!(f.repo.list(None).await.expect("list").len(), 3);
        assert_eq!(f.repo.list(Some(f.tech.id)).await.expect("list").len(), 2);
        assert_eq!(f.repo.list(Some(f.sport.id)).await.expect("list").len(), 1);
        assert!(f.repo.list(Some(999)).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_update_news_keeps_author() {
        let f = setup().await;
        let mut created = f
            .repo
            .create(&News::new("t".to_string(), "c".to_string(), f.tech.id, f.author.id))
            .await
            .expect("create");

        created.title = "changed".to_string();
        created.category_id = f.sport.id;
        created.author_id = 12345;
        let updated = f.repo.update(&created).await.expect("update");

        assert_eq!(updated.title, "changed");
        assert_eq!(updated.category_id, f.sport.id);
        assert_eq!(updated.author_id, f.author.id);
    }

    #[tokio::test]
    async fn test_delete_news_cascades_to_comments() {
        let f = setup().await;
        let created = f
            .repo
            .create(&News::new("t".to_string(), "c".to_string(), f.tech.id, f.author.id))
            .await
            .expect("create");
        let now = Utc::now();
        sqlx::query("INSERT INTO comments (content, news_id, user_id, created_at, updated_at) VALUES ('x', ?, ?, ?, ?)")
            .bind(created.id)
            .bind(f.author.id)
            .bind(now)
            .bind(now)
            .execute(&f.pool)
            .await
            .expect("comment");

        f.repo.delete(created.id).await.expect("delete");

        let comments: i64 = sqlx::query("SELECT COUNT(*) as count FROM comments")
            .fetch_one(&f.pool)
            .await
            .expect("count")
            .get("count");
        assert_eq!(comments, 0);
        assert!(f.repo.get_by_id(created.id).await.expect("query").is_none());
    }
}
