//! Comment repository
//!
//! Database operations for comments.

use crate::models::Comment;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Create a comment
    async fn create(&self, comment: &Comment) -> Result<Comment>;

    /// Get comment by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// List comments, optionally restricted to one news item
    async fn list(&self, news_id: Option<i64>) -> Result<Vec<Comment>>;

    /// Update content and news item. The author is never rewritten.
    async fn update(&self, comment: &Comment) -> Result<Comment>;

    /// Delete a comment
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based comment repository implementation
pub struct SqlxCommentRepository {
    pool: SqlitePool,
}

impl SqlxCommentRepository {
    /// Create a new SQLx comment repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: SqlitePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, comment: &Comment) -> Result<Comment> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO comments (content, news_id, user_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&comment.content)
        .bind(comment.news_id)
        .bind(comment.user_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to create comment")?;

        Ok(Comment {
            id: result.last_insert_rowid(),
            created_at: now,
            updated_at: now,
            ..comment.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        let row = sqlx::query(
            r#"
            SELECT id, content, news_id, user_id, created_at, updated_at
            FROM comments
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get comment by ID")?;

        row.as_ref().map(row_to_comment).transpose()
    }

    async fn list(&self, news_id: Option<i64>) -> Result<Vec<Comment>> {
        let rows = sqlx::query(
            r#"
            SELECT id, content, news_id, user_id, created_at, updated_at
            FROM comments
            WHERE ? IS NULL OR news_id = ?
            ORDER BY id
            "#,
        )
        .bind(news_id)
        .bind(news_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list comments")?;

        rows.iter().map(row_to_comment).collect()
    }

    async fn update(&self, comment: &Comment) -> Result<Comment> {
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE comments
            SET content = ?, news_id = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&comment.content)
        .bind(comment.news_id)
        .bind(now)
        .bind(comment.id)
        .execute(&self.pool)
        .await
        .context("Failed to update comment")?;

        self.get_by_id(comment.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Comment not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete comment")?;

        Ok(())
    }
}

fn row_to_comment(row: &sqlx::sqlite::SqliteRow) -> Result<Comment> {
    Ok(Comment {
        id: row.try_get("id")?,
        content: row.try_get("content")?,
        news_id: row.try_get("news_id")?,
        user_id: row.try_get("user_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        CategoryRepository, NewsRepository, SqlxCategoryRepository, SqlxNewsRepository,
        SqlxUserRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Category, News, User};

    /// Returns the repository plus (user id, first news id, second news id)
    async fn setup() -> (SqlxCommentRepository, i64, i64, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let user = SqlxUserRepository::new(pool.clone())
            .create(&User::new("reader".to_string(), None, "h".to_string()))
            .await
            .expect("user");
        let category = SqlxCategoryRepository::new(pool.clone())
            .create(&Category::new("General".to_string(), "general".to_string()))
            .await
            .expect("category");
        let news = SqlxNewsRepository::new(pool.clone());
        let first = news
            .create(&News::new("a".to_string(), "a".to_string(), category.id, user.id))
            .await
            .expect("news a");
        let second = news
            .create(&News::new("b".to_string(), "b".to_string(), category.id, user.id))
            .await
            .expect("news b");

        (SqlxCommentRepository::new(pool), user.id, first.id, second.id)
    }

    #[tokio::test]
    async fn test_create_and_get_comment() {
        let (repo, user_id, news_id, _) = setup().await;

        let created = repo
            .create(&Comment::new("Nice".to_string(), news_id, user_id))
            .await
            .expect("create");
        let found = repo
            .get_by_id(created.id)
            .await
            .expect("query")
            .expect("exists");

        assert_eq!(found.content, "Nice");
        assert_eq!(found.news_id, news_id);
        assert_eq!(found.user_id, user_id);
    }

    #[tokio::test]
    async fn test_list_comments_filtered_by_news() {
        let (repo, user_id, first, second) = setup().await;
        for news_id in [first, second, second] {
            repo.create(&Comment::new("c".to_string(), news_id, user_id))
                .await
                .expect("create");
        }

        assert_eq!(repo.list(None).await.expect("list").len(), 3);
        assert_eq!(repo.list(Some(first)).await.expect("list").len(), 1);
        assert_eq!(repo.list(Some(second)).await.expect("list").len(), 2);
    }

    #[tokio::test]
    async fn test_update_comment_moves_news() {
        let (repo, user_id, first, second) = setup().await;
        let mut created = repo
            .create(&Comment::new("c".to_string(), first, user_id))
            .await
            .expect("create");

        created.content = "edited".to_string();
        created.news_id = second;
        let updated = repo.update(&created).await.expect("update");

        assert_eq!(updated.content, "edited");
        assert_eq!(updated.news_id, second);
        assert_eq!(updated.user_id, user_id);
    }

    #[tokio::test]
    async fn test_delete_comment() {
        let (repo, user_id, news_id, _) = setup().await;
        let created = repo
            .create(&Comment::new("c".to_string(), news_id, user_id))
            .await
            .expect("create");

        repo.delete(created.id).await.expect("delete");

        assert!(repo.get_by_id(created.id).await.expect("query").is_none());
    }
}
