//! News service
//!
//! Any authenticated actor may publish. Only the author or an elevated actor
//! may update or delete, and the author is always the creating actor.

use crate::db::repositories::{CategoryRepository, NewsRepository};
use crate::models::{CreateNewsInput, News, UpdateNewsInput, User};
use crate::permissions::{authorize, AccessContext, Action, PermissionDenied, Resource};
use crate::services::validation::{FieldErrors, UpdateMode, REQUIRED};
use anyhow::Context;
use std::sync::Arc;

const TITLE_MAX_LEN: usize = 200;

/// Error types for news service operations
#[derive(Debug, thiserror::Error)]
pub enum NewsServiceError {
    #[error("News not found: {0}")]
    NotFound(i64),

    #[error(transparent)]
    PermissionDenied(#[from] PermissionDenied),

    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<FieldErrors> for NewsServiceError {
    fn from(errors: FieldErrors) -> Self {
        NewsServiceError::Validation(errors)
    }
}

/// News service
pub struct NewsService {
    repo: Arc<dyn NewsRepository>,
    category_repo: Arc<dyn CategoryRepository>,
}

impl NewsService {
    pub fn new(repo: Arc<dyn NewsRepository>, category_repo: Arc<dyn CategoryRepository>) -> Self {
        Self {
            repo,
            category_repo,
        }
    }

    /// List news, optionally only those in `category_id`
    pub async fn list(
        &self,
        actor: &User,
        category_id: Option<i64>,
    ) -> Result<Vec<News>, NewsServiceError> {
        authorize(Resource::News, &AccessContext::new(actor, Action::Read))?;
        Ok(self.repo.list(category_id).await.context("Failed to list news")?)
    }

    pub async fn retrieve(&self, actor: &User, id: i64) -> Result<News, NewsServiceError> {
        let news = self.get(id).await?;
        authorize(
            Resource::News,
            &AccessContext::new(actor, Action::Read).with_owner(news.author_id),
        )?;
        Ok(news)
    }

    /// Publish a news item authored by `actor`
    pub async fn create(&self, actor: &User, input: CreateNewsInput) -> Result<News, NewsServiceError> {
        authorize(Resource::News, &AccessContext::new(actor, Action::Create))?;

        let mut errors = FieldErrors::new();
        validate_title(&mut errors, &input.title);
        errors.require_non_blank("content", &input.content);
        let category_id = match input.category_id {
            Some(id) => {
                self.check_category(&mut errors, id).await?;
                id
            }
            None => {
                errors.add("category", REQUIRED);
                0
            }
        };
        errors.into_result()?;

        let news = News::new(input.title, input.content, category_id, actor.id);
        let created = self.repo.create(&news).await.context("Failed to create news")?;

        tracing::info!("User {} published news {}", actor.id, created.id);
        Ok(created)
    }

    /// Update title, content or category. The author never changes.
    pub async fn update(
        &self,
        actor: &User,
        id: i64,
        input: UpdateNewsInput,
        mode: UpdateMode,
    ) -> Result<News, NewsServiceError> {
        let mut news = self.get(id).await?;
        authorize(
            Resource::News,
            &AccessContext::new(actor, Action::Update).with_owner(news.author_id),
        )?;

        if mode == UpdateMode::Replace {
            FieldErrors::missing(&input.missing_for_replace()).into_result()?;
        }

        let mut errors = FieldErrors::new();
        if let Some(title) = &input.title {
            validate_title(&mut errors, title);
        }
        if let Some(content) = &input.content {
            errors.require_non_blank("content", content);
        }
        if let Some(category_id) = input.category_id {
            self.check_category(&mut errors, category_id).await?;
        }
        errors.into_result()?;

        if let Some(title) = input.title {
            news.title = title;
        }
        if let Some(content) = input.content {
            news.content = content;
        }
        if let Some(category_id) = input.category_id {
            news.category_id = category_id;
        }

        Ok(self.repo.update(&news).await.context("Failed to update news")?)
    }

    /// Delete a news item and its comments
    pub async fn delete(&self, actor: &User, id: i64) -> Result<(), NewsServiceError> {
        let news = self.get(id).await?;
        authorize(
            Resource::News,
            &AccessContext::new(actor, Action::Delete).with_owner(news.author_id),
        )?;

        self.repo.delete(id).await.context("Failed to delete news")?;
        tracing::info!("User {} deleted news {}", actor.id, id);
        Ok(())
    }

    async fn get(&self, id: i64) -> Result<News, NewsServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get news by ID")?
            .ok_or(NewsServiceError::NotFound(id))
    }

    async fn check_category(
        &self,
        errors: &mut FieldErrors,
        category_id: i64,
    ) -> Result<(), NewsServiceError> {
        let exists = self
            .category_repo
            .get_by_id(category_id)
            .await
            .context("Failed to check category")?
            .is_some();
        if !exists {
            errors.add(
                "category",
                format!("Invalid pk \"{}\" - object does not exist.", category_id),
            );
        }
        Ok(())
    }
}

fn validate_title(errors: &mut FieldErrors, title: &str) {
    errors.require_non_blank("title", title);
    errors.max_length("title", title, TITLE_MAX_LEN);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxCategoryRepository, SqlxNewsRepository, SqlxUserRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::Category;

    struct Fixture {
        service: NewsService,
        author: User,
        stranger: User,
        admin: User,
        category_id: i64,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::new(pool.clone());
        let author = users
            .create(&User::new("author".to_string(), None, "h".to_string()))
            .await
            .expect("author");
        let stranger = users
            .create(&User::new("stranger".to_string(), None, "h".to_string()))
            .await
            .expect("stranger");
        let mut admin = User::new("admin".to_string(), None, "h".to_string());
        admin.is_admin = true;
        let admin = users.create(&admin).await.expect("admin");

        let categories = SqlxCategoryRepository::boxed(pool.clone());
        let category = categories
            .create(&Category::new("General".to_string(), "general".to_string()))
            .await
            .expect("category");

        Fixture {
            service: NewsService::new(SqlxNewsRepository::boxed(pool), categories),
            author,
            stranger,
            admin,
            category_id: category.id,
        }
    }

    fn input(category_id: i64) -> CreateNewsInput {
        CreateNewsInput {
            title: "Breaking".to_string(),
            content: "Something happened".to_string(),
            category_id: Some(category_id),
        }
    }

    #[tokio::test]
    async fn test_create_stamps_author() {
        let f = setup().await;
        let created = f
            .service
            .create(&f.author, input(f.category_id))
            .await
            .expect("create");

        assert_eq!(created.author_id, f.author.id);
    }

    #[tokio::test]
    async fn test_create_with_dangling_category() {
        let f = setup().await;
        let err = f
            .service
            .create(&f.author, input(999))
            .await
            .expect_err("dangling");

        assert!(matches!(err, NewsServiceError::Validation(ref e) if e.contains("category")));
    }

    #[tokio::test]
    async fn test_create_without_category() {
        let f = setup().await;
        let err = f
            .service
            .create(
                &f.author,
                CreateNewsInput {
                    category_id: None,
                    ..input(f.category_id)
                },
            )
            .await
            .expect_err("missing category");

        match err {
            NewsServiceError::Validation(e) => {
                assert_eq!(e.get("category"), Some(&[REQUIRED.to_string()][..]))
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stranger_denied_author_allowed() {
        let f = setup().await;
        let news = f
            .service
            .create(&f.author, input(f.category_id))
            .await
            .expect("create");

        let err = f
            .service
            .delete(&f.stranger, news.id)
            .await
            .expect_err("stranger");
        match err {
            NewsServiceError::PermissionDenied(denied) => {
                assert_eq!(denied.reason, "You can only delete your own news")
            }
            other => panic!("unexpected error: {:?}", other),
        }

        f.service.delete(&f.author, news.id).await.expect("author delete");
        assert!(matches!(
            f.service.retrieve(&f.author, news.id).await,
            Err(NewsServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_elevated_actor_updates_others_news() {
        let f = setup().await;
        let news = f
            .service
            .create(&f.author, input(f.category_id))
            .await
            .expect("create");

        let updated = f
            .service
            .update(
                &f.admin,
                news.id,
                UpdateNewsInput {
                    title: Some("Edited".to_string()),
                    ..Default::default()
                },
                UpdateMode::Partial,
            )
            .await
            .expect("admin update");

        assert_eq!(updated.title, "Edited");
        assert_eq!(updated.content, "Something happened");
        assert_eq!(updated.author_id, f.author.id);
    }

    #[tokio::test]
    async fn test_replace_requires_all_fields() {
        let f = setup().await;
        let news = f
            .service
            .create(&f.author, input(f.category_id))
            .await
            .expect("create");

        let err = f
            .service
            .update(
                &f.author,
                news.id,
                UpdateNewsInput {
                    title: Some("Only title".to_string()),
                    ..Default::default()
                },
                UpdateMode::Replace,
            )
            .await
            .expect_err("incomplete");

        match err {
            NewsServiceError::Validation(e) => {
                assert!(e.contains("content"));
                assert!(e.contains("category"));
                assert!(!e.contains("title"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_news_is_not_found_before_permission() {
        let f = setup().await;
        let err = f
            .service
            .update(&f.stranger, 4242, UpdateNewsInput::default(), UpdateMode::Partial)
            .await
            .expect_err("missing");

        assert!(matches!(err, NewsServiceError::NotFound(4242)));
    }

    #[tokio::test]
    async fn test_list_by_category() {
        let f = setup().await;
        f.service
            .create(&f.author, input(f.category_id))
            .await
            .expect("create");

        assert_eq!(f.service.list(&f.stranger, None).await.expect("list").len(), 1);
        assert_eq!(
            f.service
                .list(&f.stranger, Some(f.category_id))
                .await
                .expect("list")
                .len(),
            1
        );
        assert!(f.service.list(&f.stranger, Some(77)).await.expect("list").is_empty());
    }
}
