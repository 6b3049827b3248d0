//! Comment service
//!
//! Comments are open to everyone except managers. Editing and removing them
//! is reserved for actors carrying the admin flag, including the comment's own
//! author.

use crate::db::repositories::{CommentRepository, NewsRepository};
use crate::models::{Comment, CreateCommentInput, UpdateCommentInput, User};
use crate::permissions::{authorize, AccessContext, Action, PermissionDenied, Resource};
use crate::services::validation::{FieldErrors, UpdateMode, REQUIRED};
use anyhow::Context;
use std::sync::Arc;

/// Error types for comment service operations
#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    #[error("Comment not found: {0}")]
    NotFound(i64),

    #[error(transparent)]
    PermissionDenied(#[from] PermissionDenied),

    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<FieldErrors> for CommentServiceError {
    fn from(errors: FieldErrors) -> Self {
        CommentServiceError::Validation(errors)
    }
}

/// Comment service
pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
    news_repo: Arc<dyn NewsRepository>,
}

impl CommentService {
    pub fn new(repo: Arc<dyn CommentRepository>, news_repo: Arc<dyn NewsRepository>) -> Self {
        Self { repo, news_repo }
    }

    /// List comments, optionally only those on `news_id`
    pub async fn list(
        &self,
        actor: &User,
        news_id: Option<i64>,
    ) -> Result<Vec<Comment>, CommentServiceError> {
        authorize(Resource::Comment, &AccessContext::new(actor, Action::Read))?;
        Ok(self.repo.list(news_id).await.context("Failed to list comments")?)
    }

    pub async fn retrieve(&self, actor: &User, id: i64) -> Result<Comment, CommentServiceError> {
        let comment = self.get(id).await?;
        authorize(
            Resource::Comment,
            &AccessContext::new(actor, Action::Read).with_owner(comment.user_id),
        )?;
        Ok(comment)
    }

    /// Post a comment authored by `actor`
    pub async fn create(
        &self,
        actor: &User,
        input: CreateCommentInput,
    ) -> Result<Comment, CommentServiceError> {
        authorize(Resource::Comment, &AccessContext::new(actor, Action::Create))?;

        let mut errors = FieldErrors::new();
        errors.require_non_blank("content", &input.content);
        let news_id = match input.news_id {
            Some(id) => {
                self.check_news(&mut errors, id).await?;
                id
            }
            None => {
                errors.add("news", REQUIRED);
                0
            }
        };
        errors.into_result()?;

        let comment = Comment::new(input.content, news_id, actor.id);
        let created = self
            .repo
            .create(&comment)
            .await
            .context("Failed to create comment")?;

        tracing::debug!("User {} commented on news {}", actor.id, created.news_id);
        Ok(created)
    }

    pub async fn update(
        &self,
        actor: &User,
        id: i64,
        input: UpdateCommentInput,
        mode: UpdateMode,
    ) -> Result<Comment, CommentServiceError> {
        let mut comment = self.get(id).await?;
        authorize(
            Resource::Comment,
            &AccessContext::new(actor, Action::Update).with_owner(comment.user_id),
        )?;

        if mode == UpdateMode::Replace {
            FieldErrors::missing(&input.missing_for_replace()).into_result()?;
        }

        let mut errors = FieldErrors::new();
        if let Some(content) = &input.content {
            errors.require_non_blank("content", content);
        }
        if let Some(news_id) = input.news_id {
            self.check_news(&mut errors, news_id).await?;
        }
        errors.into_result()?;

        if let Some(content) = input.content {
            comment.content = content;
        }
        if let Some(news_id) = input.news_id {
            comment.news_id = news_id;
        }

        Ok(self
            .repo
            .update(&comment)
            .await
            .context("Failed to update comment")?)
    }

    pub async fn delete(&self, actor: &User, id: i64) -> Result<(), CommentServiceError> {
        let comment = self.get(id).await?;
        authorize(
            Resource::Comment,
            &AccessContext::new(actor, Action::Delete).with_owner(comment.user_id),
        )?;

        self.repo.delete(id).await.context("Failed to delete comment")?;
        tracing::info!("User {} deleted comment {}", actor.id, id);
        Ok(())
    }

    async fn get(&self, id: i64) -> Result<Comment, CommentServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get comment by ID")?
            .ok_or(CommentServiceError::NotFound(id))
    }

    async fn check_news(
        &self,
        errors: &mut FieldErrors,
        news_id: i64,
    ) -> Result<(), CommentServiceError> {
        let exists = self
            .news_repo
            .get_by_id(news_id)
            .await
            .context("Failed to check news")?
            .is_some();
        if !exists {
            errors.add(
                "news",
                format!("Invalid pk \"{}\" - object does not exist.", news_id),
            );
        }
        Ok(())
    }
}
