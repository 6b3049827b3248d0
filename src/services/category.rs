//! Category service
//!
//! Implements business logic for category management:
//! - Create, read, update, delete categories
//! - Slug generation from name, kept unique across categories
//! - Deletion cascades to the category's news and their comments

use crate::db::is_unique_violation;
use crate::db::repositories::CategoryRepository;
use crate::models::{Category, CreateCategoryInput, UpdateCategoryInput, User};
use crate::permissions::{authorize, AccessContext, Action, PermissionDenied, Resource};
use crate::services::validation::{FieldErrors, UpdateMode};
use anyhow::Context;
use std::sync::Arc;

const NAME_MAX_LEN: usize = 100;
const SLUG_TAKEN: &str = "Category with this slug already exists.";

/// Error types for category service operations
#[derive(Debug, thiserror::Error)]
pub enum CategoryServiceError {
    /// Category not found
    #[error("Category not found: {0}")]
    NotFound(i64),

    #[error(transparent)]
    PermissionDenied(#[from] PermissionDenied),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<FieldErrors> for CategoryServiceError {
    fn from(errors: FieldErrors) -> Self {
        CategoryServiceError::Validation(errors)
    }
}

/// Category service
pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
}

impl CategoryService {
    pub fn new(repo: Arc<dyn CategoryRepository>) -> Self {
        Self { repo }
    }

    /// List all categories
    pub async fn list(&self, actor: &User) -> Result<Vec<Category>, CategoryServiceError> {
        authorize(Resource::Category, &AccessContext::new(actor, Action::Read))?;
        Ok(self.repo.list().await.context("Failed to list categories")?)
    }

    /// Get a category by ID
    pub async fn retrieve(&self, actor: &User, id: i64) -> Result<Category, CategoryServiceError> {
        let category = self.get(id).await?;
        authorize(Resource::Category, &AccessContext::new(actor, Action::Read))?;
        Ok(category)
    }

    /// Create a category. The slug is derived from the name.
    ///
    /// # Errors
    /// - `PermissionDenied` unless the actor is staff, admin or superuser
    /// - `Validation` for a blank or overlong name, or a slug already in use
    pub async fn create(
        &self,
        actor: &User,
        input: CreateCategoryInput,
    ) -> Result<Category, CategoryServiceError> {
        authorize(Resource::Category, &AccessContext::new(actor, Action::Create))?;

        let slug = validate_name(&input.name)?;
        if self
            .repo
            .exists_by_slug(&slug)
            .await
            .context("Failed to check slug uniqueness")?
        {
            return Err(FieldErrors::single("slug", SLUG_TAKEN).into());
        }

        let created = self
            .repo
            .create(&Category::new(input.name, slug))
            .await
            .map_err(slug_conflict)?;

        tracing::info!("User {} created category {} ({})", actor.id, created.id, created.slug);
        Ok(created)
    }

    /// Rename a category. The slug assigned at creation is kept.
    pub async fn update(
        &self,
        actor: &User,
        id: i64,
        input: UpdateCategoryInput,
        mode: UpdateMode,
    ) -> Result<Category, CategoryServiceError> {
        let mut category = self.get(id).await?;
        authorize(Resource::Category, &AccessContext::new(actor, Action::Update))?;

        if mode == UpdateMode::Replace && input.name.is_none() {
            return Err(FieldErrors::missing(&["name"]).into());
        }

        if let Some(name) = input.name {
            validate_name(&name)?;
            category.name = name;
        }

        Ok(self
            .repo
            .update(&category)
            .await
            .context("Failed to update category")?)
    }

    /// Delete a category with its news and their comments
    pub async fn delete(&self, actor: &User, id: i64) -> Result<(), CategoryServiceError> {
        self.get(id).await?;
        authorize(Resource::Category, &AccessContext::new(actor, Action::Delete))?;

        self.repo.delete(id).await.context("Failed to delete category")?;
        tracing::info!("User {} deleted category {}", actor.id, id);
        Ok(())
    }

    async fn get(&self, id: i64) -> Result<Category, CategoryServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get category by ID")?
            .ok_or(CategoryServiceError::NotFound(id))
    }
}

/// Check a category name and return its slug
fn validate_name(name: &str) -> Result<String, FieldErrors> {
    let mut errors = FieldErrors::new();
    errors.require_non_blank("name", name);
    errors.max_length("name", name, NAME_MAX_LEN);
    errors.into_result()?;

    let slug = generate_slug(name);
    if slug.is_empty() {
        return Err(FieldErrors::single(
            "name",
            "Name must contain at least one letter or digit.",
        ));
    }
    Ok(slug)
}

/// A writer that raced past the pre-check still loses on the UNIQUE index.
fn slug_conflict(err: anyhow::Error) -> CategoryServiceError {
    if is_unique_violation(&err) {
        FieldErrors::single("slug", SLUG_TAKEN).into()
    } else {
        CategoryServiceError::InternalError(err)
    }
}

/// Generate a URL-friendly slug from a name
///
/// Lowercases, turns spaces, underscores and ASCII punctuation into hyphens,
/// keeps non-ASCII letters, collapses hyphen runs and trims them from both ends.
pub fn generate_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut prev_hyphen = true;

    for c in name.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() || (!c.is_ascii() && c.is_alphanumeric()) {
            slug.push(c);
            prev_hyphen = false;
        } else if !prev_hyphen {
            slug.push('-');
            prev_hyphen = true;
        }
    }

    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxCategoryRepository, SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};

    struct Fixture {
        service: CategoryService,
        staff: User,
        plain: User,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::new(pool.clone());
        let mut staff = User::new("staff".to_string(), None, "h".to_string());
        staff.is_staff = true;
        let staff = users.create(&staff).await.expect("staff");
        let plain = users
            .create(&User::new("plain".to_string(), None, "h".to_string()))
            .await
            .expect("plain");

        Fixture {
            service: CategoryService::new(SqlxCategoryRepository::boxed(pool)),
            staff,
            plain,
        }
    }

    #[test]
    fn test_generate_slug() {
        assert_eq!(generate_slug("Hello World"), "hello-world");
        assert_eq!(generate_slug("  Tech & Science!  "), "tech-science");
        assert_eq!(generate_slug("snake_case--name"), "snake-case-name");
        assert_eq!(generate_slug("Café Noir"), "café-noir");
        assert_eq!(generate_slug("!!!"), "");
    }

    #[tokio::test]
    async fn test_staff_creates_category_with_slug() {
        let f = setup().await;

        let created = f
            .service
            .create(&f.staff, CreateCategoryInput::new("World News"))
            .await
            .expect("create");

        assert_eq!(created.slug, "world-news");
        assert_eq!(created.name, "World News");
    }

    #[tokio::test]
    async fn test_plain_user_cannot_create() {
        let f = setup().await;

        let err = f
            .service
            .create(&f.plain, CreateCategoryInput::new("Nope"))
            .await
            .expect_err("denied");

        match err {
            CategoryServiceError::PermissionDenied(denied) => {
                assert_eq!(denied.reason, "You cannot create categories")
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(f.service.list(&f.plain).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_validation_error() {
        let f = setup().await;
        f.service
            .create(&f.staff, CreateCategoryInput::new("Sports"))
            .await
            .expect("first");

        let err = f
            .service
            .create(&f.staff, CreateCategoryInput::new("SPORTS!"))
            .await
            .expect_err("duplicate");

        assert!(matches!(err, CategoryServiceError::Validation(ref e) if e.contains("slug")));
    }

    #[tokio::test]
    async fn test_rename_keeps_slug() {
        let f = setup().await;
        let a = f
            .service
            .create(&f.staff, CreateCategoryInput::new("Alpha"))
            .await
            .expect("a");
        f.service
            .create(&f.staff, CreateCategoryInput::new("Beta"))
            .await
            .expect("b");

        let renamed = f
            .service
            .update(
                &f.staff,
                a.id,
                UpdateCategoryInput {
                    name: Some("Gamma Ray".to_string()),
                },
                UpdateMode::Replace,
            )
            .await
            .expect("rename");
        assert_eq!(renamed.name, "Gamma Ray");
        assert_eq!(renamed.slug, "alpha");

        // Taking another category's name leaves both slugs untouched
        let renamed = f
            .service
            .update(
                &f.staff,
                a.id,
                UpdateCategoryInput {
                    name: Some("Beta".to_string()),
                },
                UpdateMode::Partial,
            )
            .await
            .expect("same name as another category");
        assert_eq!(renamed.slug, "alpha");

        let err = f
            .service
            .update(
                &f.staff,
                a.id,
                UpdateCategoryInput {
                    name: Some("  ".to_string()),
                },
                UpdateMode::Partial,
            )
            .await
            .expect_err("blank name");
        assert!(matches!(err, CategoryServiceError::Validation(ref e) if e.contains("name")));
    }

    #[tokio::test]
    async fn test_not_found_before_permission() {
        let f = setup().await;

        let err = f.service.delete(&f.plain, 999).await.expect_err("missing");
        assert!(matches!(err, CategoryServiceError::NotFound(999)));
    }

    #[tokio::test]
    async fn test_plain_user_cannot_delete() {
        let f = setup().await;
        let created = f
            .service
            .create(&f.staff, CreateCategoryInput::new("Keep"))
            .await
            .expect("create");

        let err = f.service.delete(&f.plain, created.id).await.expect_err("denied");
        assert!(matches!(err, CategoryServiceError::PermissionDenied(_)));
        assert!(f.service.retrieve(&f.plain, created.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_replace_requires_name() {
        let f = setup().await;
        let created = f
            .service
            .create(&f.staff, CreateCategoryInput::new("Named"))
            .await
            .expect("create");

        let err = f
            .service
            .update(&f.staff, created.id, UpdateCategoryInput::default(), UpdateMode::Replace)
            .await
            .expect_err("missing name");
        assert!(matches!(err, CategoryServiceError::Validation(ref e) if e.contains("name")));
    }
}
