//! User service
//!
//! Identity store and credential handshake:
//! - account creation with uniqueness checks (username, email, phone number)
//! - bootstrap superuser
//! - credential verification and token issuance
//! - bearer token authentication for every protected request
//! - the permission-gated `/users` surface

use crate::db::{is_unique_violation, unique_violation_column};
use crate::db::repositories::UserRepository;
use crate::models::{non_blank, CreateUserInput, UpdateUserInput, User};
use crate::permissions::{authorize, AccessContext, Action, PermissionDenied, Resource};
use crate::services::password::{hash_password, verify_password};
use crate::services::token::{TokenError, TokenIssuer, TokenPair};
use crate::services::validation::{FieldErrors, UpdateMode, NON_FIELD_ERRORS, REQUIRED};
use anyhow::Context;
use std::sync::Arc;

const USERNAME_MAX_LEN: usize = 150;
const NAME_MAX_LEN: usize = 150;
const PHONE_MAX_LEN: usize = 15;

pub const INVALID_CREDENTIALS: &str = "Username or password is invalid";
pub const INACTIVE_ACCOUNT: &str = "Your account is not active. Please contact administrator.";

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Bad credentials, inactive account, or a token that resolves to no usable user
    #[error("{0}")]
    Authentication(String),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    #[error(transparent)]
    PermissionDenied(#[from] PermissionDenied),

    #[error("User not found: {0}")]
    NotFound(i64),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<FieldErrors> for UserServiceError {
    fn from(errors: FieldErrors) -> Self {
        UserServiceError::Validation(errors)
    }
}

/// User service for accounts and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    tokens: Arc<TokenIssuer>,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepository>, tokens: Arc<TokenIssuer>) -> Self {
        Self { user_repo, tokens }
    }

    // ========================================================================
    // Identity store
    // ========================================================================

    /// Create an account with every role flag cleared.
    ///
    /// Duplicate username, email or phone number is a validation error and no
    /// record is written.
    pub async fn create_user(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        let mut errors = FieldErrors::new();

        errors.require_non_blank("username", &input.username);
        errors.max_length("username", &input.username, USERNAME_MAX_LEN);
        errors.require_non_blank("password", &input.password);
        if let Some(confirm) = &input.password_confirm {
            if *confirm != input.password {
                errors.add("password", "Passwords do not match");
            }
        }

        let email = input.email.and_then(non_blank);
        let phone_number = input.phone_number.and_then(non_blank);
        let first_name = input.first_name.unwrap_or_default();
        let last_name = input.last_name.unwrap_or_default();

        errors.max_length("first_name", &first_name, NAME_MAX_LEN);
        errors.max_length("last_name", &last_name, NAME_MAX_LEN);
        if let Some(email) = &email {
            validate_email_format(&mut errors, email);
        }
        if let Some(phone) = &phone_number {
            errors.max_length("phone_number", phone, PHONE_MAX_LEN);
        }

        self.check_unique(&mut errors, None, Some(&input.username), email.as_deref(), phone_number.as_deref())
            .await?;
        errors.into_result()?;

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;

        let mut user = User::new(input.username, email, password_hash);
        user.first_name = first_name;
        user.last_name = last_name;
        user.phone_number = phone_number;

        self.insert(&user).await
    }

    /// Create the bootstrap superuser unless the username is already taken.
    pub async fn create_superuser(
        &self,
        username: &str,
        password: &str,
        email: Option<String>,
    ) -> Result<User, UserServiceError> {
        if let Some(existing) = self
            .user_repo
            .get_by_username(username)
            .await
            .context("Failed to check username")?
        {
            tracing::debug!("Superuser '{}' already exists", username);
            return Ok(existing);
        }

        let mut errors = FieldErrors::new();
        errors.require_non_blank("username", username);
        errors.require_non_blank("password", password);
        errors.into_result()?;

        let password_hash = hash_password(password).context("Failed to hash password")?;
        let mut user = User::new(username.to_string(), email.and_then(non_blank), password_hash);
        user.is_staff = true;
        user.is_superuser = true;

        let created = self.insert(&user).await?;
        tracing::info!("Created superuser '{}'", created.username);
        Ok(created)
    }

    /// Self-service registration. Role flags always start false.
    pub async fn register(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        let user = self.create_user(input).await?;
        tracing::info!("Registered user {} ({})", user.id, user.username);
        Ok(user)
    }

    async fn insert(&self, user: &User) -> Result<User, UserServiceError> {
        match self.user_repo.create(user).await {
            Ok(created) => Ok(created),
            Err(e) if is_unique_violation(&e) => Err(unique_conflict(&e).into()),
            Err(e) => Err(e.context("Failed to create user").into()),
        }
    }

    /// Record uniqueness conflicts, ignoring the record `exclude_id` itself.
    async fn check_unique(
        &self,
        errors: &mut FieldErrors,
        exclude_id: Option<i64>,
        username: Option<&str>,
        email: Option<&str>,
        phone_number: Option<&str>,
    ) -> Result<(), UserServiceError> {
        let taken = |found: Option<User>| found.is_some_and(|u| Some(u.id) != exclude_id);

        if let Some(username) = username {
            let found = self
                .user_repo
                .get_by_username(username)
                .await
                .context("Failed to check username")?;
            if taken(found) {
                errors.add("username", "Username already exists");
            }
        }
        if let Some(email) = email {
            let found = self
                .user_repo
                .get_by_email(email)
                .await
                .context("Failed to check email")?;
            if taken(found) {
                errors.add("email", "Email already exists");
            }
        }
        if let Some(phone) = phone_number {
            let found = self
                .user_repo
                .get_by_phone_number(phone)
                .await
                .context("Failed to check phone number")?;
            if taken(found) {
                errors.add("phone_number", "Phone number already exists");
            }
        }
        Ok(())
    }

    // ========================================================================
    // Credentials
    // ========================================================================

    /// Check a username/password pair.
    ///
    /// Unknown username and wrong password produce the same error.
    pub async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<User, UserServiceError> {
        if username.is_empty() || password.is_empty() {
            let mut errors = FieldErrors::new();
            if username.is_empty() {
                errors.add("username", REQUIRED);
            }
            if password.is_empty() {
                errors.add("password", REQUIRED);
            }
            return Err(errors.into());
        }

        let user = self
            .user_repo
            .get_by_username(username)
            .await
            .context("Failed to get user by username")?
            .ok_or_else(|| UserServiceError::Authentication(INVALID_CREDENTIALS.to_string()))?;

        let valid = verify_password(password, &user.password_hash)
            .context("Failed to verify password")?;
        if !valid {
            return Err(UserServiceError::Authentication(INVALID_CREDENTIALS.to_string()));
        }

        if !user.is_active {
            return Err(UserServiceError::Authentication(INACTIVE_ACCOUNT.to_string()));
        }

        Ok(user)
    }

    /// Verify credentials and issue a token pair
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, UserServiceError> {
        let user = match self.verify_credentials(username, password).await {
            Ok(user) => user,
            Err(e) => {
                tracing::info!("Failed login for '{}': {}", username, e);
                return Err(e);
            }
        };

        let pair = self.tokens.issue_pair(&user)?;
        tracing::info!("User {} logged in", user.id);
        Ok(pair)
    }

    /// Resolve an access token to an active user
    pub async fn authenticate(&self, token: &str) -> Result<User, UserServiceError> {
        let claims = self.tokens.verify_access(token)?;
        self.active_user(claims.user_id()?).await
    }

    /// Trade a refresh token for a new access token
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, UserServiceError> {
        let claims = self.tokens.verify(refresh_token)?;
        self.active_user(claims.user_id()?).await?;
        Ok(self.tokens.refresh(refresh_token)?)
    }

    /// Check that a token of either kind is genuine and unexpired
    pub fn verify_token(&self, token: &str) -> Result<(), UserServiceError> {
        self.tokens.verify(token)?;
        Ok(())
    }

    async fn active_user(&self, id: i64) -> Result<User, UserServiceError> {
        let user = self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to load token user")?
            .ok_or_else(|| UserServiceError::Authentication("User not found".to_string()))?;

        if !user.is_active {
            return Err(UserServiceError::Authentication("User is inactive".to_string()));
        }
        Ok(user)
    }

    // ========================================================================
    // /users surface
    // ========================================================================

    fn authorize(&self, actor: &User, action: Action) -> Result<(), UserServiceError> {
        authorize(Resource::User, &AccessContext::new(actor, action))?;
        Ok(())
    }

    pub async fn list(&self, actor: &User) -> Result<Vec<User>, UserServiceError> {
        self.authorize(actor, Action::Read)?;
        Ok(self.user_repo.list().await.context("Failed to list users")?)
    }

    pub async fn retrieve(&self, actor: &User, id: i64) -> Result<User, UserServiceError> {
        self.authorize(actor, Action::Read)?;
        self.get(id).await
    }

    /// Create an account on behalf of a superuser or admin. Email is mandatory here.
    pub async fn create(&self, actor: &User, input: CreateUserInput) -> Result<User, UserServiceError> {
        self.authorize(actor, Action::Create)?;

        if input.email.as_deref().map_or(true, |e| e.trim().is_empty()) {
            return Err(FieldErrors::single("email", "Email is required").into());
        }
        if input.password_confirm.is_none() {
            return Err(FieldErrors::missing(&["password_confirm"]).into());
        }

        let user = self.create_user(input).await?;
        tracing::info!("User {} created account {}", actor.id, user.id);
        Ok(user)
    }

    pub async fn update(
        &self,
        actor: &User,
        id: i64,
        input: UpdateUserInput,
        mode: UpdateMode,
    ) -> Result<User, UserServiceError> {
        self.authorize(actor, Action::Update)?;
        let mut user = self.get(id).await?;

        if mode == UpdateMode::Replace {
            FieldErrors::missing(&input.missing_for_replace()).into_result()?;
        }

        let mut errors = FieldErrors::new();
        if let Some(username) = &input.username {
            errors.require_non_blank("username", username);
            errors.max_length("username", username, USERNAME_MAX_LEN);
        }
        if let Some(name) = &input.first_name {
            errors.max_length("first_name", name, NAME_MAX_LEN);
        }
        if let Some(name) = &input.last_name {
            errors.max_length("last_name", name, NAME_MAX_LEN);
        }
        let email = input.email.clone().and_then(non_blank);
        if let Some(email) = &email {
            validate_email_format(&mut errors, email);
        }
        let phone_number = input.phone_number.clone().and_then(non_blank);
        if let Some(phone) = &phone_number {
            errors.max_length("phone_number", phone, PHONE_MAX_LEN);
        }
        self.check_unique(
            &mut errors,
            Some(id),
            input.username.as_deref(),
            email.as_deref(),
            phone_number.as_deref(),
        )
        .await?;
        errors.into_result()?;

        input.apply(&mut user);

        match self.user_repo.update(&user).await {
            Ok(updated) => Ok(updated),
            Err(e) if is_unique_violation(&e) => Err(unique_conflict(&e).into()),
            Err(e) => Err(e.context("Failed to update user").into()),
        }
    }

    pub async fn delete(&self, actor: &User, id: i64) -> Result<(), UserServiceError> {
        self.authorize(actor, Action::Delete)?;
        self.get(id).await?;

        self.user_repo.delete(id).await.context("Failed to delete user")?;
        tracing::info!("User {} deleted account {}", actor.id, id);
        Ok(())
    }

    async fn get(&self, id: i64) -> Result<User, UserServiceError> {
        self.user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?
            .ok_or(UserServiceError::NotFound(id))
    }
}

/// Field errors for a UNIQUE failure that got past `check_unique`
fn unique_conflict(err: &anyhow::Error) -> FieldErrors {
    let (field, message) = match unique_violation_column(err).as_deref() {
        Some("users.username") => ("username", "Username already exists"),
        Some("users.email") => ("email", "Email already exists"),
        Some("users.phone_number") => ("phone_number", "Phone number already exists"),
        _ => (NON_FIELD_ERRORS, "A user with these details already exists"),
    };
    FieldErrors::single(field, message)
}

fn validate_email_format(errors: &mut FieldErrors, email: &str) {
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
    if !valid {
        errors.add("email", "Enter a valid email address.");
    }
}
