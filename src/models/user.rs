//! User model
//!
//! Role flags are independent booleans. Combinations such as admin+manager or
//! staff-without-admin are distinct states and are checked individually by the
//! permission engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User entity representing a registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Username (unique)
    pub username: String,
    /// Email address (unique when present)
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    /// Phone number (unique when present)
    pub phone_number: Option<String>,
    /// Password hash (argon2)
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_admin: bool,
    pub is_manager: bool,
    pub is_superuser: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new active user with every role flag cleared.
    ///
    /// The password should already be hashed, see `services::password::hash_password()`.
    pub fn new(username: String, email: Option<String>, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            username,
            email,
            first_name: String::new(),
            last_name: String::new(),
            phone_number: None,
            password_hash,
            is_active: true,
            is_staff: false,
            is_admin: false,
            is_manager: false,
            is_superuser: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Staff, admin or superuser
    pub fn is_elevated(&self) -> bool {
        self.is_staff || self.is_admin || self.is_superuser
    }

    /// Whether this user owns a record authored by `owner_id`
    pub fn owns(&self, owner_id: i64) -> bool {
        self.id == owner_id
    }
}

/// Input for creating a new user (before password hashing)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateUserInput {
    pub username: String,
    pub email: Option<String>,
    /// Plaintext password (will be hashed)
    pub password: String,
    /// Must match `password` when present
    pub password_confirm: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
}

/// Input for updating a user. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserInput {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub is_active: Option<bool>,
    pub is_staff: Option<bool>,
    pub is_admin: Option<bool>,
    pub is_manager: Option<bool>,
}

impl UpdateUserInput {
    /// Fields a full replacement (PUT) must carry
    pub fn missing_for_replace(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.username.is_none() {
            missing.push("username");
        }
        missing
    }

    /// Apply present fields onto `user`
    pub fn apply(self, user: &mut User) {
        if let Some(username) = self.username {
            user.username = username;
        }
        if let Some(email) = self.email {
            user.email = non_blank(email);
        }
        if let Some(first_name) = self.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = self.last_name {
            user.last_name = last_name;
        }
        if let Some(phone_number) = self.phone_number {
            user.phone_number = non_blank(phone_number);
        }
        if let Some(v) = self.is_active {
            user.is_active = v;
        }
        if let Some(v) = self.is_staff {
            user.is_staff = v;
        }
        if let Some(v) = self.is_admin {
            user.is_admin = v;
        }
        if let Some(v) = self.is_manager {
            user.is_manager = v;
        }
    }
}

/// Blank strings on nullable unique columns are stored as NULL.
pub(crate) fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
