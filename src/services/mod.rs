//! Services layer - Business logic
//!
//! Services are responsible for:
//! - Implementing business rules
//! - Consulting the permission engine before any mutation
//! - Handling validation and error cases

pub mod category;
pub mod comment;
pub mod news;
pub mod password;
pub mod token;
pub mod user;
pub mod validation;

pub use category::{generate_slug, CategoryService, CategoryServiceError};
pub use comment::{CommentService, CommentServiceError};
pub use news::{NewsService, NewsServiceError};
pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenError, TokenIssuer, TokenPair, TokenType};
pub use user::{UserService, UserServiceError};
pub use validation::{FieldErrors, UpdateMode};
