//! Data models
//!
//! This module contains the data structures used throughout the Newsroom API:
//! - Database entities (User, Category, News, Comment)
//! - Create/update inputs consumed by the services

mod category;
mod comment;
mod news;
mod user;

pub use category::{Category, CreateCategoryInput, UpdateCategoryInput};
pub use comment::{Comment, CreateCommentInput, UpdateCommentInput};
pub use news::{CreateNewsInput, News, UpdateNewsInput};
pub(crate) use user::non_blank;
pub use user::{CreateUserInput, UpdateUserInput, User};
