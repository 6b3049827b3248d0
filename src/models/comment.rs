//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A comment on a news item. `user_id` is the author and never changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: i64,
    pub content: String,
    pub news_id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(content: String, news_id: i64, user_id: i64) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            content,
            news_id,
            user_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for creating a comment
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCommentInput {
    #[serde(default)]
    pub content: String,
    #[serde(alias = "news")]
    pub news_id: Option<i64>,
}

/// Input for updating a comment
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCommentInput {
    pub content: Option<String>,
    #[serde(alias = "news")]
    pub news_id: Option<i64>,
}

impl UpdateCommentInput {
    /// Fields a full replacement (PUT) must carry
    pub fn missing_for_replace(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.content.is_none() {
            missing.push("content");
        }
        if self.news_id.is_none() {
            missing.push("news");
        }
        missing
    }
}
