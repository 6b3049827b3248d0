//! News model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A news item. `author_id` is stamped from the creating user and never changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct News {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category_id: i64,
    pub author_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl News {
    pub fn new(title: String, content: String, category_id: i64, author_id: i64) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            title,
            content,
            category_id,
            author_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for creating a news item. There is no author field: the author is the actor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateNewsInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(alias = "category")]
    pub category_id: Option<i64>,
}

/// Input for updating a news item
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateNewsInput {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(alias = "category")]
    pub category_id: Option<i64>,
}

impl UpdateNewsInput {
    /// Fields a full replacement (PUT) must carry
    pub fn missing_for_replace(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.title.is_none() {
            missing.push("title");
        }
        if self.content.is_none() {
            missing.push("content");
        }
        if self.category_id.is_none() {
            missing.push("category");
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_news_new() {
        let news = News::new("Title".to_string(), "Body".to_string(), 3, 9);
        assert_eq!(news.id, 0);
        assert_eq!(news.category_id, 3);
        assert_eq!(news.author_id, 9);
    }

    #[test]
    fn test_update_news_missing_for_replace() {
        let partial = UpdateNewsInput {
            title: Some("t".to_string()),
            ..Default::default()
        };
        assert_eq!(partial.missing_for_replace(), vec!["content", "category"]);
    }

    #[test]
    fn test_update_news_accepts_category_alias() {
        let input: UpdateNewsInput = serde_json::from_str(r#"{"category": 4}"#).unwrap();
        assert_eq!(input.category_id, Some(4));
    }
}
