use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::slug::slugify;
use crate::error::DomainError;

/// Publication state of a post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PostStatus {
    #[default]
    #[serde(rename = "DF")]
    Draft,
    #[serde(rename = "PB")]
    Published,
}

impl PostStatus {
    /// Two-letter code stored in the `status` column.
    pub fn code(self) -> &'static str {
        match self {
            PostStatus::Draft => "DF",
            PostStatus::Published => "PB",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PostStatus::Draft => "Draft",
            PostStatus::Published => "Published",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PostStatus {
    type Err = DomainError;

    /// Accepts either the stored code (`DF`, `PB`) or the label, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "df" | "draft" => Ok(PostStatus::Draft),
            "pb" | "published" => Ok(PostStatus::Published),
            other => Err(DomainError::Validation(format!(
                "Select a valid choice. {} is not one of the available choices.",
                other
            ))),
        }
    }
}

/// Post entity - a blog article.
///
/// Tags are not carried on the post; the post/tag association is managed by
/// [`TagRepository`](crate::ports::TagRepository).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub slug: String,
    pub body: String,
    pub publish: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: PostStatus,
}

impl Post {
    /// Create a new post. The slug is derived from the title.
    pub fn new(
        author_id: Uuid,
        title: String,
        body: String,
        publish: DateTime<Utc>,
        status: PostStatus,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            author_id,
            slug: slugify(&title),
            title,
            body,
            publish,
            created_at: now,
            updated_at: now,
            status,
        }
    }

    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Published
    }

    /// Calendar day the post is published on, used by detail URLs and the
    /// unique-for-date slug rule.
    pub fn publish_date(&self) -> NaiveDate {
        self.publish.date_naive()
    }

    /// `(year, month, day)` of the publish timestamp.
    pub fn date_parts(&self) -> (i32, u32, u32) {
        let date = self.publish_date();
        (date.year(), date.month(), date.day())
    }

    /// Replace the title and re-derive the slug from it.
    pub fn retitle(&mut self, title: String) {
        self.slug = slugify(&title);
        self.title = title;
    }

    /// Refresh the `updated_at` audit timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
