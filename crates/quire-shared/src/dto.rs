//! Data Transfer Objects - request/response types for the admin API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to register a new author.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAuthorRequest {
    pub username: String,
    pub email: String,
}

/// An author's public information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// One row of the admin post listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostSummary {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    /// Author username, absent if the author row is gone.
    pub author: Option<String>,
    pub publish: DateTime<Utc>,
    /// Human-readable status label ("Draft" / "Published").
    pub status: String,
    pub tags: Vec<String>,
}

/// One row of the admin comment listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub post_id: Uuid,
    pub body: String,
    pub created: DateTime<Utc>,
    pub active: bool,
}

/// Query string of `GET /admin/comments`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentQuery {
    pub active: Option<bool>,
    pub q: Option<String>,
    /// `today`, `past_7_days`, `this_month` or `this_year`.
    pub created: Option<String>,
    /// Same choices as `created`.
    pub updated: Option<String>,
}

/// Request to activate or deactivate a comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentModeration {
    pub active: bool,
}
