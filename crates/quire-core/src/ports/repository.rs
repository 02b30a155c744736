use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::date_range::DateWindow;
use crate::domain::{Comment, Post, Tag, User};
use crate::error::RepoError;

/// Generic repository trait defining standard CRUD operations.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Save an entity (create or update).
    async fn save(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// Author repository.
#[async_trait]
pub trait UserRepository: BaseRepository<User, Uuid> {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;

    /// Load several users at once; unknown ids are skipped.
    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError>;
}

/// Narrows a published-post listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishedFilter {
    /// Only posts carrying this tag.
    pub tag_id: Option<Uuid>,
}

impl PublishedFilter {
    pub fn tagged(tag_id: Uuid) -> Self {
        Self {
            tag_id: Some(tag_id),
        }
    }
}

/// Post repository.
///
/// Every `*published*` method goes through the published-only scope: drafts
/// are never returned by them, and results keep the newest-publish-first order.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, Uuid> {
    async fn count_published(&self, filter: PublishedFilter) -> Result<u64, RepoError>;

    /// One window of the published listing, newest first.
    async fn published_slice(
        &self,
        filter: PublishedFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Post>, RepoError>;

    async fn find_published(&self, id: Uuid) -> Result<Option<Post>, RepoError>;

    /// Exact match on publish day and slug.
    async fn find_published_on(
        &self,
        date: NaiveDate,
        slug: &str,
    ) -> Result<Option<Post>, RepoError>;

    /// Published posts sharing at least one tag with `post`, excluding it,
    /// ordered by shared-tag count then publish date, both descending.
    async fn similar_published(&self, post: &Post, limit: u64) -> Result<Vec<Post>, RepoError>;

    /// Whether another post already uses `slug` on the given publish day.
    async fn slug_taken_on(
        &self,
        date: NaiveDate,
        slug: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, RepoError>;

    /// Whether any other post already uses `slug`.
    async fn slug_taken(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool, RepoError>;

    /// Store a post and replace its tags as one unit: either both land or
    /// neither does.
    async fn save_with_tags(
        &self,
        post: Post,
        tag_names: &[String],
    ) -> Result<(Post, Vec<Tag>), RepoError>;

    /// Every post regardless of status, newest first.
    async fn list_all(&self) -> Result<Vec<Post>, RepoError>;
}

/// Tag repository. Owns the post/tag association.
#[async_trait]
pub trait TagRepository: Send + Sync {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tag>, RepoError>;

    /// Tags of one post, ordered by name.
    async fn tags_for_post(&self, post_id: Uuid) -> Result<Vec<Tag>, RepoError>;

    /// Tags of several posts, keyed by post id. Posts without tags are absent.
    async fn tags_for_posts(&self, post_ids: &[Uuid])
    -> Result<HashMap<Uuid, Vec<Tag>>, RepoError>;

    /// Replace the tags of a post, creating missing tags by name.
    async fn set_post_tags(&self, post_id: Uuid, names: &[String]) -> Result<Vec<Tag>, RepoError>;
}

/// Admin-side comment listing filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentFilter {
    pub active: Option<bool>,
    /// Case-insensitive substring matched against name, email and body.
    pub query: Option<String>,
    pub created: Option<DateWindow>,
    pub updated: Option<DateWindow>,
}

/// Comment repository.
#[async_trait]
pub trait CommentRepository: BaseRepository<Comment, Uuid> {
    /// Active comments of a post, oldest first.
    async fn active_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>, RepoError>;

    /// Comments of every post, oldest first.
    async fn search(&self, filter: CommentFilter) -> Result<Vec<Comment>, RepoError>;
}
