use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use uuid::Uuid;

use quire_core::domain::{Comment, Post, Tag, User, slugify};
use quire_core::error::RepoError;
use quire_core::ports::{
    BaseRepository, CommentFilter, CommentRepository, PostRepository, PublishedFilter,
    TagRepository, UserRepository,
};
use quire_core::similar::rank_similar;

use super::Tables;

fn missing_reference() -> RepoError {
    RepoError::Constraint("Referenced entity does not exist".to_string())
}

fn duplicate() -> RepoError {
    RepoError::Constraint("Entity already exists".to_string())
}

/// Insert or replace a post, enforcing the author reference and the unique
/// slug.
fn store_post(tables: &mut Tables, post: &Post) -> Result<(), RepoError> {
    if !tables.users.contains_key(&post.author_id) {
        return Err(missing_reference());
    }
    let clash = tables
        .posts
        .values()
        .any(|p| p.id != post.id && p.slug == post.slug);
    if clash {
        return Err(duplicate());
    }
    tables.posts.insert(post.id, post.clone());
    Ok(())
}

/// Point `post_id` at the tags named in `names`, creating missing tags by
/// slug.
fn link_tags(tables: &mut Tables, post_id: Uuid, names: &[String]) -> Vec<Tag> {
    let mut tag_ids: Vec<Uuid> = Vec::with_capacity(names.len());
    for name in names {
        let slug = slugify(name);
        let existing = tables.tags.values().find(|t| t.slug == slug).map(|t| t.id);
        let id = match existing {
            Some(id) => id,
            None => {
                let tag = Tag::new(name.clone());
                let id = tag.id;
                tables.tags.insert(id, tag);
                id
            }
        };
        if !tag_ids.contains(&id) {
            tag_ids.push(id);
        }
    }

    tables.post_tags.retain(|(p, _)| *p != post_id);
    tables
        .post_tags
        .extend(tag_ids.iter().map(|tag_id| (post_id, *tag_id)));
    tables.tags_of(post_id)
}

/// Published posts matching `filter`, newest first.
fn published<'a>(tables: &'a Tables, filter: PublishedFilter) -> Vec<&'a Post> {
    let mut posts: Vec<&Post> = tables
        .posts
        .values()
        .filter(|post| post.is_published())
        .filter(|post| match filter.tag_id {
            Some(tag_id) => tables.post_tags.contains(&(post.id, tag_id)),
            None => true,
        })
        .collect();
    posts.sort_by_key(|post| (Reverse(post.publish), Reverse(post.created_at), post.id));
    posts
}

/// In-memory author repository.
pub struct InMemoryUserRepository {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryUserRepository {
    pub(crate) fn new(tables: Arc<RwLock<Tables>>) -> Self {
        Self { tables }
    }
}

#[async_trait]
impl BaseRepository<User, Uuid> for InMemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn save(&self, entity: User) -> Result<User, RepoError> {
        let mut tables = self.tables.write().await;
        let clash = tables
            .users
            .values()
            .any(|u| u.id != entity.id && u.username == entity.username);
        if clash {
            return Err(duplicate());
        }
        tables.users.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        tables.users.remove(&id).ok_or(RepoError::NotFound)?;

        let authored: Vec<Uuid> = tables
            .posts
            .values()
            .filter(|p| p.author_id == id)
            .map(|p| p.id)
            .collect();
        for post_id in authored {
            tables.remove_post(post_id);
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.users.get(id).cloned())
            .collect())
    }
}

/// In-memory post repository.
pub struct InMemoryPostRepository {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryPostRepository {
    pub(crate) fn new(tables: Arc<RwLock<Tables>>) -> Self {
        Self { tables }
    }
}

#[async_trait]
impl BaseRepository<Post, Uuid> for InMemoryPostRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        Ok(self.tables.read().await.posts.get(&id).cloned())
    }

    async fn save(&self, entity: Post) -> Result<Post, RepoError> {
        let mut tables = self.tables.write().await;
        store_post(&mut tables, &entity)?;
        Ok(entity)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        tables.remove_post(id).ok_or(RepoError::NotFound)?;
        Ok(())
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn count_published(&self, filter: PublishedFilter) -> Result<u64, RepoError> {
        let tables = self.tables.read().await;
        Ok(published(&tables, filter).len() as u64)
    }

    async fn published_slice(
        &self,
        filter: PublishedFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Post>, RepoError> {
        let tables = self.tables.read().await;
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(published(&tables, filter)
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn find_published(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .get(&id)
            .filter(|post| post.is_published())
            .cloned())
    }

    async fn find_published_on(
        &self,
        date: NaiveDate,
        slug: &str,
    ) -> Result<Option<Post>, RepoError> {
        let tables = self.tables.read().await;
        Ok(published(&tables, PublishedFilter::default())
            .into_iter()
            .find(|post| post.slug == slug && post.publish_date() == date)
            .cloned())
    }

    async fn similar_published(&self, post: &Post, limit: u64) -> Result<Vec<Post>, RepoError> {
        let tables = self.tables.read().await;
        let tag_ids = tables.tag_ids_of(post.id);
        if tag_ids.is_empty() {
            return Ok(Vec::new());
        }

        let candidates: Vec<(&Post, Vec<Uuid>)> = tables
            .posts
            .values()
            .map(|candidate| (candidate, tables.tag_ids_of(candidate.id)))
            .collect();
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);

        Ok(rank_similar(
            post.id,
            &tag_ids,
            candidates.iter().map(|(p, tags)| (*p, tags.as_slice())),
            limit,
        ))
    }

    async fn slug_taken_on(
        &self,
        date: NaiveDate,
        slug: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.posts.values().any(|post| {
            Some(post.id) != exclude && post.slug == slug && post.publish_date() == date
        }))
    }

    async fn slug_taken(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .values()
            .any(|post| Some(post.id) != exclude && post.slug == slug))
    }

    async fn save_with_tags(
        &self,
        post: Post,
        tag_names: &[String],
    ) -> Result<(Post, Vec<Tag>), RepoError> {
        let mut tables = self.tables.write().await;
        store_post(&mut tables, &post)?;
        let tags = link_tags(&mut tables, post.id, tag_names);
        Ok((post, tags))
    }

    async fn list_all(&self) -> Result<Vec<Post>, RepoError> {
        let tables = self.tables.read().await;
        let mut posts: Vec<Post> = tables.posts.values().cloned().collect();
        posts.sort_by_key(|post| (Reverse(post.publish), Reverse(post.created_at), post.id));
        Ok(posts)
    }
}

/// In-memory comment repository.
pub struct InMemoryCommentRepository {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryCommentRepository {
    pub(crate) fn new(tables: Arc<RwLock<Tables>>) -> Self {
        Self { tables }
    }
}

#[async_trait]
impl BaseRepository<Comment, Uuid> for InMemoryCommentRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, RepoError> {
        Ok(self.tables.read().await.comments.get(&id).cloned())
    }

    async fn save(&self, entity: Comment) -> Result<Comment, RepoError> {
        let mut tables = self.tables.write().await;
        if !tables.posts.contains_key(&entity.post_id) {
            return Err(missing_reference());
        }
        tables.comments.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        tables.comments.remove(&id).ok_or(RepoError::NotFound)?;
        Ok(())
    }
}

#[async_trait]
impl CommentRepository for InMemoryCommentRepository {
    async fn active_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>, RepoError> {
        let tables = self.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .values()
            .filter(|c| c.post_id == post_id && c.active)
            .cloned()
            .collect();
        comments.sort_by_key(|c| (c.created_at, c.id));
        Ok(comments)
    }

    async fn search(&self, filter: CommentFilter) -> Result<Vec<Comment>, RepoError> {
        let tables = self.tables.read().await;
        let needle = filter
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase);

        let mut comments: Vec<Comment> = tables
            .comments
            .values()
            .filter(|c| filter.active.is_none_or(|active| c.active == active))
            .filter(|c| filter.created.is_none_or(|w| w.contains(c.created_at)))
            .filter(|c| filter.updated.is_none_or(|w| w.contains(c.updated_at)))
            .filter(|c| match &needle {
                Some(needle) => [&c.name, &c.email, &c.body]
                    .iter()
                    .any(|field| field.to_lowercase().contains(needle.as_str())),
                None => true,
            })
            .cloned()
            .collect();
        comments.sort_by_key(|c| (c.created_at, c.id));
        Ok(comments)
    }
}

/// In-memory tag repository.
pub struct InMemoryTagRepository {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryTagRepository {
    pub(crate) fn new(tables: Arc<RwLock<Tables>>) -> Self {
        Self { tables }
    }
}

#[async_trait]
impl TagRepository for InMemoryTagRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tag>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.tags.values().find(|t| t.slug == slug).cloned())
    }

    async fn tags_for_post(&self, post_id: Uuid) -> Result<Vec<Tag>, RepoError> {
        Ok(self.tables.read().await.tags_of(post_id))
    }

    async fn tags_for_posts(
        &self,
        post_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<Tag>>, RepoError> {
        let tables = self.tables.read().await;
        Ok(post_ids
            .iter()
            .map(|id| (*id, tables.tags_of(*id)))
            .filter(|(_, tags)| !tags.is_empty())
            .collect())
    }

    async fn set_post_tags(&self, post_id: Uuid, names: &[String]) -> Result<Vec<Tag>, RepoError> {
        let mut tables = self.tables.write().await;
        if !tables.posts.contains_key(&post_id) {
            return Err(missing_reference());
        }

        let tags = link_tags(&mut tables, post_id, names);
        tracing::debug!(%post_id, count = tags.len(), "Post tags replaced");
        Ok(tags)
    }
}
