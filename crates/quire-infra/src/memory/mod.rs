//! In-memory storage - used as fallback when no database is configured.
//!
//! Mirrors the relational constraints of the SQL schema: unique usernames and
//! tag slugs, foreign keys from posts to authors and from comments to posts,
//! and cascading deletes. Data is lost on process restart.

mod repos;


use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use quire_core::domain::{Comment, Post, Tag, User};

pub use repos::{
    InMemoryCommentRepository, InMemoryPostRepository, InMemoryTagRepository,
    InMemoryUserRepository,
};

#[derive(Default)]
pub(crate) struct Tables {
    pub(crate) users: HashMap<Uuid, User>,
    pub(crate) posts: HashMap<Uuid, Post>,
    pub(crate) comments: HashMap<Uuid, Comment>,
    pub(crate) tags: HashMap<Uuid, Tag>,
    /// `(post_id, tag_id)` pairs.
    pub(crate) post_tags: Vec<(Uuid, Uuid)>,
}

impl Tables {
    pub(crate) fn tag_ids_of(&self, post_id: Uuid) -> Vec<Uuid> {
        self.post_tags
            .iter()
            .filter(|(p, _)| *p == post_id)
            .map(|(_, t)| *t)
            .collect()
    }

    pub(crate) fn tags_of(&self, post_id: Uuid) -> Vec<Tag> {
        let mut tags: Vec<Tag> = self
            .tag_ids_of(post_id)
            .into_iter()
            .filter_map(|id| self.tags.get(&id).cloned())
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        tags
    }

    /// Remove a post together with its comments and tag links.
    pub(crate) fn remove_post(&mut self, post_id: Uuid) -> Option<Post> {
        let removed = self.posts.remove(&post_id)?;
        self.comments.retain(|_, c| c.post_id != post_id);
        self.post_tags.retain(|(p, _)| *p != post_id);
        Some(removed)
    }
}

/// Shared handle over the in-memory tables.
///
/// Cloning is cheap; every repository created from the same store sees the
/// same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn users(&self) -> InMemoryUserRepository {
        InMemoryUserRepository::new(self.tables.clone())
    }

    pub fn posts(&self) -> InMemoryPostRepository {
        InMemoryPostRepository::new(self.tables.clone())
    }

    pub fn comments(&self) -> InMemoryCommentRepository {
        InMemoryCommentRepository::new(self.tables.clone())
    }

    pub fn tags(&self) -> InMemoryTagRepository {
        InMemoryTagRepository::new(self.tables.clone())
    }
}
