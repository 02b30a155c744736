//! PostgreSQL repository implementations.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveTime};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbConn, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set, TransactionTrait,
};
use uuid::Uuid;

use quire_core::domain::{Comment, Post, Tag, User, slugify};
use quire_core::error::RepoError;
use quire_core::ports::{
    CommentFilter, CommentRepository, PostRepository, PublishedFilter, TagRepository,
    UserRepository,
};

use super::entity::comment::{self, Entity as CommentEntity};
use super::entity::post::{self, Entity as PostEntity};
use super::entity::post_tag::{self, Entity as PostTagEntity};
use super::entity::tag::{self, Entity as TagEntity};
use super::entity::user::{self, Entity as UserEntity};
use super::postgres_base::{PostgresBaseRepository, repo_err, upsert_on_primary_key};

/// Point `post_id` at the tags named in `names`, creating missing tags by
/// slug. Returns the tags ordered by name.
async fn replace_tags<C: ConnectionTrait>(
    db: &C,
    post_id: Uuid,
    names: &[String],
) -> Result<Vec<Tag>, RepoError> {
    let mut tags = Vec::with_capacity(names.len());
    for name in names {
        let slug = slugify(name);
        let existing = TagEntity::find()
            .filter(tag::Column::Slug.eq(slug.as_str()))
            .one(db)
            .await
            .map_err(repo_err)?;

        let model = match existing {
            Some(model) => model,
            None => tag::ActiveModel {
                id: Set(Uuid::new_v4()),
                name: Set(name.clone()),
                slug: Set(slug),
            }
            .insert(db)
            .await
            .map_err(repo_err)?,
        };
        if !tags.iter().any(|tag: &Tag| tag.id == model.id) {
            tags.push(Tag::from(model));
        }
    }

    PostTagEntity::delete_many()
        .filter(post_tag::Column::PostId.eq(post_id))
        .exec(db)
        .await
        .map_err(repo_err)?;

    if !tags.is_empty() {
        let links = tags.iter().map(|tag| post_tag::ActiveModel {
            post_id: Set(post_id),
            tag_id: Set(tag.id),
        });
        PostTagEntity::insert_many(links)
            .exec(db)
            .await
            .map_err(repo_err)?;
    }

    tags.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(tags)
}

/// PostgreSQL user repository.
pub type PostgresUserRepository = PostgresBaseRepository<UserEntity>;

/// PostgreSQL post repository.
pub type PostgresPostRepository = PostgresBaseRepository<PostEntity>;

/// PostgreSQL comment repository.
pub type PostgresCommentRepository = PostgresBaseRepository<CommentEntity>;

/// Half-open `[day start, next day start)` range of a publish date, in UTC.
fn day_bounds(date: NaiveDate) -> (chrono::DateTime<chrono::Utc>, chrono::DateTime<chrono::Utc>) {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

/// The published listing, optionally narrowed to one tag.
fn published_listing(filter: PublishedFilter) -> Select<PostEntity> {
    let select = PostEntity::published();
    match filter.tag_id {
        Some(tag_id) => select
            .inner_join(PostTagEntity)
            .filter(post_tag::Column::TagId.eq(tag_id)),
        None => select,
    }
}

/// Escape `LIKE` wildcards in user input.
fn like_pattern(query: &str) -> String {
    let escaped = query
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        tracing::debug!(username, "Finding user by username");

        let result = UserEntity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(result.map(Into::into))
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let result = UserEntity::find()
            .filter(user::Column::Id.is_in(ids.iter().copied()))
            .all(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn count_published(&self, filter: PublishedFilter) -> Result<u64, RepoError> {
        published_listing(filter)
            .count(&self.db)
            .await
            .map_err(repo_err)
    }

    async fn published_slice(
        &self,
        filter: PublishedFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Post>, RepoError> {
        tracing::debug!(?filter, offset, limit, "Loading published posts");

        let result = published_listing(filter)
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn find_published(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        let result = PostEntity::published()
            .filter(post::Column::Id.eq(id))
            .one(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(result.map(Into::into))
    }

    async fn find_published_on(
        &self,
        date: NaiveDate,
        slug: &str,
    ) -> Result<Option<Post>, RepoError> {
        let (start, end) = day_bounds(date);
        tracing::debug!(%date, slug, "Finding published post by date and slug");

        let result = PostEntity::published()
            .filter(post::Column::Slug.eq(slug))
            .filter(post::Column::Publish.gte(start))
            .filter(post::Column::Publish.lt(end))
            .one(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(result.map(Into::into))
    }

    async fn similar_published(&self, post: &Post, limit: u64) -> Result<Vec<Post>, RepoError> {
        let tag_ids: Vec<Uuid> = PostTagEntity::find()
            .filter(post_tag::Column::PostId.eq(post.id))
            .all(&self.db)
            .await
            .map_err(repo_err)?
            .into_iter()
            .map(|link| link.tag_id)
            .collect();

        if tag_ids.is_empty() {
            return Ok(Vec::new());
        }

        // Built from `find()` rather than `published()` so that the shared-tag
        // count leads the ORDER BY.
        let result = PostEntity::find()
            .filter(post::is_published())
            .inner_join(PostTagEntity)
            .filter(post_tag::Column::TagId.is_in(tag_ids))
            .filter(post::Column::Id.ne(post.id))
            .column_as(
                Expr::col((PostTagEntity, post_tag::Column::TagId)).count(),
                "same_tags",
            )
            .group_by(post::Column::Id)
            .order_by(Expr::cust("same_tags"), Order::Desc)
            .order_by_desc(post::Column::Publish)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn slug_taken_on(
        &self,
        date: NaiveDate,
        slug: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, RepoError> {
        let (start, end) = day_bounds(date);
        let mut select = PostEntity::find()
            .filter(post::Column::Slug.eq(slug))
            .filter(post::Column::Publish.gte(start))
            .filter(post::Column::Publish.lt(end));
        if let Some(id) = exclude {
            select = select.filter(post::Column::Id.ne(id));
        }

        let taken = select.count(&self.db).await.map_err(repo_err)?;
        Ok(taken > 0)
    }

    async fn slug_taken(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool, RepoError> {
        let mut select = PostEntity::find().filter(post::Column::Slug.eq(slug));
        if let Some(id) = exclude {
            select = select.filter(post::Column::Id.ne(id));
        }

        let taken = select.count(&self.db).await.map_err(repo_err)?;
        Ok(taken > 0)
    }

    async fn save_with_tags(
        &self,
        post: Post,
        tag_names: &[String],
    ) -> Result<(Post, Vec<Tag>), RepoError> {
        let txn = self.db.begin().await.map_err(repo_err)?;

        let active_model: post::ActiveModel = post.into();
        let model = PostEntity::insert(active_model)
            .on_conflict(upsert_on_primary_key::<PostEntity>())
            .exec_with_returning(&txn)
            .await
            .map_err(repo_err)?;
        let tags = replace_tags(&txn, model.id, tag_names).await?;

        txn.commit().await.map_err(repo_err)?;
        Ok((model.into(), tags))
    }

    async fn list_all(&self) -> Result<Vec<Post>, RepoError> {
        let result = PostEntity::find()
            .order_by_desc(post::Column::Publish)
            .all(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn active_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>, RepoError> {
        let result = CommentEntity::find()
            .filter(comment::Column::PostId.eq(post_id))
            .filter(comment::Column::Active.eq(true))
            .order_by_asc(comment::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn search(&self, filter: CommentFilter) -> Result<Vec<Comment>, RepoError> {
        let mut select = CommentEntity::find();
        if let Some(active) = filter.active {
            select = select.filter(comment::Column::Active.eq(active));
        }
        if let Some(window) = filter.created {
            select = select
                .filter(comment::Column::CreatedAt.gte(window.start))
                .filter(comment::Column::CreatedAt.lt(window.end));
        }
        if let Some(window) = filter.updated {
            select = select
                .filter(comment::Column::UpdatedAt.gte(window.start))
                .filter(comment::Column::UpdatedAt.lt(window.end));
        }
        if let Some(query) = filter.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let pattern = like_pattern(query);
            let matches = [
                comment::Column::Name,
                comment::Column::Email,
                comment::Column::Body,
            ]
            .into_iter()
            .fold(Condition::any(), |cond, column| {
                cond.add(Expr::expr(Func::lower(Expr::col(column))).like(pattern.clone()))
            });
            select = select.filter(matches);
        }

        let result = select
            .order_by_asc(comment::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

/// PostgreSQL tag repository. Owns the `post_tags` association.
pub struct PostgresTagRepository {
    db: DbConn,
}

impl PostgresTagRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TagRepository for PostgresTagRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tag>, RepoError> {
        let result = TagEntity::find()
            .filter(tag::Column::Slug.eq(slug))
            .one(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(result.map(Into::into))
    }

    async fn tags_for_post(&self, post_id: Uuid) -> Result<Vec<Tag>, RepoError> {
        let result = TagEntity::find()
            .inner_join(PostTagEntity)
            .filter(post_tag::Column::PostId.eq(post_id))
            .order_by_asc(tag::Column::Name)
            .all(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn tags_for_posts(
        &self,
        post_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<Tag>>, RepoError> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = PostTagEntity::find()
            .filter(post_tag::Column::PostId.is_in(post_ids.iter().copied()))
            .find_also_related(TagEntity)
            .all(&self.db)
            .await
            .map_err(repo_err)?;

        let mut grouped: HashMap<Uuid, Vec<Tag>> = HashMap::new();
        for (link, tag) in rows {
            if let Some(tag) = tag {
                grouped.entry(link.post_id).or_default().push(tag.into());
            }
        }
        for tags in grouped.values_mut() {
            tags.sort_by(|a, b| a.name.cmp(&b.name));
        }

        Ok(grouped)
    }

    async fn set_post_tags(&self, post_id: Uuid, names: &[String]) -> Result<Vec<Tag>, RepoError> {
        let txn = self.db.begin().await.map_err(repo_err)?;
        let tags = replace_tags(&txn, post_id, names).await?;
        txn.commit().await.map_err(repo_err)?;
        tracing::info!(%post_id, count = tags.len(), "Post tags replaced");

        Ok(tags)
    }
}
