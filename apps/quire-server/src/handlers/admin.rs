//! Admin JSON API - authors, post editing and comment moderation.

use std::collections::HashMap;

use actix_web::{HttpResponse, web};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use quire_core::DomainError;
use quire_core::date_range::{DateRange, DateWindow};
use quire_core::domain::{Comment, Post, Tag, User};
use quire_core::forms::{AuthorInput, FieldErrors, FormResult, PostInput};
use quire_core::ports::CommentFilter;
use quire_core::publish::{SaveMode, normalize_publish};
use quire_shared::ApiResponse;
use quire_shared::dto::{
    AuthorResponse, CommentModeration, CommentQuery, CommentSummary, CreateAuthorRequest,
    PostSummary,
};

use crate::middleware::auth::AdminIdentity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

const SLUG_EXISTS: &str = "Post with this Slug already exists.";
const SLUG_NOT_UNIQUE_FOR_DATE: &str = "Slug must be unique for Publish date.";

fn field_error(field: &str, message: &str) -> AppError {
    let mut errors = FieldErrors::new();
    errors.insert(field.to_string(), vec![message.to_string()]);
    AppError::Validation(errors)
}

/// Resolve a relative date choice from the query string. Empty means no filter.
fn date_window(
    field: &str,
    raw: Option<&str>,
    now: DateTime<Utc>,
) -> AppResult<Option<DateWindow>> {
    match raw.map(str::trim).filter(|r| !r.is_empty()) {
        None => Ok(None),
        Some(raw) => {
            let range: DateRange = raw
                .parse()
                .map_err(|DomainError::Validation(msg)| field_error(field, &msg))?;
            Ok(Some(range.window(now)))
        }
    }
}

fn parse_id(raw: &str, entity: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(format!("{} {} not found", entity, raw)))
}

fn post_summary(post: Post, author: Option<String>, tags: Vec<Tag>) -> PostSummary {
    PostSummary {
        id: post.id,
        status: post.status.label().to_string(),
        title: post.title,
        slug: post.slug,
        author,
        publish: post.publish,
        tags: tags.into_iter().map(|t| t.name).collect(),
    }
}

fn comment_summary(comment: Comment) -> CommentSummary {
    CommentSummary {
        id: comment.id,
        name: comment.name,
        email: comment.email,
        post_id: comment.post_id,
        body: comment.body,
        created: comment.created_at,
        active: comment.active,
    }
}

fn author_response(user: User) -> AuthorResponse {
    AuthorResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        created_at: user.created_at,
    }
}

/// POST /admin/authors
pub async fn create_author(
    _admin: AdminIdentity,
    state: web::Data<AppState>,
    body: web::Json<CreateAuthorRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let input = AuthorInput {
        username: req.username,
        email: req.email,
    };
    let data = match input.validate() {
        FormResult::Valid(data) => data,
        FormResult::Invalid(errors) => return Err(AppError::Validation(errors)),
    };

    if state.users.find_by_username(&data.username).await?.is_some() {
        return Err(field_error(
            "username",
            "A user with that username already exists.",
        ));
    }

    let saved = state.users.save(User::new(data.username, data.email)).await?;
    tracing::info!(author_id = %saved.id, username = %saved.username, "Author created");

    Ok(HttpResponse::Created().json(ApiResponse::ok(author_response(saved))))
}

/// GET /admin/posts
pub async fn list_posts(
    _admin: AdminIdentity,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    let posts = state.posts.list_all().await?;

    let ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
    let mut tags = state.tags.tags_for_posts(&ids).await?;

    let mut author_ids: Vec<Uuid> = posts.iter().map(|p| p.author_id).collect();
    author_ids.sort();
    author_ids.dedup();
    let authors: HashMap<Uuid, String> = state
        .users
        .find_many(&author_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u.username))
        .collect();

    let rows: Vec<PostSummary> = posts
        .into_iter()
        .map(|post| {
            let author = authors.get(&post.author_id).cloned();
            let post_tags = tags.remove(&post.id).unwrap_or_default();
            post_summary(post, author, post_tags)
        })
        .collect();

    Ok(HttpResponse::Ok().json(ApiResponse::ok(rows)))
}

/// Validate the editing form and persist the post with its tags.
///
/// `existing` is `None` for a new post. The publish timestamp goes through
/// [`normalize_publish`], so an edit that leaves date and time alone keeps
/// the stored value exactly.
async fn save_post(
    state: &AppState,
    existing: Option<Post>,
    input: PostInput,
) -> AppResult<PostSummary> {
    let data = match input.validate() {
        FormResult::Valid(data) => data,
        FormResult::Invalid(errors) => return Err(AppError::Validation(errors)),
    };

    let Some(author) = state.users.find_by_id(data.author_id).await? else {
        return Err(field_error(
            "author_id",
            "Select a valid choice. That choice is not one of the available choices.",
        ));
    };

    let now = Utc::now();
    let (mut post, mode) = match existing {
        Some(post) => {
            let stored = post.publish;
            (post, SaveMode::UpdateIfChanged { stored })
        }
        None => (
            Post::new(
                data.author_id,
                data.title.clone(),
                data.body.clone(),
                now,
                data.status,
            ),
            SaveMode::Create,
        ),
    };

    post.retitle(data.title);
    post.body = data.body;
    post.author_id = data.author_id;
    post.status = data.status;
    post.publish = normalize_publish(data.publish, mode, now);

    let mut slug_errors = Vec::new();
    if state.posts.slug_taken(&post.slug, Some(post.id)).await? {
        slug_errors.push(SLUG_EXISTS.to_string());
    }
    if state
        .posts
        .slug_taken_on(post.publish_date(), &post.slug, Some(post.id))
        .await?
    {
        slug_errors.push(SLUG_NOT_UNIQUE_FOR_DATE.to_string());
    }
    if !slug_errors.is_empty() {
        let mut errors = FieldErrors::new();
        errors.insert("slug".to_string(), slug_errors);
        return Err(AppError::Validation(errors));
    }

    post.touch();
    let (saved, tags) = state.posts.save_with_tags(post, &data.tags).await?;
    tracing::info!(post_id = %saved.id, slug = %saved.slug, status = %saved.status, "Post saved");

    Ok(post_summary(saved, Some(author.username), tags))
}

/// POST /admin/posts
pub async fn create_post(
    _admin: AdminIdentity,
    state: web::Data<AppState>,
    body: web::Json<PostInput>,
) -> AppResult<HttpResponse> {
    let summary = save_post(&state, None, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(summary)))
}

/// POST /admin/posts/{id}
pub async fn update_post(
    _admin: AdminIdentity,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<PostInput>,
) -> AppResult<HttpResponse> {
    let id = parse_id(&path, "Post")?;
    let existing = state
        .posts
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Post {} not found", id)))?;

    let summary = save_post(&state, Some(existing), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(summary)))
}

/// DELETE /admin/posts/{id}
pub async fn delete_post(
    _admin: AdminIdentity,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let id = parse_id(&path, "Post")?;
    state.posts.delete(id).await?;
    tracing::info!(post_id = %id, "Post deleted");

    Ok(HttpResponse::NoContent().finish())
}

/// GET /admin/comments?active=&q=
pub async fn list_comments(
    _admin: AdminIdentity,
    state: web::Data<AppState>,
    query: web::Query<CommentQuery>,
) -> AppResult<HttpResponse> {
    let query = query.into_inner();
    let now = Utc::now();
    let comments = state
        .comments
        .search(CommentFilter {
            active: query.active,
            query: query.q,
            created: date_window("created", query.created.as_deref(), now)?,
            updated: date_window("updated", query.updated.as_deref(), now)?,
        })
        .await?;

    let rows: Vec<CommentSummary> = comments.into_iter().map(comment_summary).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::ok(rows)))
}

/// POST /admin/comments/{id}/moderation
pub async fn moderate_comment(
    _admin: AdminIdentity,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<CommentModeration>,
) -> AppResult<HttpResponse> {
    let id = parse_id(&path, "Comment")?;
    let mut comment = state
        .comments
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Comment {} not found", id)))?;

    comment.set_active(body.active);
    let saved = state.comments.save(comment).await?;
    tracing::info!(comment_id = %saved.id, active = saved.active, "Comment moderated");

    Ok(HttpResponse::Ok().json(ApiResponse::ok(comment_summary(saved))))
}
