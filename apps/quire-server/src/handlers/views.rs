//! Template-facing shapes of domain objects.

use std::collections::{HashMap, HashSet};

use actix_web::HttpRequest;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use quire_core::domain::{Post, Tag};
use quire_core::forms::FieldErrors;

use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// A post as the templates see it: author name, tags and detail URL resolved.
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub body: String,
    pub publish: DateTime<Utc>,
    pub status: &'static str,
    pub author: String,
    pub tags: Vec<Tag>,
    /// Path of the detail page.
    pub url: String,
}

/// Submitted (or blank) form values plus their field errors.
#[derive(Debug, Clone, Serialize)]
pub struct FormView<T: Serialize> {
    pub values: T,
    pub errors: FieldErrors,
}

impl<T: Serialize + Default> FormView<T> {
    pub fn blank() -> Self {
        Self {
            values: T::default(),
            errors: FieldErrors::new(),
        }
    }
}

impl<T: Serialize> FormView<T> {
    pub fn bound(values: T, errors: FieldErrors) -> Self {
        Self { values, errors }
    }
}

fn detail_link(req: &HttpRequest, post: &Post, absolute: bool) -> AppResult<String> {
    let (year, month, day) = post.date_parts();
    let url = req
        .url_for(
            "post_detail",
            [
                year.to_string(),
                month.to_string(),
                day.to_string(),
                post.slug.clone(),
            ],
        )
        .map_err(|e| AppError::Internal(format!("Cannot build post URL: {e}")))?;
    Ok(if absolute {
        url.to_string()
    } else {
        url.path().to_string()
    })
}

/// Absolute URL of a post's detail page, built from the request's scheme and
/// host.
pub fn absolute_url(req: &HttpRequest, post: &Post) -> AppResult<String> {
    detail_link(req, post, true)
}

/// Resolve tags and authors for a batch of posts with two lookups.
pub async fn present(
    req: &HttpRequest,
    state: &AppState,
    posts: Vec<Post>,
) -> AppResult<Vec<PostView>> {
    if posts.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
    let mut tags = state.tags.tags_for_posts(&ids).await?;

    let author_ids: Vec<Uuid> = posts
        .iter()
        .map(|p| p.author_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let authors: HashMap<Uuid, String> = state
        .users
        .find_many(&author_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u.username))
        .collect();

    posts
        .into_iter()
        .map(|post| {
            let url = detail_link(req, &post, false)?;
            Ok(PostView {
                author: authors.get(&post.author_id).cloned().unwrap_or_default(),
                tags: tags.remove(&post.id).unwrap_or_default(),
                status: post.status.label(),
                url,
                id: post.id,
                title: post.title,
                slug: post.slug,
                body: post.body,
                publish: post.publish,
            })
        })
        .collect()
}

/// Present a single post.
pub async fn present_one(req: &HttpRequest, state: &AppState, post: Post) -> AppResult<PostView> {
    present(req, state, vec![post])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("Post vanished during rendering".to_string()))
}
