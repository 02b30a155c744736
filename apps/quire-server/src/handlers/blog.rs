//! Public blog pages.

use actix_web::{HttpRequest, HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use tera::Context;
use uuid::Uuid;

use quire_core::domain::{Comment, Post, Tag};
use quire_core::forms::{CommentInput, EmailPostInput, FieldErrors, FormResult};
use quire_core::pagination::{Paginator, resolve_per_page};
use quire_core::ports::{OutgoingMail, PublishedFilter};

use super::views::{FormView, PostView, absolute_url, present, present_one};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// Query string of the post listing. Both values arrive unparsed so that
/// malformed numbers can be corrected instead of rejected.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub per_page: Option<String>,
}

fn render(state: &AppState, template: &str, ctx: &Context) -> AppResult<HttpResponse> {
    let body = state.templates.render(template, ctx)?;
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body))
}

fn post_not_found() -> AppError {
    AppError::NotFound("No Post matches the given query.".to_string())
}

/// Post ids in paths are UUIDs; anything else cannot name a post.
fn parse_post_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| post_not_found())
}

async fn published_post(state: &AppState, raw_id: &str) -> AppResult<Post> {
    let id = parse_post_id(raw_id)?;
    state
        .posts
        .find_published(id)
        .await?
        .ok_or_else(post_not_found)
}

async fn render_list(
    req: &HttpRequest,
    state: &AppState,
    tag: Option<Tag>,
    query: &ListQuery,
) -> AppResult<HttpResponse> {
    let blog = state.blog;
    let filter = match &tag {
        Some(tag) => PublishedFilter::tagged(tag.id),
        None => PublishedFilter::default(),
    };

    let per_page = resolve_per_page(query.per_page.as_deref(), blog.page_size, blog.max_page_size);
    let count = state.posts.count_published(filter).await?;
    let paginator = Paginator::new(count, per_page, blog.orphans);
    let page = paginator.page_or_fallback(query.page.as_deref());

    let posts = if page.len == 0 {
        Vec::new()
    } else {
        state
            .posts
            .published_slice(filter, page.offset, page.len)
            .await?
    };
    tracing::debug!(page = page.number, count, "Rendering post list");

    let mut ctx = Context::new();
    ctx.insert("posts", &present(req, state, posts).await?);
    ctx.insert("page", &page);
    ctx.insert("tag", &tag);
    render(state, "blog/post/list.html", &ctx)
}

/// GET /blog
pub async fn post_list(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> AppResult<HttpResponse> {
    render_list(&req, &state, None, &query).await
}

/// GET /blog/tag/{tag}
pub async fn post_list_by_tag(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<ListQuery>,
) -> AppResult<HttpResponse> {
    let slug = path.into_inner();
    let tag = state
        .tags
        .find_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("No Tag matches the given query.".to_string()))?;

    render_list(&req, &state, Some(tag), &query).await
}

/// GET /blog/{year}/{month}/{day}/{slug}
pub async fn post_detail(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<(String, String, String, String)>,
) -> AppResult<HttpResponse> {
    let (year, month, day, slug) = path.into_inner();
    let date = match (year.parse(), month.parse(), day.parse()) {
        (Ok(y), Ok(m), Ok(d)) => NaiveDate::from_ymd_opt(y, m, d),
        _ => None,
    }
    .ok_or_else(post_not_found)?;

    let post = state
        .posts
        .find_published_on(date, &slug)
        .await?
        .ok_or_else(post_not_found)?;

    let comments = state.comments.active_for_post(post.id).await?;
    let similar = state
        .posts
        .similar_published(&post, state.blog.similar_posts)
        .await?;

    let mut ctx = Context::new();
    ctx.insert("post", &present_one(&req, &state, post).await?);
    ctx.insert("comments", &comments);
    ctx.insert("form", &FormView::<CommentInput>::blank());
    ctx.insert("similar_posts", &present(&req, &state, similar).await?);
    render(&state, "blog/post/detail.html", &ctx)
}

fn share_page(
    state: &AppState,
    post: &PostView,
    form: &FormView<EmailPostInput>,
    sent: bool,
) -> AppResult<HttpResponse> {
    let mut ctx = Context::new();
    ctx.insert("post", post);
    ctx.insert("form", form);
    ctx.insert("sent", &sent);
    render(state, "blog/post/share.html", &ctx)
}

/// GET /blog/{id}/share
pub async fn post_share_form(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let post = published_post(&state, &path).await?;
    let view = present_one(&req, &state, post).await?;
    share_page(&state, &view, &FormView::blank(), false)
}

/// POST /blog/{id}/share
pub async fn post_share(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    form: web::Form<EmailPostInput>,
) -> AppResult<HttpResponse> {
    let post = published_post(&state, &path).await?;
    let input = form.into_inner();

    let (errors, sent) = match input.validate() {
        FormResult::Valid(data) => {
            let post_url = absolute_url(&req, &post)?;
            let mail = OutgoingMail {
                subject: format!("{} recommends you read {}", data.name, post.title),
                body: format!(
                    "Read {} at {}\n\n{}'s comments: {}",
                    post.title, post_url, data.name, data.comments
                ),
                from: data.email,
                to: vec![data.to],
            };
            state.mailer.send(mail).await?;
            tracing::info!(post_id = %post.id, "Post shared by e-mail");
            (FieldErrors::new(), true)
        }
        FormResult::Invalid(errors) => (errors, false),
    };

    let view = present_one(&req, &state, post).await?;
    share_page(&state, &view, &FormView::bound(input, errors), sent)
}

/// POST /blog/{id}/comment
pub async fn post_comment(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    form: web::Form<CommentInput>,
) -> AppResult<HttpResponse> {
    let post = published_post(&state, &path).await?;
    let input = form.into_inner();

    let (errors, comment): (FieldErrors, Option<Comment>) = match input.validate() {
        FormResult::Valid(data) => {
            let comment = Comment::new(post.id, data.name, data.email, data.body);
            let saved = state.comments.save(comment).await?;
            tracing::info!(post_id = %post.id, comment_id = %saved.id, "Comment added");
            (FieldErrors::new(), Some(saved))
        }
        FormResult::Invalid(errors) => (errors, None),
    };

    let mut ctx = Context::new();
    ctx.insert("post", &present_one(&req, &state, post).await?);
    ctx.insert("form", &FormView::bound(input, errors));
    ctx.insert("comment", &comment);
    render(&state, "blog/post/comment.html", &ctx)
}

/// Any other method on a POST-only resource.
pub async fn method_not_allowed() -> AppResult<HttpResponse> {
    Err(AppError::MethodNotAllowed)
}
