use std::sync::Arc;

use actix_web::middleware::{NormalizePath, TrailingSlash};
use actix_web::{App, http::StatusCode, test, web};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{Value, json};
use uuid::Uuid;

use quire_core::domain::{Comment, Post, PostStatus, User};
use quire_core::ports::{BaseRepository, CommentFilter, CommentRepository, TagRepository};
use quire_infra::{InMemoryMailer, MemoryStore};

use super::configure_routes;
use crate::config::BlogSettings;
use crate::state::{AppState, Repositories};

const TOKEN: &str = "admin-secret";

macro_rules! blog_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .wrap(NormalizePath::new(TrailingSlash::Trim))
                .app_data(web::Data::new($state))
                .configure(configure_routes),
        )
        .await
    };
}

fn state_with(store: &MemoryStore, mailer: Arc<InMemoryMailer>, token: Option<&str>) -> AppState {
    AppState::assemble(
        Repositories::in_memory(store),
        mailer,
        BlogSettings::default(),
        token.map(str::to_string),
    )
    .unwrap()
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap()
}

async fn seed_author(store: &MemoryStore) -> User {
    store
        .users()
        .save(User::new("ada".into(), "ada@example.com".into()))
        .await
        .unwrap()
}

async fn seed_post(
    store: &MemoryStore,
    author: &User,
    title: &str,
    publish: DateTime<Utc>,
    status: PostStatus,
    tags: &[&str],
) -> Post {
    let post = store
        .posts()
        .save(Post::new(
            author.id,
            title.to_string(),
            format!("Body of {title}"),
            publish,
            status,
        ))
        .await
        .unwrap();
    let names: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
    store.tags().set_post_tags(post.id, &names).await.unwrap();
    post
}

async fn body_text(resp: actix_web::dev::ServiceResponse) -> String {
    let bytes = test::read_body(resp).await;
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[actix_web::test]
async fn test_post_list_paginates_published_posts() {
    let store = MemoryStore::new();
    let author = seed_author(&store).await;
    for i in 0..7 {
        seed_post(
            &store,
            &author,
            &format!("Post number {i}"),
            base_time() + Duration::hours(i),
            PostStatus::Published,
            &[],
        )
        .await;
    }
    seed_post(&store, &author, "Secret draft", base_time(), PostStatus::Draft, &[]).await;
    let app = blog_app!(state_with(&store, Arc::new(InMemoryMailer::new()), None));

    let resp = test::call_service(&app, test::TestRequest::get().uri("/blog").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_text(resp).await;
    assert!(html.contains("Page 1 of 2."));
    assert!(html.contains("Post number 6"));
    assert!(!html.contains("Post number 3"));
    assert!(!html.contains("Secret draft"));

    // The orphan joins the last page.
    let req = test::TestRequest::get().uri("/blog?page=2").to_request();
    let html = body_text(test::call_service(&app, req).await).await;
    assert!(html.contains("Page 2 of 2."));
    assert!(html.contains("Post number 3"));
    assert!(html.contains("Post number 0"));

    let req = test::TestRequest::get().uri("/blog?page=abc").to_request();
    let html = body_text(test::call_service(&app, req).await).await;
    assert!(html.contains("Page 1 of 2."));

    let req = test::TestRequest::get().uri("/blog?page=99").to_request();
    let html = body_text(test::call_service(&app, req).await).await;
    assert!(html.contains("Page 2 of 2."));

    let req = test::TestRequest::get().uri("/blog/?per_page=10").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_text(resp).await;
    assert!(html.contains("Page 1 of 1."));
}

#[actix_web::test]
async fn test_post_list_by_tag() {
    let store = MemoryStore::new();
    let author = seed_author(&store).await;
    seed_post(&store, &author, "Tagged", base_time(), PostStatus::Published, &["rust"]).await;
    seed_post(&store, &author, "Untagged", base_time(), PostStatus::Published, &[]).await;
    let app = blog_app!(state_with(&store, Arc::new(InMemoryMailer::new()), None));

    let req = test::TestRequest::get().uri("/blog/tag/rust").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_text(resp).await;
    assert!(html.contains("Posts tagged with"));
    assert!(html.contains("Tagged"));
    assert!(!html.contains("Untagged"));

    let req = test::TestRequest::get().uri("/blog/tag/missing").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_post_detail_requires_exact_date_and_slug() {
    let store = MemoryStore::new();
    let author = seed_author(&store).await;
    let post = seed_post(
        &store,
        &author,
        "First Post",
        base_time(),
        PostStatus::Published,
        &["rust"],
    )
    .await;
    seed_post(&store, &author, "Sibling", base_time(), PostStatus::Published, &["rust"]).await;
    seed_post(&store, &author, "Hidden", base_time(), PostStatus::Draft, &[]).await;

    let approved = Comment::new(post.id, "Bob".into(), "bob@example.com".into(), "Great".into());
    store.comments().save(approved).await.unwrap();
    let mut hidden = Comment::new(post.id, "Eve".into(), "eve@example.com".into(), "Spam".into());
    hidden.set_active(false);
    store.comments().save(hidden).await.unwrap();

    let app = blog_app!(state_with(&store, Arc::new(InMemoryMailer::new()), None));

    let req = test::TestRequest::get().uri("/blog/2024/3/5/first-post").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_text(resp).await;
    assert!(html.contains("First Post"));
    assert!(html.contains("Sibling"));
    assert!(html.contains("1 comment"));
    assert!(html.contains("Great"));
    assert!(!html.contains("Spam"));

    for uri in [
        "/blog/2024/3/6/first-post",
        "/blog/2024/3/5/hidden",
        "/blog/2024/13/40/first-post",
        "/blog/year/3/5/first-post",
    ] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[actix_web::test]
async fn test_post_detail_with_unicode_slug() {
    let store = MemoryStore::new();
    let author = seed_author(&store).await;
    let post = seed_post(&store, &author, "Café Menu", base_time(), PostStatus::Published, &[]).await;
    assert_eq!(post.slug, "café-menu");
    let app = blog_app!(state_with(&store, Arc::new(InMemoryMailer::new()), None));

    let req = test::TestRequest::get()
        .uri("/blog/2024/3/5/caf%C3%A9-menu")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("Café Menu"));
}

#[actix_web::test]
async fn test_share_sends_mail_with_absolute_url() {
    let store = MemoryStore::new();
    let author = seed_author(&store).await;
    let post = seed_post(&store, &author, "First Post", base_time(), PostStatus::Published, &[]).await;
    let mailer = Arc::new(InMemoryMailer::new());
    let app = blog_app!(state_with(&store, mailer.clone(), None));

    let uri = format!("/blog/{}/share", post.id);
    let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("by e-mail"));

    let req = test::TestRequest::post()
        .uri(&uri)
        .set_form([
            ("name", "Ada"),
            ("email", "ada@example.com"),
            ("to", "friend@example.com"),
            ("comments", "Worth it"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("E-mail successfully sent"));

    let sent = mailer.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Ada recommends you read First Post");
    assert_eq!(sent[0].from, "ada@example.com");
    assert_eq!(sent[0].to, vec!["friend@example.com".to_string()]);
    assert!(sent[0].body.starts_with("Read First Post at http"));
    assert!(sent[0].body.contains("/blog/2024/3/5/first-post"));
    assert!(sent[0].body.ends_with("Ada's comments: Worth it"));
}

#[actix_web::test]
async fn test_share_invalid_form_sends_nothing() {
    let store = MemoryStore::new();
    let author = seed_author(&store).await;
    let post = seed_post(&store, &author, "First Post", base_time(), PostStatus::Published, &[]).await;
    let draft = seed_post(&store, &author, "Draft", base_time(), PostStatus::Draft, &[]).await;
    let mailer = Arc::new(InMemoryMailer::new());
    let app = blog_app!(state_with(&store, mailer.clone(), None));

    let req = test::TestRequest::post()
        .uri(&format!("/blog/{}/share", post.id))
        .set_form([("name", "Ada"), ("email", "not-an-email"), ("to", "")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_text(resp).await;
    assert!(html.contains("Enter a valid email address."));
    assert!(html.contains("This field is required."));
    assert!(mailer.sent().await.is_empty());

    let req = test::TestRequest::get()
        .uri(&format!("/blog/{}/share", draft.id))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_share_mail_failure_is_server_error() {
    let store = MemoryStore::new();
    let author = seed_author(&store).await;
    let post = seed_post(&store, &author, "First Post", base_time(), PostStatus::Published, &[]).await;
    let app = blog_app!(state_with(&store, Arc::new(InMemoryMailer::failing()), None));

    let req = test::TestRequest::post()
        .uri(&format!("/blog/{}/share", post.id))
        .set_form([
            ("name", "Ada"),
            ("email", "ada@example.com"),
            ("to", "friend@example.com"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[actix_web::test]
async fn test_comment_is_post_only() {
    let store = MemoryStore::new();
    let author = seed_author(&store).await;
    let post = seed_post(&store, &author, "First Post", base_time(), PostStatus::Published, &[]).await;
    let app = blog_app!(state_with(&store, Arc::new(InMemoryMailer::new()), None));
    let uri = format!("/blog/{}/comment", post.id);

    let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);

    let req = test::TestRequest::post()
        .uri(&uri)
        .set_form([("name", "Bob"), ("email", "bob"), ("body", "")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("This field is required."));
    let all = store.comments().search(CommentFilter::default()).await.unwrap();
    assert!(all.is_empty());

    let req = test::TestRequest::post()
        .uri(&uri)
        .set_form([("name", "Bob"), ("email", "bob@example.com"), ("body", "Nice")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("Your comment has been added."));

    let all = store.comments().search(CommentFilter::default()).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].post_id, post.id);
    assert!(all[0].active);

    let req = test::TestRequest::post()
        .uri(&format!("/blog/{}/comment", Uuid::new_v4()))
        .set_form([("name", "Bob"), ("email", "bob@example.com"), ("body", "Nice")])
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_comment_on_draft_is_not_found() {
    let store = MemoryStore::new();
    let author = seed_author(&store).await;
    let draft = seed_post(&store, &author, "Unreleased", base_time(), PostStatus::Draft, &[]).await;
    let app = blog_app!(state_with(&store, Arc::new(InMemoryMailer::new()), None));

    let req = test::TestRequest::post()
        .uri(&format!("/blog/{}/comment", draft.id))
        .set_form([("name", "Bob"), ("email", "bob@example.com"), ("body", "Early!")])
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let all = store.comments().search(CommentFilter::default()).await.unwrap();
    assert!(all.is_empty());
}

#[actix_web::test]
async fn test_admin_requires_token() {
    let store = MemoryStore::new();

    let app = blog_app!(state_with(&store, Arc::new(InMemoryMailer::new()), None));
    let req = test::TestRequest::get()
        .uri("/admin/posts")
        .insert_header(("Authorization", "Bearer anything"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let app = blog_app!(state_with(&store, Arc::new(InMemoryMailer::new()), Some(TOKEN)));
    let req = test::TestRequest::get().uri("/admin/posts").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/admin/posts")
        .insert_header(("Authorization", "Bearer wrong"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/admin/posts")
        .insert_header(("Authorization", format!("Bearer {TOKEN}")))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_admin_post_lifecycle() {
    let store = MemoryStore::new();
    let app = blog_app!(state_with(&store, Arc::new(InMemoryMailer::new()), Some(TOKEN)));
    let auth = ("Authorization", format!("Bearer {TOKEN}"));

    let req = test::TestRequest::post()
        .uri("/admin/authors")
        .insert_header(auth.clone())
        .set_json(json!({"username": "ada", "email": "ada@example.com"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let author_id = body["data"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/admin/authors")
        .insert_header(auth.clone())
        .set_json(json!({"username": "ada", "email": "other@example.com"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let form = json!({
        "title": "Hello World",
        "body": "First!",
        "author_id": author_id,
        "status": "PB",
        "publish_0": "2024-03-05",
        "publish_1": "10:00:00",
        "tags": "rust, web",
    });
    let req = test::TestRequest::post()
        .uri("/admin/posts")
        .insert_header(auth.clone())
        .set_json(&form)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let post_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["slug"], "hello-world");
    assert_eq!(body["data"]["tags"], json!(["rust", "web"]));

    let stored = store
        .posts()
        .find_by_id(Uuid::parse_str(&post_id).unwrap())
        .await
        .unwrap()
        .unwrap();

    // Same date and time: the stored publish moment survives the edit.
    let mut edit = form.clone();
    edit["body"] = json!("Edited");
    edit["tags"] = json!("rust");
    let req = test::TestRequest::post()
        .uri(&format!("/admin/posts/{post_id}"))
        .insert_header(auth.clone())
        .set_json(&edit)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["tags"], json!(["rust"]));
    let edited = store.posts().find_by_id(stored.id).await.unwrap().unwrap();
    assert_eq!(edited.publish, stored.publish);
    assert_eq!(edited.body, "Edited");

    // Another post with the same title on the same day collides.
    let req = test::TestRequest::post()
        .uri("/admin/posts")
        .insert_header(auth.clone())
        .set_json(&form)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body["errors"]["slug"],
        json!([
            "Post with this Slug already exists.",
            "Slug must be unique for Publish date."
        ])
    );

    // Slugs are unique across days too.
    let mut next_day = form.clone();
    next_day["publish_0"] = json!("2024-03-06");
    let req = test::TestRequest::post()
        .uri("/admin/posts")
        .insert_header(auth.clone())
        .set_json(&next_day)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body["errors"]["slug"],
        json!(["Post with this Slug already exists."])
    );

    let mut other = next_day.clone();
    other["title"] = json!("Hello Again");
    let req = test::TestRequest::post()
        .uri("/admin/posts")
        .insert_header(auth.clone())
        .set_json(&other)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::get()
        .uri("/admin/posts")
        .insert_header(auth.clone())
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let req = test::TestRequest::delete()
        .uri(&format!("/admin/posts/{post_id}"))
        .insert_header(auth.clone())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::delete()
        .uri(&format!("/admin/posts/{post_id}"))
        .insert_header(auth)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_admin_rejects_invalid_post_form() {
    let store = MemoryStore::new();
    let app = blog_app!(state_with(&store, Arc::new(InMemoryMailer::new()), Some(TOKEN)));

    let req = test::TestRequest::post()
        .uri("/admin/posts")
        .insert_header(("Authorization", format!("Bearer {TOKEN}")))
        .set_json(json!({
            "title": "Orphan",
            "body": "x",
            "author_id": Uuid::new_v4().to_string(),
            "publish_0": "2024-03-05",
            "publish_1": "10:00",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["errors"]["author_id"].is_array());
}

#[actix_web::test]
async fn test_admin_comment_moderation() {
    let store = MemoryStore::new();
    let author = seed_author(&store).await;
    let post = seed_post(&store, &author, "First Post", base_time(), PostStatus::Published, &[]).await;
    let comment = store
        .comments()
        .save(Comment::new(post.id, "Bob".into(), "bob@example.com".into(), "Nice one".into()))
        .await
        .unwrap();
    let app = blog_app!(state_with(&store, Arc::new(InMemoryMailer::new()), Some(TOKEN)));
    let auth = ("Authorization", format!("Bearer {TOKEN}"));

    let req = test::TestRequest::post()
        .uri(&format!("/admin/comments/{}/moderation", comment.id))
        .insert_header(auth.clone())
        .set_json(json!({"active": false}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(store.comments().active_for_post(post.id).await.unwrap().is_empty());

    let req = test::TestRequest::get()
        .uri("/admin/comments?active=false&q=NICE")
        .insert_header(auth)
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "Bob");
}

#[actix_web::test]
async fn test_admin_comment_date_filters() {
    let store = MemoryStore::new();
    let author = seed_author(&store).await;
    let post = seed_post(&store, &author, "First Post", base_time(), PostStatus::Published, &[]).await;
    let fresh = Comment::new(post.id, "Fresh".into(), "f@example.com".into(), "New".into());
    store.comments().save(fresh).await.unwrap();
    let mut stale = Comment::new(post.id, "Stale".into(), "s@example.com".into(), "Old".into());
    stale.created_at = Utc::now() - Duration::days(400);
    stale.updated_at = Utc::now() - Duration::days(3);
    store.comments().save(stale).await.unwrap();
    let app = blog_app!(state_with(&store, Arc::new(InMemoryMailer::new()), Some(TOKEN)));
    let auth = ("Authorization", format!("Bearer {TOKEN}"));

    let names = |body: Value| -> Vec<String> {
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|row| row["name"].as_str().unwrap().to_string())
            .collect()
    };

    let req = test::TestRequest::get()
        .uri("/admin/comments?created=today")
        .insert_header(auth.clone())
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(names(body), vec!["Fresh"]);

    let req = test::TestRequest::get()
        .uri("/admin/comments?updated=past_7_days")
        .insert_header(auth.clone())
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(names(body), vec!["Stale", "Fresh"]);

    let req = test::TestRequest::get()
        .uri("/admin/comments?created=yesterday")
        .insert_header(auth)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["errors"]["created"].is_array());
}

#[actix_web::test]
async fn test_health_reports_storage() {
    let store = MemoryStore::new();
    let app = blog_app!(state_with(&store, Arc::new(InMemoryMailer::new()), None));

    let req = test::TestRequest::get().uri("/api/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "memory");
}
