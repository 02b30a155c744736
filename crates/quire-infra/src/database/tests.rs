use std::collections::BTreeMap;

use chrono::{NaiveDate, TimeZone, Utc};
use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};
use uuid::Uuid;

use quire_core::date_range::DateRange;
use quire_core::domain::{Comment, Post, PostStatus};
use quire_core::error::RepoError;
use quire_core::ports::{
    BaseRepository, CommentFilter, CommentRepository, PostRepository, PublishedFilter,
};

use crate::database::entity::{comment, post, post_tag};
use crate::database::postgres_repo::{PostgresCommentRepository, PostgresPostRepository};

fn post_model(title: &str, slug: &str, status: post::Status) -> post::Model {
    let publish = Utc.with_ymd_and_hms(2024, 1, 2, 10, 30, 0).unwrap();
    post::Model {
        id: Uuid::new_v4(),
        author_id: Uuid::new_v4(),
        title: title.to_owned(),
        slug: slug.to_owned(),
        body: "Body".to_owned(),
        publish: publish.into(),
        created_at: publish.into(),
        updated_at: publish.into(),
        status,
    }
}

fn count_row(n: i64) -> BTreeMap<&'static str, Value> {
    BTreeMap::from([("num_items", Value::BigInt(Some(n)))])
}

#[tokio::test]
async fn test_find_published_post() {
    let model = post_model("Hello", "hello", post::Status::Published);
    let post_id = model.id;

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![model]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    let result: Option<Post> = repo.find_published(post_id).await.unwrap();

    let post = result.expect("post should be found");
    assert_eq!(post.id, post_id);
    assert_eq!(post.title, "Hello");
    assert_eq!(post.status, PostStatus::Published);
}

#[tokio::test]
async fn test_save_upserts_and_returns_stored_row() {
    let model = post_model("Draft", "draft", post::Status::Draft);
    let domain: Post = model.clone().into();

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![model.clone()]])
        .into_connection();
    let repo = PostgresPostRepository::new(db);

    let saved: Post = repo.save(domain).await.unwrap();
    assert_eq!(saved.id, model.id);
    assert_eq!(saved.status, PostStatus::Draft);

    let log = format!("{:?}", repo.db.into_transaction_log());
    assert!(log.contains("ON CONFLICT"));
}

#[tokio::test]
async fn test_delete_missing_post_is_not_found() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 0,
        }])
        .into_connection();
    let repo = PostgresPostRepository::new(db);

    let result = BaseRepository::<Post, Uuid>::delete(&repo, Uuid::new_v4()).await;
    assert!(matches!(result, Err(RepoError::NotFound)));
}

#[tokio::test]
async fn test_count_published_with_tag_joins_post_tags() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![count_row(7)]])
        .into_connection();
    let repo = PostgresPostRepository::new(db);

    let count = repo
        .count_published(PublishedFilter::tagged(Uuid::new_v4()))
        .await
        .unwrap();
    assert_eq!(count, 7);

    let log = format!("{:?}", repo.db.into_transaction_log());
    assert!(log.contains("post_tags"));
    assert!(log.contains("PB"));
}

#[tokio::test]
async fn test_slug_taken_on_counts_same_day() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![count_row(1)], vec![count_row(0)]])
        .into_connection();
    let repo = PostgresPostRepository::new(db);
    let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();

    assert!(repo.slug_taken_on(day, "hello", None).await.unwrap());
    assert!(!repo
        .slug_taken_on(day, "hello", Some(Uuid::new_v4()))
        .await
        .unwrap());
}

#[tokio::test]
async fn test_slug_taken_ignores_publish_date() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![count_row(1)]])
        .into_connection();
    let repo = PostgresPostRepository::new(db);

    assert!(repo.slug_taken("hello", Some(Uuid::new_v4())).await.unwrap());

    let log = format!("{:?}", repo.db.into_transaction_log());
    assert!(log.contains("slug"));
    assert!(!log.contains(">="));
}

#[tokio::test]
async fn test_save_with_tags_runs_in_one_transaction() {
    let model = post_model("Fresh", "fresh", post::Status::Published);
    let domain: Post = model.clone().into();

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![model.clone()]])
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 2,
        }])
        .into_connection();
    let repo = PostgresPostRepository::new(db);

    let (saved, tags) = repo.save_with_tags(domain, &[]).await.unwrap();
    assert_eq!(saved.id, model.id);
    assert!(tags.is_empty());

    let log = repo.db.into_transaction_log();
    assert_eq!(log.len(), 1);
    let statements = format!("{:?}", log[0]);
    assert!(statements.contains("ON CONFLICT"));
    assert!(statements.contains("DELETE FROM"));
    assert!(statements.contains("post_tags"));
}

#[tokio::test]
async fn test_similar_posts_without_tags_skips_ranking_query() {
    let source: Post = post_model("Lonely", "lonely", post::Status::Published).into();

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<post_tag::Model>::new()])
        .into_connection();
    let repo = PostgresPostRepository::new(db);

    let similar = repo.similar_published(&source, 4).await.unwrap();
    assert!(similar.is_empty());

    let log = repo.db.into_transaction_log();
    assert_eq!(log.len(), 1);
}

#[tokio::test]
async fn test_similar_posts_ranks_by_shared_tags() {
    let source: Post = post_model("Source", "source", post::Status::Published).into();
    let tag_id = Uuid::new_v4();
    let candidate = post_model("Candidate", "candidate", post::Status::Published);

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![post_tag::Model {
            post_id: source.id,
            tag_id,
        }]])
        .append_query_results([vec![candidate.clone()]])
        .into_connection();
    let repo = PostgresPostRepository::new(db);

    let similar = repo.similar_published(&source, 4).await.unwrap();
    assert_eq!(similar.len(), 1);
    assert_eq!(similar[0].id, candidate.id);

    let log = format!("{:?}", repo.db.into_transaction_log());
    assert!(log.contains("same_tags"));
    assert!(log.contains("GROUP BY"));
}

#[tokio::test]
async fn test_comment_search_is_case_insensitive() {
    let now = Utc::now();
    let row = comment::Model {
        id: Uuid::new_v4(),
        post_id: Uuid::new_v4(),
        name: "Ada".to_owned(),
        email: "ada@example.com".to_owned(),
        body: "Nice post".to_owned(),
        created_at: now.into(),
        updated_at: now.into(),
        active: false,
    };

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![row]])
        .into_connection();
    let repo = PostgresCommentRepository::new(db);

    let found: Vec<Comment> = repo
        .search(CommentFilter {
            active: Some(false),
            query: Some("NICE".to_owned()),
            ..CommentFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert!(!found[0].active);

    let log = format!("{:?}", repo.db.into_transaction_log());
    assert!(log.contains("LOWER"));
    assert!(log.contains("%nice%"));
}

#[tokio::test]
async fn test_comment_search_by_updated_window() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<comment::Model>::new()])
        .into_connection();
    let repo = PostgresCommentRepository::new(db);

    let now = Utc.with_ymd_and_hms(2024, 4, 15, 9, 0, 0).unwrap();
    let found = repo
        .search(CommentFilter {
            updated: Some(DateRange::Today.window(now)),
            ..CommentFilter::default()
        })
        .await
        .unwrap();
    assert!(found.is_empty());

    let log = format!("{:?}", repo.db.into_transaction_log());
    assert!(log.contains("updated_at"));
    assert!(log.contains(">="));
    assert!(log.contains("2024-04-16"));
}
