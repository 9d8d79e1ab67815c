use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, QueryTrait};
use uuid::Uuid;

use crate::database::entity::{follow, post};
use crate::database::postgres_repo::{
    PostgresFollowRepository, PostgresPostRepository, filtered_posts, newest_first,
};
use yatube_core::domain::{Follow, Post};
use yatube_core::error::RepoError;
use yatube_core::ports::{BaseRepository, FollowRepository, PostFilter, PostRepository};

fn post_model(author_id: Uuid, text: &str, group_id: Option<Uuid>) -> post::Model {
    post::Model {
        id: Uuid::new_v4(),
        text: text.to_owned(),
        pub_date: chrono::Utc::now().into(),
        group_id,
        author_id,
        image: None,
    }
}

#[tokio::test]
async fn test_find_post_by_id() {
    let author_id = Uuid::new_v4();
    let model = post_model(author_id, "Test post", None);
    let post_id = model.id;

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![model]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    let result: Option<Post> = repo.find_by_id(post_id).await.unwrap();

    let post = result.unwrap();
    assert_eq!(post.text, "Test post");
    assert_eq!(post.id, post_id);
    assert_eq!(post.author_id, author_id);
}

#[tokio::test]
async fn test_list_maps_rows_in_query_order() {
    let author_id = Uuid::new_v4();
    let group_id = Uuid::new_v4();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![
            post_model(author_id, "newer", Some(group_id)),
            post_model(author_id, "older", Some(group_id)),
        ]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);
    let posts = repo.list(&PostFilter::Group(group_id), 0, 10).await.unwrap();

    let texts: Vec<_> = posts.iter().map(|p| p.text.as_str()).collect();
    assert_eq!(texts, vec!["newer", "older"]);
    assert!(posts.iter().all(|p| p.group_id == Some(group_id)));
}

#[test]
fn test_post_listing_breaks_pub_date_ties_by_id() {
    let sql = newest_first(filtered_posts(&PostFilter::All))
        .build(DatabaseBackend::Postgres)
        .to_string();

    assert!(
        sql.ends_with(r#"ORDER BY "posts"."pub_date" DESC, "posts"."id" DESC"#),
        "{sql}"
    );
}

#[tokio::test]
async fn test_get_or_create_returns_existing_relation() {
    let (user_id, author_id) = (Uuid::new_v4(), Uuid::new_v4());
    let existing = follow::Model {
        id: Uuid::new_v4(),
        user_id,
        author_id,
    };
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![existing.clone()]])
        .into_connection();

    let repo = PostgresFollowRepository::new(db);
    let (follow, created) = repo
        .get_or_create(Follow::between(user_id, author_id).unwrap())
        .await
        .unwrap();

    assert!(!created);
    assert_eq!(follow.id, existing.id);
}

#[tokio::test]
async fn test_delete_pair_without_rows_is_not_found() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results(vec![MockExecResult {
            last_insert_id: 0,
            rows_affected: 0,
        }])
        .into_connection();

    let repo = PostgresFollowRepository::new(db);
    let result = repo.delete_pair(Uuid::new_v4(), Uuid::new_v4()).await;

    assert!(matches!(result, Err(RepoError::NotFound)));
}
