//! Integration tests against live PostgreSQL and Redis servers
//!
//! Run with `TEST_DB_DSN` (and `TEST_REDIS_URL` for the cache test) pointing
//! at disposable databases: `cargo test -p common -- --ignored`.

use common::{
    cache::RedisPool,
    database::{DatabaseConfig, health_check, init_pool, run_migrations},
    error::ModelError,
    repositories::{PgSnippetRepository, PgUserRepository, SnippetRepository, UserRepository},
};
use serial_test::serial;
use sqlx::PgPool;

async fn test_pool() -> PgPool {
    let database_url = std::env::var("TEST_DB_DSN").expect("TEST_DB_DSN must be set");
    let pool = init_pool(&DatabaseConfig {
        database_url,
        max_connections: 2,
    })
    .await
    .expect("connect to test database");

    assert!(health_check(&pool).await.unwrap());
    run_migrations(&pool).await.expect("run migrations");
    sqlx::query("TRUNCATE snippets, users RESTART IDENTITY")
        .execute(&pool)
        .await
        .expect("reset tables");
    pool
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_snippet_repository() {
    let repo = PgSnippetRepository::new(test_pool().await);

    let id = repo
        .insert("An old silent pond", "An old silent pond...", 7)
        .await
        .unwrap();
    assert_eq!(id, 1);

    let snippet = repo.get(id).await.unwrap();
    assert_eq!(snippet.title, "An old silent pond");
    assert_eq!((snippet.expires - snippet.created).num_days(), 7);

    assert!(matches!(repo.get(99).await, Err(ModelError::NoRecord)));
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_expired_snippets_are_hidden() {
    let pool = test_pool().await;
    let repo = PgSnippetRepository::new(pool.clone());

    let live = repo.insert("live", "still here", 1).await.unwrap();
    let expired = repo.insert("expired", "gone", 1).await.unwrap();
    sqlx::query("UPDATE snippets SET expires = NOW() - INTERVAL '1 minute' WHERE id = $1")
        .bind(expired)
        .execute(&pool)
        .await
        .unwrap();

    assert!(matches!(repo.get(expired).await, Err(ModelError::NoRecord)));
    let latest = repo.latest().await.unwrap();
    assert_eq!(latest.iter().map(|s| s.id).collect::<Vec<_>>(), vec![live]);
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_latest_returns_ten_newest() {
    let repo = PgSnippetRepository::new(test_pool().await);

    for i in 1..=12 {
        repo.insert(&format!("snippet {}", i), "content", 365)
            .await
            .unwrap();
    }

    let latest = repo.latest().await.unwrap();
    assert_eq!(latest.len(), 10);
    assert_eq!(latest.first().map(|s| s.id), Some(12));
    assert_eq!(latest.last().map(|s| s.id), Some(3));
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_user_repository() {
    let repo = PgUserRepository::new(test_pool().await);

    repo.insert("Alice Jones", "alice@example.com", "pa$$word")
        .await
        .unwrap();
    assert!(matches!(
        repo.insert("Alice Again", "alice@example.com", "other-password").await,
        Err(ModelError::DuplicateEmail)
    ));

    let id = repo.authenticate("alice@example.com", "pa$$word").await.unwrap();
    assert!(repo.exists(id).await.unwrap());
    assert!(!repo.exists(id + 1).await.unwrap());

    assert!(matches!(
        repo.authenticate("alice@example.com", "wrong").await,
        Err(ModelError::InvalidCredentials)
    ));
    assert!(matches!(
        repo.authenticate("nobody@example.com", "pa$$word").await,
        Err(ModelError::InvalidCredentials)
    ));
}

#[tokio::test]
#[ignore]
async fn test_redis_round_trip() {
    let url = std::env::var("TEST_REDIS_URL").expect("TEST_REDIS_URL must be set");
    let redis = RedisPool::connect(&url).await.unwrap();
    assert!(redis.health_check().await.unwrap());

    let key = "integration_test_key";
    redis.set_ex(key, "integration_test_value", 10).await.unwrap();
    assert_eq!(
        redis.get(key).await.unwrap().as_deref(),
        Some("integration_test_value")
    );

    redis.delete(key).await.unwrap();
    assert_eq!(redis.get(key).await.unwrap(), None);
}
