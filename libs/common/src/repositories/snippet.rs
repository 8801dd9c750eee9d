//! Snippet repository for database operations

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use super::SnippetRepository;
use crate::error::{ModelError, ModelResult};
use crate::models::Snippet;

/// Number of snippets shown on the home page
const LATEST_LIMIT: i64 = 10;

/// Snippet repository backed by PostgreSQL
#[derive(Clone)]
pub struct PgSnippetRepository {
    pool: PgPool,
}

impl PgSnippetRepository {
    /// Create a new snippet repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnippetRepository for PgSnippetRepository {
    async fn insert(&self, title: &str, content: &str, expires_days: i32) -> ModelResult<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO snippets (title, content, created, expires)
            VALUES ($1, $2, NOW(), NOW() + make_interval(days => $3))
            RETURNING id
            "#,
        )
        .bind(title)
        .bind(content)
        .bind(expires_days)
        .fetch_one(&self.pool)
        .await?;

        debug!(snippet_id = id, "snippet inserted");
        Ok(id)
    }

    async fn get(&self, id: i64) -> ModelResult<Snippet> {
        sqlx::query_as::<_, Snippet>(
            r#"
            SELECT id, title, content, created, expires
            FROM snippets
            WHERE expires > NOW() AND id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ModelError::NoRecord)
    }

    async fn latest(&self) -> ModelResult<Vec<Snippet>> {
        let snippets = sqlx::query_as::<_, Snippet>(
            r#"
            SELECT id, title, content, created, expires
            FROM snippets
            WHERE expires > NOW()
            ORDER BY id DESC
            LIMIT $1
            "#,
        )
        .bind(LATEST_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(snippets)
    }
}
