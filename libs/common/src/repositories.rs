//! Repositories for database operations
//!
//! Each entity is reached through a narrow async trait so the web layer can
//! be exercised against in-memory doubles. The PostgreSQL implementations
//! live in the submodules.

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

use crate::error::ModelResult;
use crate::models::Snippet;

pub mod snippet;
pub mod user;

pub use snippet::PgSnippetRepository;
pub use user::PgUserRepository;

/// Access to stored snippets
#[async_trait]
pub trait SnippetRepository: Send + Sync {
    /// Store a snippet expiring `expires_days` days from now and return its id
    async fn insert(&self, title: &str, content: &str, expires_days: i32) -> ModelResult<i64>;

    /// Fetch a live snippet; expired or unknown ids yield `ModelError::NoRecord`
    async fn get(&self, id: i64) -> ModelResult<Snippet>;

    /// The ten most recent live snippets, newest first
    async fn latest(&self) -> ModelResult<Vec<Snippet>>;
}

/// Access to user accounts
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a user; a taken email yields `ModelError::DuplicateEmail`
    async fn insert(&self, name: &str, email: &str, password: &str) -> ModelResult<()>;

    /// Return the user id for matching credentials, else `ModelError::InvalidCredentials`
    async fn authenticate(&self, email: &str, password: &str) -> ModelResult<i64>;

    /// Whether a user with this id exists
    async fn exists(&self, id: i64) -> ModelResult<bool>;
}

/// The repositories handed to request handlers
#[derive(Clone)]
pub struct Repositories {
    pub snippet: Arc<dyn SnippetRepository>,
    pub user: Arc<dyn UserRepository>,
}

impl Repositories {
    /// PostgreSQL-backed repositories sharing one pool
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            snippet: Arc::new(PgSnippetRepository::new(pool.clone())),
            user: Arc::new(PgUserRepository::new(pool)),
        }
    }
}
