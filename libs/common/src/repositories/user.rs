//! User repository for database operations

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;

use super::UserRepository;
use crate::error::{ModelError, ModelResult};
use crate::models::User;

/// Unique constraint guarding `users.email`
const EMAIL_UNIQUE_CONSTRAINT: &str = "users_uc_email";

/// User repository backed by PostgreSQL
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn insert(&self, name: &str, email: &str, password: &str) -> ModelResult<()> {
        let hashed_password = hash_password(password)?;

        let result = sqlx::query(
            r#"
            INSERT INTO users (name, email, hashed_password, created)
            VALUES ($1, $2, $3, NOW())
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(&hashed_password)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                info!("user created");
                Ok(())
            }
            Err(sqlx::Error::Database(db_err))
                if db_err.is_unique_violation()
                    && db_err.constraint() == Some(EMAIL_UNIQUE_CONSTRAINT) =>
            {
                Err(ModelError::DuplicateEmail)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn authenticate(&self, email: &str, password: &str) -> ModelResult<i64> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, hashed_password, created
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ModelError::InvalidCredentials)?;

        if verify_password(password, &user.hashed_password)? {
            Ok(user.id)
        } else {
            Err(ModelError::InvalidCredentials)
        }
    }

    async fn exists(&self, id: i64) -> ModelResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT true FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

/// Hash a plaintext password into an argon2 PHC string
pub fn hash_password(plain: &str) -> ModelResult<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ModelError::PasswordHash(e.to_string()))
}

/// Check a plaintext password against a stored hash
pub fn verify_password(plain: &str, hash: &str) -> ModelResult<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| ModelError::PasswordHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}
