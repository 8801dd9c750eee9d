//! Custom error types for the common library
//!
//! `DatabaseError` covers pool setup and migrations, `ModelError` is what the
//! repositories hand back to the web layer.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Custom error type for database setup operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Errors returned by the snippet and user repositories
#[derive(Error, Debug)]
pub enum ModelError {
    /// No live record matches the lookup
    #[error("models: no matching record found")]
    NoRecord,

    /// Unknown email or wrong password
    #[error("models: invalid credentials")]
    InvalidCredentials,

    /// The email is already taken by another user
    #[error("models: duplicate email")]
    DuplicateEmail,

    /// Password hashing or hash parsing failed
    #[error("models: password hash error: {0}")]
    PasswordHash(String),

    /// Any other database failure
    #[error("models: database error: {0}")]
    Database(#[from] SqlxError),
}

/// Type alias for Result with ModelError
pub type ModelResult<T> = Result<T, ModelError>;
