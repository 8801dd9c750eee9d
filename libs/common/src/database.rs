//! Database module for handling PostgreSQL connections and operations
//!
//! This module provides connection pooling, configuration, health checks and
//! the embedded schema migrations for the PostgreSQL database.

use crate::error::{DatabaseError, DatabaseResult};
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;
use tracing::{error, info};

/// Time allowed for acquiring a connection (and for the startup ping)
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(20);

/// Database configuration struct
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database connection URL
    pub database_url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
}

/// Initialize a PostgreSQL connection pool
///
/// The pool connects eagerly, so an unreachable server fails here rather
/// than on the first request.
pub async fn init_pool(config: &DatabaseConfig) -> DatabaseResult<PgPool> {
    info!(max_connections = config.max_connections, "Initializing database connection pool");

    let options = config
        .database_url
        .parse()
        .map_err(|e| DatabaseError::Configuration(format!("Invalid database URL: {}", e)))?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_with(options)
        .await
        .map_err(DatabaseError::Connection)?;

    Ok(pool)
}

/// Check database connectivity
pub async fn health_check(pool: &PgPool) -> DatabaseResult<bool> {
    match sqlx::query("SELECT 1").execute(pool).await {
        Ok(_) => Ok(true),
        Err(e) => {
            error!(error = %e, "Database health check failed");
            Err(DatabaseError::Query(e))
        }
    }
}

/// Apply the embedded migrations that have not run yet
pub async fn run_migrations(pool: &PgPool) -> DatabaseResult<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    info!("Database migrations applied");
    Ok(())
}
