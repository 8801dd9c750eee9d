//! Redis client used as a key/value store with expiry
//!
//! The web service keeps its sessions here when `REDIS_URL` is configured.
//! A single multiplexed connection is opened up front and cloned per call.

use anyhow::{Context, Result};
use redis::{AsyncCommands, Client, aio::MultiplexedConnection};
use tracing::info;

/// Redis connection handle
#[derive(Clone)]
pub struct RedisPool {
    connection: MultiplexedConnection,
}

impl RedisPool {
    /// Connect to the Redis server at `url` (e.g. "redis://localhost:6379")
    pub async fn connect(url: &str) -> Result<Self> {
        let client = Client::open(url).context("invalid Redis URL")?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .context("connect to Redis")?;
        info!("Redis connection established");
        Ok(Self { connection })
    }

    /// Store `value` under `key`, expiring after `ttl_seconds`
    pub async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        let mut conn = self.connection.clone();
        let _: () = conn.set_ex(key, value, ttl_seconds).await?;
        Ok(())
    }

    /// Get a value by key
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    /// Delete a key; deleting a missing key is not an error
    pub async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        let _: u64 = conn.del(key).await?;
        Ok(())
    }

    /// Check if Redis is reachable
    pub async fn health_check(&self) -> Result<bool> {
        let mut conn = self.connection.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong == "PONG")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_rejects_malformed_url() {
        assert!(RedisPool::connect("not-a-redis-url").await.is_err());
    }
}
