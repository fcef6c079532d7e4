//! Key/value cache with TTL, injected wherever the service needs short-lived
//! shared state (resume lookups, rate-limit counters).

use std::time::Duration;

use async_trait::async_trait;
use redis::Client as RedisClient;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Increments a counter, starting its expiry window on the first hit.
    /// Returns the value after incrementing.
    async fn increment(&self, key: &str, window: Duration) -> Result<u64, CacheError>;
}

pub struct RedisCache {
    client: RedisClient,
}

impl RedisCache {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let value = redis::cmd("GET")
            .arg(key)
            .query_async::<_, Option<String>>(&mut conn)
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn increment(&self, key: &str, window: Duration) -> Result<u64, CacheError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let count = redis::cmd("INCR")
            .arg(key)
            .query_async::<_, u64>(&mut conn)
            .await?;
        if count == 1 {
            redis::cmd("EXPIRE")
                .arg(key)
                .arg(window.as_secs().max(1))
                .query_async::<_, ()>(&mut conn)
                .await?;
        }
        Ok(count)
    }
}
