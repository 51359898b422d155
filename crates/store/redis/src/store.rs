use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;

use streamgate_store::{CacheStore, StoreError};

use crate::config::RedisConfig;

/// Redis-backed implementation of [`CacheStore`].
///
/// Values are plain Redis strings written with `SET .. PX`, so expiry is
/// handled by the server.
pub struct RedisCacheStore {
    pool: Pool,
    prefix: String,
}

impl RedisCacheStore {
    /// Create a new `RedisCacheStore` from the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] if the pool cannot be created.
    pub fn new(config: &RedisConfig) -> Result<Self, StoreError> {
        let cfg = Config::from_url(&config.url);
        let pool = cfg
            .builder()
            .map(|b| {
                b.max_size(config.pool_size)
                    .wait_timeout(Some(config.connection_timeout))
                    .runtime(Runtime::Tokio1)
                    .build()
            })
            .map_err(|e| StoreError::Connection(e.to_string()))?
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self {
            pool,
            prefix: config.prefix.clone(),
        })
    }

    fn redis_key(&self, key: &str) -> String {
        format!("{}:{key}", self.prefix)
    }

    async fn conn(&self) -> Result<deadpool_redis::Connection, StoreError> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let redis_key = self.redis_key(key);
        let mut conn = self.conn().await?;
        conn.get(&redis_key)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let redis_key = self.redis_key(key);
        // PX 0 is rejected by Redis; round sub-millisecond TTLs up.
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        let mut conn = self.conn().await?;

        let () = redis::cmd("SET")
            .arg(&redis_key)
            .arg(value)
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let redis_key = self.redis_key(key);
        let mut conn = self.conn().await?;
        let deleted: i64 = conn
            .del(&redis_key)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(deleted > 0)
    }
}


#[cfg(all(test, feature = "integration"))]
mod integration_tests {
    use super::*;

    fn test_config() -> RedisConfig {
        RedisConfig {
            url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            prefix: format!("streamgate-test-{}", std::process::id()),
            connection_timeout: Duration::from_secs(5),
            ..RedisConfig::default()
        }
    }

    #[tokio::test]
    async fn cache_conformance() {
        let store = RedisCacheStore::new(&test_config()).expect("pool creation should succeed");
        streamgate_store::testing::run_cache_conformance_tests(&store)
            .await
            .expect("conformance tests should pass");
    }

    #[tokio::test]
    async fn entry_expires_server_side() {
        let store = RedisCacheStore::new(&test_config()).expect("pool creation should succeed");
        store
            .set("expiry", "v", Duration::from_millis(50))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(store.get("expiry").await.unwrap().is_none());
    }
}
