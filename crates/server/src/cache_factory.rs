use std::sync::Arc;

use streamgate_store::CacheStore;
use streamgate_store_memory::MemoryCacheStore;
#[cfg(feature = "redis")]
use streamgate_store_redis::{RedisCacheStore, RedisConfig};

use crate::config::CacheConfig;
use crate::error::ServerError;

/// Create the catalog cache store from the given configuration.
pub fn create_cache(config: &CacheConfig) -> Result<Arc<dyn CacheStore>, ServerError> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryCacheStore::new())),
        #[cfg(feature = "redis")]
        "redis" => {
            let url = config.url.as_deref().ok_or_else(|| {
                ServerError::Config("redis cache backend requires [cache] url".into())
            })?;

            let redis_config = RedisConfig {
                url: url.to_owned(),
                prefix: config.prefix.clone(),
                pool_size: config.pool_size,
                connection_timeout: config.timeout(),
            };

            let store = RedisCacheStore::new(&redis_config)
                .map_err(|e| ServerError::Config(format!("cache redis: {e}")))?;

            Ok(Arc::new(store))
        }
        other => Err(ServerError::Config(format!(
            "unknown cache backend: {other} (is the feature enabled?)"
        ))),
    }
}
