use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;

/// Fast, expendable key-value store with per-entry time-to-live.
///
/// Keys are opaque strings; callers are responsible for namespacing them.
/// Implementations must be `Send + Sync` and safe for concurrent access.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get the value for a key. Returns `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Set a value that expires after `ttl`, overwriting any previous value.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Delete a key. Returns `true` if a live entry existed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;
}
