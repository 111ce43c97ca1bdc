//! Key/value stores holding tag versions and cache entries

mod memory;
mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::{RedisStore, SharedRedis};

use crate::TagCacheResult;
use std::sync::Arc;
use std::time::Duration;

/// Shared handle to a version store
pub type SharedStore = Arc<dyn VersionStore>;

/// Key/value store contract required by tags and the cache facade
///
/// Implementations must offer read-your-writes consistency on a single key.
#[async_trait::async_trait]
pub trait VersionStore: Send + Sync {
    /// Read a value, `None` when the key is absent or expired
    async fn get(&self, key: &str) -> TagCacheResult<Option<String>>;

    /// Write a value; `None` TTL means no expiry
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> TagCacheResult<()>;

    /// Remove a key; removing an absent key succeeds
    async fn delete(&self, key: &str) -> TagCacheResult<()>;

    /// Write a value without expiry only if the key is absent
    ///
    /// Returns `true` when this call created the key. The default
    /// implementation is not atomic; stores with a native primitive override it.
    async fn add(&self, key: &str, value: &str) -> TagCacheResult<bool> {
        if self.get(key).await?.is_some() {
            return Ok(false);
        }
        self.set(key, value, None).await?;
        Ok(true)
    }
}
