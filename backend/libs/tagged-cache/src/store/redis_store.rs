use crate::{RedisStoreConfig, TagCacheError, TagCacheResult, VersionStore};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Longest expiry sent to Redis; longer TTLs are clamped to it
const MAX_TTL_SECS: u64 = i32::MAX as u64;

/// Shared Redis connection manager
pub type SharedRedis = Arc<Mutex<ConnectionManager>>;

/// Redis-backed version store
#[derive(Clone)]
pub struct RedisStore {
    redis: SharedRedis,
}

impl RedisStore {
    pub fn new(redis: SharedRedis) -> Self {
        Self { redis }
    }

    /// Open a connection manager for the configured URL
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use tagged_cache::{RedisStore, RedisStoreConfig};
    /// # #[tokio::main]
    /// # async fn main() -> anyhow::Result<()> {
    /// let store = RedisStore::connect(&RedisStoreConfig::new("redis://localhost:6379")).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(config: &RedisStoreConfig) -> TagCacheResult<Self> {
        let client = Client::open(config.redis_url.as_str())?;
        let connection = tokio::time::timeout(
            config.connect_timeout(),
            ConnectionManager::new(client),
        )
        .await
        .map_err(|_| {
            TagCacheError::Timeout(format!(
                "Redis not reachable within {}s",
                config.connect_timeout_secs
            ))
        })??;

        info!(
            connect_timeout_secs = config.connect_timeout_secs,
            "Tagged cache connected to Redis"
        );

        Ok(Self::new(Arc::new(Mutex::new(connection))))
    }

    /// Redis expiry is whole seconds; sub-second TTLs are rounded up
    fn ttl_secs(ttl: Duration) -> u64 {
        let secs = ttl.as_secs();
        let secs = if ttl.subsec_nanos() > 0 {
            secs.saturating_add(1)
        } else {
            secs.max(1)
        };
        secs.min(MAX_TTL_SECS)
    }
}

#[async_trait::async_trait]
impl VersionStore for RedisStore {
    async fn get(&self, key: &str) -> TagCacheResult<Option<String>> {
        let mut conn = self.redis.lock().await;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> TagCacheResult<()> {
        let mut conn = self.redis.lock().await;
        match ttl {
            Some(ttl) => {
                let secs = Self::ttl_secs(ttl);
                conn.set_ex::<_, _, ()>(key, value, secs).await?;
                debug!(key = %key, ttl = secs, "Redis set with expiry");
            }
            None => {
                conn.set::<_, _, ()>(key, value).await?;
                debug!(key = %key, "Redis set without expiry");
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> TagCacheResult<()> {
        let mut conn = self.redis.lock().await;
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn add(&self, key: &str, value: &str) -> TagCacheResult<bool> {
        let mut conn = self.redis.lock().await;
        let created: bool = conn.set_nx(key, value).await?;
        Ok(created)
    }
}
