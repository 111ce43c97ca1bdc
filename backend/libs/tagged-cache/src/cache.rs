//! Key/value cache facade with tag dependencies
//!
//! Entries are stored as JSON next to the snapshot of their dependency. A read
//! only returns the value if every recorded tag version is still live.

use crate::{
    CacheKey, CacheMetrics, Dependency, DependencySnapshot, SharedStore, Tag, TagCacheResult,
    TagContext, TaggedCacheConfig, VersionGenerator,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Entry layout version; entries with another layout are treated as misses
pub const ENTRY_PROTOCOL: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    protocol: u32,
    value: serde_json::Value,
    dependency: Option<DependencySnapshot>,
}

/// Cache client with tag-based invalidation
#[derive(Clone)]
pub struct TaggedCache {
    ctx: TagContext,
    config: TaggedCacheConfig,
}

impl TaggedCache {
    pub fn new(store: SharedStore) -> Self {
        Self::with_config(store, TaggedCacheConfig::default())
    }

    pub fn with_config(store: SharedStore, config: TaggedCacheConfig) -> Self {
        let ctx = TagContext::new(store, &config.namespace);
        Self { ctx, config }
    }

    /// Use a custom version token policy for tags created by this cache
    pub fn with_generator(
        store: SharedStore,
        config: TaggedCacheConfig,
        generator: Arc<dyn VersionGenerator>,
    ) -> Self {
        let ctx = TagContext::with_generator(store, &config.namespace, generator);
        Self { ctx, config }
    }

    pub fn context(&self) -> &TagContext {
        &self.ctx
    }

    pub fn config(&self) -> &TaggedCacheConfig {
        &self.config
    }

    fn metrics(&self) -> &CacheMetrics {
        self.ctx.metrics()
    }

    /// Handle for the named tag in this cache's namespace
    pub fn tag(&self, name: impl Into<String>) -> Tag {
        self.ctx.tag(name)
    }

    /// Dependency on the named tags
    pub fn dependency<I, S>(&self, names: I) -> Dependency
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Dependency::new(names.into_iter().map(|name| self.ctx.tag(name)).collect())
    }

    /// Add 0-N% random jitter to a TTL, N capped at 100
    fn add_jitter(&self, ttl: Duration) -> Duration {
        let max_percent = self.config.ttl_jitter_percent.min(100);
        if max_percent == 0 {
            return ttl;
        }
        let percent = rand::random::<u32>() % (max_percent + 1);
        let jitter = Duration::try_from_secs_f64(ttl.as_secs_f64() * f64::from(percent) / 100.0)
            .unwrap_or(Duration::MAX);
        ttl.saturating_add(jitter)
    }

    /// Store a value, pinning the versions of its dependency's tags first
    ///
    /// `ttl` of `None` keeps the entry until it is deleted or evicted.
    pub async fn set<T>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
        dependency: Option<&Dependency>,
    ) -> TagCacheResult<()>
    where
        T: Serialize + ?Sized,
    {
        let snapshot = match dependency {
            Some(dependency) => Some(dependency.snapshot().await?),
            None => None,
        };

        let entry = StoredEntry {
            protocol: ENTRY_PROTOCOL,
            value: serde_json::to_value(value)?,
            dependency: snapshot,
        };
        let payload = serde_json::to_string(&entry)?;
        let ttl = ttl.map(|ttl| self.add_jitter(ttl));

        let entry_key = CacheKey::entry(self.ctx.namespace(), key);
        if let Err(e) = self.ctx.store().set(&entry_key, &payload, ttl).await {
            self.metrics().record_error(&entry_key, "store");
            return Err(e);
        }

        debug!(
            key = %key,
            ttl_secs = ttl.map(|ttl| ttl.as_secs()),
            tags = entry.dependency.as_ref().map_or(0, DependencySnapshot::len),
            "Cache set"
        );
        self.metrics().record_write(&entry_key);
        Ok(())
    }

    /// Read a value; absent, stale and unreadable entries are all misses
    pub async fn get<T>(&self, key: &str) -> TagCacheResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let entry_key = CacheKey::entry(self.ctx.namespace(), key);
        match self.lookup(key, &entry_key).await {
            Ok(value) => Ok(value),
            Err(e) if self.config.fail_closed_reads => {
                warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                self.metrics().record_error(&entry_key, "store");
                self.metrics().record_miss(&entry_key);
                Ok(None)
            }
            Err(e) => {
                self.metrics().record_error(&entry_key, "store");
                Err(e)
            }
        }
    }

    async fn lookup<T>(&self, key: &str, entry_key: &str) -> TagCacheResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let metrics = self.metrics();

        let Some(raw) = self.ctx.store().get(entry_key).await? else {
            debug!(key = %key, "Cache miss");
            metrics.record_miss(entry_key);
            return Ok(None);
        };

        let entry = match serde_json::from_str::<StoredEntry>(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache entry unreadable");
                metrics.record_error(entry_key, "deserialize");
                metrics.record_miss(entry_key);
                // Delete corrupted cache entry
                let _ = self.ctx.store().delete(entry_key).await;
                return Ok(None);
            }
        };

        if entry.protocol != ENTRY_PROTOCOL {
            warn!(
                key = %key,
                protocol = entry.protocol,
                expected = ENTRY_PROTOCOL,
                "Cache entry written with another protocol"
            );
            metrics.record_stale(entry_key);
            metrics.record_miss(entry_key);
            return Ok(None);
        }

        if let Some(snapshot) = &entry.dependency {
            let dependency = Dependency::from_snapshot(&self.ctx, snapshot);
            if dependency.is_stale(snapshot).await? {
                debug!(key = %key, "Cache entry stale");
                metrics.record_stale(entry_key);
                metrics.record_miss(entry_key);
                return Ok(None);
            }
        }

        match serde_json::from_value::<T>(entry.value) {
            Ok(value) => {
                debug!(key = %key, "Cache hit");
                metrics.record_hit(entry_key);
                Ok(Some(value))
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cache value has unexpected shape");
                metrics.record_error(entry_key, "deserialize");
                metrics.record_miss(entry_key);
                Ok(None)
            }
        }
    }

    /// Remove an entry
    pub async fn delete(&self, key: &str) -> TagCacheResult<()> {
        let entry_key = CacheKey::entry(self.ctx.namespace(), key);
        self.ctx.store().delete(&entry_key).await?;
        debug!(key = %key, "Cache delete");
        Ok(())
    }

    /// Delete the named tags, invalidating every entry that depends on any of them
    pub async fn invalidate_tags<I, S>(&self, names: I) -> TagCacheResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependency(names).invalidate().await
    }
}

impl std::fmt::Debug for TaggedCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaggedCache")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
