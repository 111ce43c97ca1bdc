//! Tag invalidation walkthrough
//!
//! Uses Redis when REDIS_URL is set, the in-memory store otherwise.
//!
//! ```bash
//! cargo run --package tagged-cache --example tag_invalidation
//! ```

use std::sync::Arc;
use std::time::Duration;
use tagged_cache::{
    MemoryStore, RedisStore, RedisStoreConfig, SharedStore, TaggedCache, TaggedCacheConfig,
};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("tag_invalidation=info,tagged_cache=debug")
        .init();

    let store: SharedStore = match RedisStoreConfig::from_env() {
        Ok(config) => Arc::new(RedisStore::connect(&config).await?),
        Err(_) => Arc::new(MemoryStore::new()),
    };
    let cache = TaggedCache::with_config(store, TaggedCacheConfig::from_env());
    let ttl = Some(Duration::from_secs(60));

    cache
        .set("user:1:profile", "Ada", ttl, Some(&cache.dependency(["user:1"])))
        .await?;
    cache
        .set(
            "team:9:members",
            &vec!["Ada", "Grace"],
            ttl,
            Some(&cache.dependency(["user:1", "user:2", "team:9"])),
        )
        .await?;
    cache
        .set("user:2:profile", "Grace", ttl, Some(&cache.dependency(["user:2"])))
        .await?;

    info!("User 1 changed, deleting its tag");
    cache.invalidate_tags(["user:1"]).await?;

    for key in ["user:1:profile", "team:9:members", "user:2:profile"] {
        let value: Option<serde_json::Value> = cache.get(key).await?;
        info!(key, ?value, "after invalidation");
    }

    Ok(())
}
