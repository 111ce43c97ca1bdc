//! Tag-based cache invalidation with version tokens
//!
//! Cached entries depend on named tags. Each tag owns one version token in the
//! store; an entry stays valid only while every tag it depends on still carries
//! the token it had when the entry was written. Deleting or bumping a tag
//! invalidates every dependent entry without tracking which keys use it.
//!
//! # Architecture
//!
//! ```text
//! Write path:
//!   TaggedCache::set(key, value, ttl, dependency)
//!     -> Dependency::snapshot()        {tag -> version}, pinning unversioned tags
//!     -> store SET entry {value, snapshot}
//!
//! Read path:
//!   TaggedCache::get(key)
//!     -> store GET entry
//!     -> Dependency::is_stale(snapshot) live GET of every tag, compared by equality
//!     -> value, or miss if any tag moved
//!
//! Invalidation:
//!   Tag::delete()  -> next ensure_version() mints a different token
//!   Tag::bump()    -> a different token right away
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tagged_cache::{RedisStore, RedisStoreConfig, TaggedCache};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = RedisStore::connect(&RedisStoreConfig::from_env()?).await?;
//!     let cache = TaggedCache::new(Arc::new(store));
//!
//!     let dependency = cache.dependency(["user:123", "feed"]);
//!     cache
//!         .set("profile:123", &"cached profile", Some(Duration::from_secs(300)), Some(&dependency))
//!         .await?;
//!
//!     // Any service deleting the tag invalidates the entry
//!     cache.tag("user:123").delete().await?;
//!     assert_eq!(cache.get::<String>("profile:123").await?, None);
//!
//!     Ok(())
//! }
//! ```

mod cache;
mod config;
mod dependency;
mod error;
mod keys;
mod metrics;
mod store;
mod tag;
mod token;

pub use cache::{TaggedCache, ENTRY_PROTOCOL};
pub use config::{RedisStoreConfig, TaggedCacheConfig};
pub use dependency::{Dependency, DependencySnapshot};
pub use error::{TagCacheError, TagCacheResult};
pub use keys::{CacheKey, SCHEMA_VERSION};
pub use metrics::CacheMetrics;
pub use store::{MemoryStore, RedisStore, SharedRedis, SharedStore, VersionStore};
pub use tag::{Tag, TagContext};
pub use token::{TimestampVersionGenerator, UuidVersionGenerator, VersionGenerator};
