//! Cache facade tests: expiry, store failures and concurrent tag creation

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tagged_cache::{
    MemoryStore, TagCacheError, TagCacheResult, TaggedCache, TaggedCacheConfig,
    TimestampVersionGenerator, VersionStore,
};

/// Memory store whose reads can be switched to fail
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl VersionStore for FlakyStore {
    async fn get(&self, key: &str) -> TagCacheResult<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(TagCacheError::Store("read refused".to_string()));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> TagCacheResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(TagCacheError::Store("write refused".to_string()));
        }
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> TagCacheResult<()> {
        self.inner.delete(key).await
    }
}

fn config(fail_closed_reads: bool) -> TaggedCacheConfig {
    TaggedCacheConfig {
        fail_closed_reads,
        ..TaggedCacheConfig::default()
    }
}

#[tokio::test]
async fn test_read_failure_is_miss_when_fail_closed() {
    let store = Arc::new(FlakyStore::default());
    let cache = TaggedCache::with_config(store.clone(), config(true));

    let dependency = cache.dependency(["users"]);
    cache
        .set("profile", "cached", None, Some(&dependency))
        .await
        .unwrap();

    store.fail_reads(true);
    assert_eq!(cache.get::<String>("profile").await.unwrap(), None);

    store.fail_reads(false);
    assert_eq!(
        cache.get::<String>("profile").await.unwrap().as_deref(),
        Some("cached")
    );
}

#[tokio::test]
async fn test_read_failure_propagates_when_not_fail_closed() {
    let store = Arc::new(FlakyStore::default());
    let cache = TaggedCache::with_config(store.clone(), config(false));
    cache.set("profile", "cached", None, None).await.unwrap();

    store.fail_reads(true);
    let result = cache.get::<String>("profile").await;
    assert!(matches!(result, Err(TagCacheError::Store(_))));
}

#[tokio::test]
async fn test_tag_operations_surface_store_failures() {
    let store = Arc::new(FlakyStore::default());
    let cache = TaggedCache::with_config(store.clone(), config(true));
    let tag = cache.tag("users");

    store.fail_reads(true);
    assert!(tag.get().await.is_err());
    assert!(tag.ensure_version().await.is_err());

    let dependency = cache.dependency(["users"]);
    assert!(dependency.snapshot().await.is_err());
}

#[tokio::test]
async fn test_write_failure_propagates() {
    let store = Arc::new(FlakyStore::default());
    let cache = TaggedCache::with_config(store.clone(), config(true));

    store.fail_writes(true);
    let result = cache.set("profile", "cached", None, None).await;
    assert!(matches!(result, Err(TagCacheError::Store(_))));

    let tag = cache.tag("users");
    tag.set("v1");
    assert!(tag.save().await.is_err());

    // the staged value survives the failed save
    store.fail_writes(false);
    tag.save().await.unwrap();
    assert_eq!(tag.get().await.unwrap(), Some("v1".to_string()));
}

#[tokio::test]
async fn test_entry_expires_but_tag_does_not() {
    let cache = TaggedCache::with_config(Arc::new(MemoryStore::new()), config(true));
    let dependency = cache.dependency(["users"]);
    cache
        .set(
            "short-lived",
            "value",
            Some(Duration::from_millis(20)),
            Some(&dependency),
        )
        .await
        .unwrap();
    let version = cache.tag("users").get().await.unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(cache.get::<String>("short-lived").await.unwrap(), None);
    assert_eq!(cache.tag("users").get().await.unwrap(), version);
}

#[tokio::test]
async fn test_deleted_entry_is_miss() {
    let cache = TaggedCache::new(Arc::new(MemoryStore::new()));
    let dependency = cache.dependency(["users"]);
    cache
        .set("profile", "cached", None, Some(&dependency))
        .await
        .unwrap();

    cache.delete("profile").await.unwrap();
    assert_eq!(cache.get::<String>("profile").await.unwrap(), None);
}

#[tokio::test]
async fn test_structured_values_round_trip() {
    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Profile {
        id: u64,
        name: String,
    }

    let cache = TaggedCache::new(Arc::new(MemoryStore::new()));
    let profile = Profile {
        id: 7,
        name: "ada".to_string(),
    };
    cache
        .set("profile:7", &profile, None, Some(&cache.dependency(["user:7"])))
        .await
        .unwrap();

    assert_eq!(cache.get::<Profile>("profile:7").await.unwrap(), Some(profile));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_ensure_version_settles_on_one_version() {
    let cache = TaggedCache::new(Arc::new(MemoryStore::new()));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let tag = cache.tag("hot");
        handles.push(tokio::spawn(async move { tag.ensure_version().await }));
    }

    let mut versions = HashSet::new();
    for handle in handles {
        versions.insert(handle.await.unwrap().unwrap());
    }

    assert_eq!(versions.len(), 1, "All callers must observe the same version");
    assert_eq!(
        cache.tag("hot").get().await.unwrap().as_ref(),
        versions.iter().next()
    );
}

#[tokio::test]
async fn test_timestamp_generator_policy() {
    let cache = TaggedCache::with_generator(
        Arc::new(MemoryStore::new()),
        TaggedCacheConfig::default(),
        Arc::new(TimestampVersionGenerator),
    );
    let tag = cache.tag("users");

    let first = tag.ensure_version().await.unwrap();
    tag.delete().await.unwrap();
    let second = tag.ensure_version().await.unwrap();

    assert!(first.contains('.'));
    assert_ne!(first, second);
}
