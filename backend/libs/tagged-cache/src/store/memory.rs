use crate::{TagCacheResult, VersionStore};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn new(value: &str, ttl: Option<Duration>) -> Self {
        Self {
            value: value.to_string(),
            // a TTL past the end of `Instant` never expires
            expires_at: ttl.and_then(|ttl| Instant::now().checked_add(ttl)),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Process-local store for tests and single-instance deployments
///
/// Expired entries are dropped lazily when they are read.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, StoredValue>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Number of stored keys, including ones that expired but were not read since
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait::async_trait]
impl VersionStore for MemoryStore {
    async fn get(&self, key: &str) -> TagCacheResult<Option<String>> {
        let now = Instant::now();
        if let Some(stored) = self.entries.get(key) {
            if !stored.is_expired(now) {
                return Ok(Some(stored.value.clone()));
            }
        } else {
            return Ok(None);
        }

        self.entries.remove_if(key, |_, stored| stored.is_expired(now));
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> TagCacheResult<()> {
        self.entries
            .insert(key.to_string(), StoredValue::new(value, ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> TagCacheResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn add(&self, key: &str, value: &str) -> TagCacheResult<bool> {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired(Instant::now()) {
                    occupied.insert(StoredValue::new(value, None));
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(StoredValue::new(value, None));
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_absent_key() {
        let store = MemoryStore::new();
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryStore::new();
        store.set("k", "v", None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));

        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);

        // deleting twice is fine
        store.delete("k").await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_value_is_absent_and_dropped() {
        let store = MemoryStore::new();
        store
            .set("k", "v", Some(Duration::from_millis(10)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_unbounded_ttl_never_expires() {
        let store = MemoryStore::new();
        store.set("k", "v", Some(Duration::MAX)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_add_only_when_absent() {
        let store = MemoryStore::new();
        assert!(store.add("k", "first").await.unwrap());
        assert!(!store.add("k", "second").await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), Some("first".to_string()));
    }

    #[tokio::test]
    async fn test_add_replaces_expired_value() {
        let store = MemoryStore::new();
        store
            .set("k", "old", Some(Duration::from_millis(10)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(store.add("k", "new").await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), Some("new".to_string()));
    }
}
