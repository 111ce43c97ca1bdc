//! Tag handles over a single version slot
//!
//! A tag moves between two states in the store:
//!
//! ```text
//! UNVERSIONED --ensure_version/save/bump--> VERSIONED(v1)
//! VERSIONED(vN) --get/ensure_version--> VERSIONED(vN)
//! VERSIONED(vN) --bump--> VERSIONED(vN+1)
//! VERSIONED(vN) --delete--> UNVERSIONED
//! UNVERSIONED --ensure_version--> VERSIONED(vN+1)    (vN+1 != vN)
//! ```

use crate::{
    CacheKey, CacheMetrics, SharedStore, TagCacheError, TagCacheResult, UuidVersionGenerator,
    VersionGenerator,
};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Rounds of read/create before `ensure_version` gives up under contention
const MAX_PIN_ATTEMPTS: usize = 3;

/// Store, token policy and namespace shared by every tag handle
#[derive(Clone)]
pub struct TagContext {
    store: SharedStore,
    generator: Arc<dyn VersionGenerator>,
    namespace: Arc<str>,
    metrics: CacheMetrics,
}

impl TagContext {
    pub fn new(store: SharedStore, namespace: &str) -> Self {
        Self::with_generator(store, namespace, Arc::new(UuidVersionGenerator))
    }

    pub fn with_generator(
        store: SharedStore,
        namespace: &str,
        generator: Arc<dyn VersionGenerator>,
    ) -> Self {
        Self {
            store,
            generator,
            namespace: Arc::from(namespace),
            metrics: CacheMetrics::new(),
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// Create a handle for the named tag
    pub fn tag(&self, name: impl Into<String>) -> Tag {
        Tag::new(name, self)
    }
}

impl fmt::Debug for TagContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagContext")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
struct TagState {
    /// Last version read from or written to the store
    cached: Option<String>,
    /// Value set but not yet saved
    staged: Option<String>,
    /// Last version known to have been deleted
    retired: Option<String>,
}

/// Handle on one tag's version slot
///
/// Handles are cheap and hold no store resources; clones share the same
/// in-process memo. The store is always authoritative.
#[derive(Clone)]
pub struct Tag {
    name: String,
    key: String,
    ctx: TagContext,
    state: Arc<Mutex<TagState>>,
}

impl Tag {
    pub fn new(name: impl Into<String>, ctx: &TagContext) -> Self {
        let name = name.into();
        let key = CacheKey::tag(ctx.namespace(), &name);
        Self {
            name,
            key,
            ctx: ctx.clone(),
            state: Arc::new(Mutex::new(TagState::default())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store key of the version slot
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Last version this handle observed; not authoritative
    pub fn cached_version(&self) -> Option<String> {
        self.state().cached.clone()
    }

    fn state(&self) -> MutexGuard<'_, TagState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn observe(&self, version: Option<&str>) {
        let mut state = self.state();
        match version {
            Some(v) => state.cached = Some(v.to_string()),
            None => {
                if let Some(previous) = state.cached.take() {
                    state.retired = Some(previous);
                }
            }
        }
    }

    /// Mint a token that differs from every version this handle has seen
    fn mint(&self) -> String {
        let mut candidate = self.ctx.generator.generate();
        let state = self.state();
        while state.retired.as_deref() == Some(candidate.as_str())
            || state.cached.as_deref() == Some(candidate.as_str())
        {
            candidate.push('+');
        }
        candidate
    }

    /// Current version, `None` if the tag was never versioned or was deleted
    pub async fn get(&self) -> TagCacheResult<Option<String>> {
        let version = self.ctx.store.get(&self.key).await?;
        self.observe(version.as_deref());
        Ok(version)
    }

    /// Return the live version, creating one without expiry if there is none
    ///
    /// Concurrent callers on an unversioned tag all end up with the version
    /// that reached the store first.
    pub async fn ensure_version(&self) -> TagCacheResult<String> {
        for attempt in 1..=MAX_PIN_ATTEMPTS {
            if let Some(version) = self.get().await? {
                return Ok(version);
            }

            let candidate = self.mint();
            if self.ctx.store.add(&self.key, &candidate).await? {
                self.observe(Some(&candidate));
                self.ctx.metrics.record_tag_minted(&self.key);
                debug!(tag = %self.name, version = %candidate, "Tag version created");
                return Ok(candidate);
            }

            debug!(tag = %self.name, attempt, "Tag version created concurrently, re-reading");
        }

        Err(TagCacheError::VersionContention(self.name.clone()))
    }

    /// Stage an explicit version; persisted by [`Tag::save`]
    pub fn set(&self, version: impl Into<String>) -> &Self {
        self.state().staged = Some(version.into());
        self
    }

    /// Persist the staged version without expiry; no-op when nothing is staged
    pub async fn save(&self) -> TagCacheResult<()> {
        let staged = self.state().staged.take();
        let Some(version) = staged else {
            return Ok(());
        };

        if let Err(e) = self.ctx.store.set(&self.key, &version, None).await {
            // keep it staged so a retry can save it
            let mut state = self.state();
            if state.staged.is_none() {
                state.staged = Some(version);
            }
            return Err(e);
        }

        debug!(tag = %self.name, version = %version, "Tag version saved");
        self.observe(Some(&version));
        Ok(())
    }

    /// Replace the live version with a fresh one
    ///
    /// Invalidates every entry that depends on this tag while leaving it versioned.
    pub async fn bump(&self) -> TagCacheResult<String> {
        self.get().await?;
        let version = self.mint();
        self.ctx.store.set(&self.key, &version, None).await?;

        {
            let mut state = self.state();
            state.retired = state.cached.take();
            state.cached = Some(version.clone());
        }
        self.ctx.metrics.record_tag_minted(&self.key);
        debug!(tag = %self.name, version = %version, "Tag version bumped");
        Ok(version)
    }

    /// Remove the version slot, invalidating every dependent entry
    pub async fn delete(&self) -> TagCacheResult<()> {
        self.ctx.store.delete(&self.key).await?;
        self.observe(None);
        self.ctx.metrics.record_tag_delete(&self.key);
        debug!(tag = %self.name, "Tag deleted");
        Ok(())
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tag")
            .field("name", &self.name)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
