//! Tag dependencies of cache entries
//!
//! A dependency pins every tag's version when an entry is written
//! ([`Dependency::snapshot`]) and later checks those versions against the live
//! ones ([`Dependency::is_stale`]).

use crate::{Tag, TagCacheResult, TagContext};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Tag name to version mapping stored next to an entry's payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencySnapshot(BTreeMap<String, String>);

impl DependencySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: impl Into<String>, version: impl Into<String>) {
        self.0.insert(tag.into(), version.into());
    }

    pub fn version(&self, tag: &str) -> Option<&str> {
        self.0.get(tag).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(t, v)| (t.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for DependencySnapshot {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Set of tags a cache entry depends on
///
/// An empty dependency is never stale. Duplicate tags are allowed and collapse
/// to one snapshot entry.
#[derive(Debug, Clone, Default)]
pub struct Dependency {
    tags: Vec<Tag>,
}

impl Dependency {
    pub fn new(tags: Vec<Tag>) -> Self {
        Self { tags }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Rebuild the dependency that produced `snapshot`
    pub fn from_snapshot(ctx: &TagContext, snapshot: &DependencySnapshot) -> Self {
        Self::new(snapshot.tag_names().map(|name| ctx.tag(name)).collect())
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(Tag::name)
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    fn find(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().find(|tag| tag.name() == name)
    }

    /// Pin and collect the version of every tag
    ///
    /// Tags that were never versioned get a version now, so a later delete is
    /// the only thing that can make the snapshot stale.
    pub async fn snapshot(&self) -> TagCacheResult<DependencySnapshot> {
        let mut snapshot = DependencySnapshot::new();
        for tag in &self.tags {
            if snapshot.version(tag.name()).is_some() {
                continue;
            }
            let version = tag.ensure_version().await?;
            snapshot.insert(tag.name(), version);
        }
        Ok(snapshot)
    }

    /// Whether any tag moved away from the version recorded in `snapshot`
    ///
    /// Only reads the store. A snapshot that names a different tag set than
    /// this dependency is reported stale.
    pub async fn is_stale(&self, snapshot: &DependencySnapshot) -> TagCacheResult<bool> {
        if self.tag_names().any(|name| snapshot.version(name).is_none()) {
            debug!("Snapshot is missing a dependency tag");
            return Ok(true);
        }

        for (name, recorded) in snapshot.iter() {
            let Some(tag) = self.find(name) else {
                debug!(tag = %name, "Snapshot names a tag outside the dependency");
                return Ok(true);
            };

            match tag.get().await? {
                Some(live) if live == recorded => continue,
                Some(live) => {
                    debug!(tag = %name, recorded = %recorded, live = %live, "Tag version changed");
                    return Ok(true);
                }
                None => {
                    debug!(tag = %name, recorded = %recorded, "Tag version gone");
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }

    /// Delete every tag, invalidating all entries that depend on any of them
    pub async fn invalidate(&self) -> TagCacheResult<()> {
        for tag in &self.tags {
            tag.delete().await?;
        }
        Ok(())
    }
}
