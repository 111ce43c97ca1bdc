//! Store key schema
//!
//! Tag slots and cache entries share one store but never one key.
//! Key format: {namespace}:v{SCHEMA_VERSION}:{kind}:{identifier}

/// Key schema version - increment when changing key formats
pub const SCHEMA_VERSION: u32 = 1;

const TAG_KIND: &str = "tag";
const ENTRY_KIND: &str = "entry";

/// Store key builder
pub struct CacheKey;

impl CacheKey {
    /// Version slot of a tag
    /// Format: {namespace}:v1:tag:{name}
    pub fn tag(namespace: &str, name: &str) -> String {
        format!("{}:v{}:{}:{}", namespace, SCHEMA_VERSION, TAG_KIND, name)
    }

    /// Payload slot of a cache entry
    /// Format: {namespace}:v1:entry:{key}
    pub fn entry(namespace: &str, key: &str) -> String {
        format!("{}:v{}:{}:{}", namespace, SCHEMA_VERSION, ENTRY_KIND, key)
    }

    /// Extract the key kind (`tag` or `entry`)
    pub fn kind(key: &str) -> Option<&str> {
        // Format: {namespace}:v{N}:{kind}:...
        let mut parts = key.splitn(4, ':');
        let _namespace = parts.next()?;
        let _version = parts.next()?;
        let kind = parts.next()?;
        parts.next()?;
        Some(kind)
    }
}
