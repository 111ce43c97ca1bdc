//! Tagged cache configuration

use crate::{TagCacheError, TagCacheResult};
use std::fmt;
use std::time::Duration;

/// Behaviour of the cache facade
#[derive(Debug, Clone)]
pub struct TaggedCacheConfig {
    /// Prefix of every key written to the store
    pub namespace: String,
    /// Random extra TTL (0-N percent) added to entry TTLs
    pub ttl_jitter_percent: u32,
    /// Degrade store failures on the read path to a miss instead of an error
    pub fail_closed_reads: bool,
}

impl Default for TaggedCacheConfig {
    fn default() -> Self {
        Self {
            namespace: String::from("tagged"),
            ttl_jitter_percent: 0,
            fail_closed_reads: true,
        }
    }
}

impl TaggedCacheConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `TAGGED_CACHE_NAMESPACE`: key prefix (default: tagged)
    /// - `TAGGED_CACHE_TTL_JITTER_PERCENT`: TTL jitter, clamped to 0-100 (default: 0)
    /// - `TAGGED_CACHE_FAIL_CLOSED`: treat read failures as misses (default: true)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let namespace = std::env::var("TAGGED_CACHE_NAMESPACE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.namespace);

        let ttl_jitter_percent = std::env::var("TAGGED_CACHE_TTL_JITTER_PERCENT")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(defaults.ttl_jitter_percent)
            .min(100);

        let fail_closed_reads = std::env::var("TAGGED_CACHE_FAIL_CLOSED")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.fail_closed_reads);

        Self {
            namespace,
            ttl_jitter_percent,
            fail_closed_reads,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }
}

/// Redis connection settings for [`crate::RedisStore`]
#[derive(Clone)]
pub struct RedisStoreConfig {
    /// Redis connection URL
    pub redis_url: String,
    /// Timeout for establishing the connection manager
    pub connect_timeout_secs: u64,
}

impl fmt::Debug for RedisStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStoreConfig")
            .field("redis_url", &"[REDACTED]")
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            redis_url: String::from("redis://127.0.0.1:6379"),
            connect_timeout_secs: 5,
        }
    }
}

impl RedisStoreConfig {
    pub fn new(redis_url: impl Into<String>) -> Self {
        Self {
            redis_url: redis_url.into(),
            ..Self::default()
        }
    }

    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `REDIS_URL`: connection URL (required)
    /// - `REDIS_CONNECT_TIMEOUT_SECS`: connect timeout (default: 5)
    pub fn from_env() -> TagCacheResult<Self> {
        let redis_url = required_url(std::env::var("REDIS_URL").ok())?;

        Ok(Self {
            redis_url,
            connect_timeout_secs: std::env::var("REDIS_CONNECT_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
        })
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn required_url(value: Option<String>) -> TagCacheResult<String> {
    value.filter(|v| !v.trim().is_empty()).ok_or_else(|| {
        TagCacheError::Configuration("REDIS_URL environment variable not set".to_string())
    })
}
