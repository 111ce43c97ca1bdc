//! Error types for tagged cache operations

use thiserror::Error;

/// Tagged cache errors
///
/// An absent tag version is not an error; it is reported as `Ok(None)`.
#[derive(Error, Debug)]
pub enum TagCacheError {
    /// Redis connection or command error
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Entry serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failure reported by a non-Redis store
    #[error("Store error: {0}")]
    Store(String),

    /// Connection timeout
    #[error("Connection timeout: {0}")]
    Timeout(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Concurrent writers kept replacing a tag slot while a version was being pinned
    #[error("Version contention on tag: {0}")]
    VersionContention(String),
}

pub type TagCacheResult<T> = Result<T, TagCacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TagCacheError::Store("backend down".to_string());
        assert_eq!(err.to_string(), "Store error: backend down");

        let err = TagCacheError::VersionContention("users".to_string());
        assert_eq!(err.to_string(), "Version contention on tag: users");
    }

    #[test]
    fn test_error_from_serde() {
        let json_err = serde_json::from_str::<String>("not json");
        assert!(json_err.is_err());

        let err: TagCacheError = json_err.unwrap_err().into();
        assert!(matches!(err, TagCacheError::Serialization(_)));
    }
}
