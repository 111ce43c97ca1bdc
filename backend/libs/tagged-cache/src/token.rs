//! Version token policies
//!
//! Tokens are opaque; the protocol only compares them for equality.

use std::sync::atomic::{AtomicU64, Ordering};

/// Produces fresh version tokens for tags
pub trait VersionGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random UUID v4 tokens
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidVersionGenerator;

impl VersionGenerator for UuidVersionGenerator {
    fn generate(&self) -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }
}

static TIMESTAMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Microsecond timestamp plus a process-wide counter
///
/// Tokens from one process never repeat; tokens from different processes
/// only collide if both the timestamp and the counter value coincide.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampVersionGenerator;

impl VersionGenerator for TimestampVersionGenerator {
    fn generate(&self) -> String {
        let micros = chrono::Utc::now().timestamp_micros();
        let seq = TIMESTAMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        format!("{:x}.{:x}", micros, seq)
    }
}
