//! Key/value store capability behind the session directory.

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::Result;

/// A TTL-capable key/value store. Each call is one atomic key operation.
///
/// Absence is reported as `Ok(None)` / `Ok(false)`, never as an error, so
/// the directory can tell "no such session" apart from a store outage.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Read `key`. `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write `value` under `key` with the given expiry, overwriting any previous value.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    /// Reset the expiry of `key` without touching its value.
    ///
    /// Returns `false` when the key does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// Remove `key`. Removing an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Remaining time to live of `key`. `None` when absent or without expiry.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
