//! Process-local directory store.
//!
//! Used for single-instance deployments and tests. Expiry follows
//! `tokio::time`, so paused-clock tests can advance it deterministically.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::errors::Result;
use crate::store::DirectoryStore;

struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-memory [`DirectoryStore`] with lazy expiry.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }

    /// Whether the store holds no live keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_live<T>(&self, key: &str, f: impl FnOnce(&mut Entry) -> T) -> Option<T> {
        let mut entries = self.entries.lock();
        let now = Instant::now();
        match entries.get_mut(key) {
            Some(entry) if entry.expires_at > now => Some(f(entry)),
            Some(_) => {
                let _ = entries.remove(key);
                None
            }
            None => None,
        }
    }
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.with_live(key, |e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        let _ = self.entries.lock().insert(key.to_string(), entry);
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let expires_at = Instant::now() + ttl;
        Ok(self
            .with_live(key, |e| e.expires_at = expires_at)
            .is_some())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let _ = self.entries.lock().remove(key);
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        let now = Instant::now();
        Ok(self.with_live(key, |e| e.expires_at.saturating_duration_since(now)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn set_then_get() {
        let store = MemoryStore::new();
        store.set("k", "v".into(), MINUTE).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn set_overwrites() {
        let store = MemoryStore::new();
        store.set("k", "v1".into(), MINUTE).await.unwrap();
        store.set("k", "v2".into(), MINUTE).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v2"));
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire() {
        let store = MemoryStore::new();
        store.set("k", "v".into(), MINUTE).await.unwrap();
        tokio::time::advance(MINUTE + Duration::from_millis(1)).await;
        assert!(store.get("k").await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn expire_extends_lifetime() {
        let store = MemoryStore::new();
        store.set("k", "v".into(), MINUTE).await.unwrap();
        tokio::time::advance(Duration::from_secs(45)).await;
        assert!(store.expire("k", MINUTE).await.unwrap());
        tokio::time::advance(Duration::from_secs(45)).await;
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(store.ttl("k").await.unwrap(), Some(Duration::from_secs(15)));
    }

    #[tokio::test]
    async fn expire_missing_key_returns_false() {
        let store = MemoryStore::new();
        assert!(!store.expire("missing", MINUTE).await.unwrap());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryStore::new();
        store.set("k", "v".into(), MINUTE).await.unwrap();
        store.delete("k").await.unwrap();
        store.delete("k").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
    }
}
