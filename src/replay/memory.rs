//! In-process replay store.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::ReplayStore;
use crate::core::ReplayError;

/// Replay store backed by a map of key to expiry time.
///
/// Expired entries are swept lazily on every check.
#[derive(Debug, Default)]
pub struct MemoryReplayStore {
    entries: Mutex<HashMap<String, u64>>,
}

impl MemoryReplayStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

fn sweep(entries: &mut HashMap<String, u64>, now: u64) {
    entries.retain(|_, expiry| *expiry >= now);
}

#[async_trait]
impl ReplayStore for MemoryReplayStore {
    async fn seen(&self, key: &str, now: u64) -> Result<bool, ReplayError> {
        let mut entries = self.entries.lock();
        sweep(&mut entries, now);
        Ok(entries.contains_key(key))
    }

    async fn record(&self, key: &str, now: u64, ttl: u64) -> Result<(), ReplayError> {
        self.entries
            .lock()
            .insert(key.to_string(), now.saturating_add(ttl));
        Ok(())
    }

    async fn insert_if_absent(&self, key: &str, now: u64, ttl: u64) -> Result<bool, ReplayError> {
        let mut entries = self.entries.lock();
        sweep(&mut entries, now);
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), now.saturating_add(ttl));
        Ok(true)
    }

    fn purge(&self) {
        self.entries.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn test_insert_if_absent() {
        let store = MemoryReplayStore::new();

        assert!(store.insert_if_absent("aa", 100, 120).await.unwrap());
        assert!(!store.insert_if_absent("aa", 101, 120).await.unwrap());
        assert!(store.insert_if_absent("bb", 101, 120).await.unwrap());
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_entries_expire_after_ttl() {
        let store = MemoryReplayStore::new();
        store.record("aa", 100, 120).await.unwrap();

        assert!(store.seen("aa", 220).await.unwrap());
        assert!(!store.seen("aa", 221).await.unwrap());
        assert!(store.is_empty());

        assert!(store.insert_if_absent("aa", 221, 120).await.unwrap());
    }

    #[tokio::test]
    async fn test_purge() {
        let store = MemoryReplayStore::new();
        store.record("aa", 0, 10).await.unwrap();
        store.purge();
        assert!(!store.seen("aa", 0).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_insert_admits_one() {
        let store = Arc::new(MemoryReplayStore::new());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.insert_if_absent("nonce", 5, 10).await.unwrap() })
            })
            .collect();

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 1);
    }
}
