//! Adapter over an external key/value store.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::trace;

use super::ReplayStore;
use crate::core::ReplayError;

/// Minimal key/value backend with expiry and conditional set.
///
/// Any store offering `SET key value EX ttl NX` semantics fits.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Whether `key` exists and has not expired.
    async fn exists(&self, key: &str) -> Result<bool, ReplayError>;

    /// Set `key` with a ttl in seconds.
    ///
    /// With `only_if_absent`, the write must be atomic and skipped if the key
    /// exists. Returns whether the value was written.
    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: u64,
        only_if_absent: bool,
    ) -> Result<bool, ReplayError>;
}

#[async_trait]
impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    async fn exists(&self, key: &str) -> Result<bool, ReplayError> {
        (**self).exists(key).await
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: u64,
        only_if_absent: bool,
    ) -> Result<bool, ReplayError> {
        (**self).set(key, value, ttl, only_if_absent).await
    }
}

#[async_trait]
impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    async fn exists(&self, key: &str) -> Result<bool, ReplayError> {
        (**self).exists(key).await
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: u64,
        only_if_absent: bool,
    ) -> Result<bool, ReplayError> {
        (**self).set(key, value, ttl, only_if_absent).await
    }
}

/// Replay store delegating to a [`KeyValueStore`], with prefixed keys.
#[derive(Debug)]
pub struct ExternalReplayStore<S> {
    store: S,
    prefix: String,
}

impl<S: KeyValueStore> ExternalReplayStore<S> {
    /// Wrap `store`, prefixing every key with `prefix`.
    pub fn new(store: S, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    /// Wrap `store` with the default prefix for a protocol version.
    pub fn for_version(store: S, version: &str) -> Self {
        Self::new(store, default_prefix(version))
    }

    /// Key prefix in use.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

/// Default storage prefix for a protocol version: `tsj_{version}.sns__`.
pub fn default_prefix(version: &str) -> String {
    format!("tsj_{version}.sns__")
}

#[async_trait]
impl<S: KeyValueStore> ReplayStore for ExternalReplayStore<S> {
    async fn seen(&self, key: &str, _now: u64) -> Result<bool, ReplayError> {
        self.store.exists(&self.key(key)).await
    }

    async fn record(&self, key: &str, _now: u64, ttl: u64) -> Result<(), ReplayError> {
        self.store.set(&self.key(key), "1", ttl, false).await?;
        Ok(())
    }

    async fn insert_if_absent(&self, key: &str, _now: u64, ttl: u64) -> Result<bool, ReplayError> {
        self.store.set(&self.key(key), "1", ttl, true).await
    }

    fn purge(&self) {
        // Entries in the backend expire on their own.
        trace!(prefix = %self.prefix, "detaching external replay store");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::mock::MockKv;

    #[tokio::test]
    async fn test_prefixed_conditional_set() {
        let store = ExternalReplayStore::for_version(MockKv::default(), "t/v1");
        assert_eq!(store.prefix(), "tsj_t/v1.sns__");

        assert!(store.insert_if_absent("00ff", 0, 120).await.unwrap());
        assert!(!store.insert_if_absent("00ff", 1, 120).await.unwrap());
        assert!(store.seen("00ff", 1).await.unwrap());

        let data = store.store().data.lock();
        assert_eq!(
            data.get("tsj_t/v1.sns__00ff"),
            Some(&("1".to_string(), 120))
        );
    }

    #[tokio::test]
    async fn test_record_overwrites() {
        let store = ExternalReplayStore::new(MockKv::default(), "p:");
        store.record("k", 0, 10).await.unwrap();
        store.record("k", 0, 20).await.unwrap();
        assert_eq!(store.store().data.lock().get("p:k").map(|v| v.1), Some(20));
    }

    #[tokio::test]
    async fn test_backend_failure_propagates() {
        let store = ExternalReplayStore::new(
            MockKv::failing(),
            "p:",
        );
        assert!(matches!(
            store.insert_if_absent("k", 0, 10).await,
            Err(ReplayError::Backend(_))
        ));
    }
}
