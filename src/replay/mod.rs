//! Nonce replay protection.
//!
//! Keys are hex-encoded nonces. Entries live for `ttl` seconds from first
//! sight; the envelope always passes twice its allowed window.
//!
//! The envelope only calls [`ReplayStore::insert_if_absent`], which must
//! check and record in one atomic step so that two concurrent decodes of the
//! same frame cannot both pass.

mod external;
mod memory;

use async_trait::async_trait;

use crate::core::ReplayError;

pub use external::{default_prefix, ExternalReplayStore, KeyValueStore};
pub use memory::MemoryReplayStore;

/// Storage for recently seen nonces.
#[async_trait]
pub trait ReplayStore: Send + Sync {
    /// Whether `key` was recorded and has not expired at `now`.
    async fn seen(&self, key: &str, now: u64) -> Result<bool, ReplayError>;

    /// Record `key` as seen at `now` for `ttl` seconds.
    async fn record(&self, key: &str, now: u64, ttl: u64) -> Result<(), ReplayError>;

    /// Record `key` unless it is already live.
    ///
    /// Returns `true` if the key was inserted, `false` if it was a replay.
    async fn insert_if_absent(&self, key: &str, now: u64, ttl: u64) -> Result<bool, ReplayError>;

    /// Drop every locally held entry.
    fn purge(&self);
}

#[cfg(test)]
pub(crate) mod mock {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::KeyValueStore;
    use crate::core::ReplayError;

    /// In-memory key/value backend that keeps every write for inspection.
    #[derive(Default)]
    pub(crate) struct MockKv {
        pub(crate) data: Mutex<HashMap<String, (String, u64)>>,
        fail: bool,
    }

    impl MockKv {
        pub(crate) fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        pub(crate) fn keys(&self) -> Vec<String> {
            let mut keys: Vec<_> = self.data.lock().keys().cloned().collect();
            keys.sort();
            keys
        }
    }

    #[async_trait]
    impl KeyValueStore for MockKv {
        async fn exists(&self, key: &str) -> Result<bool, ReplayError> {
            if self.fail {
                return Err(ReplayError::Backend("connection refused".into()));
            }
            Ok(self.data.lock().contains_key(key))
        }

        async fn set(
            &self,
            key: &str,
            value: &str,
            ttl: u64,
            only_if_absent: bool,
        ) -> Result<bool, ReplayError> {
            if self.fail {
                return Err(ReplayError::Backend("connection refused".into()));
            }
            let mut data = self.data.lock();
            if only_if_absent && data.contains_key(key) {
                return Ok(false);
            }
            data.insert(key.to_string(), (value.to_string(), ttl));
            Ok(true)
        }
    }
}
