//! Envelope configuration.

use std::fmt;
use std::sync::Arc;

use crate::clock::{ClockSource, SystemClock};
use crate::core::{Result, DEFAULT_ALLOWED_WINDOW, JET_V1};
use crate::replay::{
    default_prefix, ExternalReplayStore, KeyValueStore, MemoryReplayStore, ReplayStore,
};

use super::engine::Envelope;
use super::mask::Mask;

/// Protocol version identifier, text or number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProtocolVersion {
    /// Textual version.
    Text(String),
    /// Numeric version.
    Number(i64),
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        ProtocolVersion::Text(JET_V1.to_string())
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolVersion::Text(text) => f.write_str(text),
            ProtocolVersion::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for ProtocolVersion {
    fn from(v: &str) -> Self {
        ProtocolVersion::Text(v.to_string())
    }
}

impl From<String> for ProtocolVersion {
    fn from(v: String) -> Self {
        ProtocolVersion::Text(v)
    }
}

impl From<i64> for ProtocolVersion {
    fn from(v: i64) -> Self {
        ProtocolVersion::Number(v)
    }
}

/// Where an envelope records the nonces it has accepted.
///
/// The envelope owns its backend and purges it on dispose, so a store is
/// never shared between envelopes. Envelopes that share replay state do so
/// through an external key/value store, which is not purged.
pub enum ReplayBackend {
    /// A replay store owned by the envelope.
    Store(Box<dyn ReplayStore>),
    /// An external key/value store, keyed under the envelope's storage prefix.
    External(Box<dyn KeyValueStore>),
}

impl ReplayBackend {
    pub(crate) fn into_store(self, prefix: String) -> Box<dyn ReplayStore> {
        match self {
            ReplayBackend::Store(store) => store,
            ReplayBackend::External(kv) => Box::new(ExternalReplayStore::new(kv, prefix)),
        }
    }
}

impl Default for ReplayBackend {
    fn default() -> Self {
        ReplayBackend::Store(Box::new(MemoryReplayStore::new()))
    }
}

impl fmt::Debug for ReplayBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayBackend::Store(_) => f.write_str("Store"),
            ReplayBackend::External(_) => f.write_str("External"),
        }
    }
}

/// Configuration for an [`Envelope`]. Fixed once the envelope is built.
pub struct EnvelopeConfig {
    /// Version written into every frame.
    pub version: ProtocolVersion,
    /// Transport master key, at least 64 bytes. `None` sends plain frames.
    pub transport_key: Option<Vec<u8>>,
    /// Field mask.
    pub mask: Mask,
    /// Allowed clock skew in seconds. Values below 1 fall back to 60.
    pub allowed_window: u64,
    /// Nonce store.
    pub replay_store: ReplayBackend,
    /// Timestamp source.
    pub clock: Arc<dyn ClockSource>,
    /// Skip the truncated HMAC check on receipt and mark frames unsigned.
    ///
    /// AES-GCM still authenticates every sealed frame; this only drops the
    /// secondary HMAC layer.
    pub bypass_signature: bool,
    /// HKDF context binding derived keys to a deployment.
    pub key_context: Option<Vec<u8>>,
    /// Reject plain frames on decode.
    pub require_encryption: bool,
    /// Prefix for keys in a [`ReplayBackend::External`] store.
    pub storage_prefix: Option<String>,
}

impl EnvelopeConfig {
    /// Storage prefix, or `tsj_{version}.sns__` when unset or empty.
    pub fn resolved_storage_prefix(&self) -> String {
        match &self.storage_prefix {
            Some(prefix) if !prefix.is_empty() => prefix.clone(),
            _ => default_prefix(&self.version.to_string()),
        }
    }

    /// Allowed window with the minimum applied.
    pub fn effective_window(&self) -> u64 {
        if self.allowed_window < 1 {
            DEFAULT_ALLOWED_WINDOW
        } else {
            self.allowed_window
        }
    }
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            version: ProtocolVersion::default(),
            transport_key: None,
            mask: Mask::default(),
            allowed_window: DEFAULT_ALLOWED_WINDOW,
            replay_store: ReplayBackend::default(),
            clock: Arc::new(SystemClock),
            bypass_signature: false,
            key_context: None,
            require_encryption: false,
            storage_prefix: None,
        }
    }
}

impl fmt::Debug for EnvelopeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvelopeConfig")
            .field("version", &self.version)
            .field("has_transport_key", &self.transport_key.is_some())
            .field("mask", &self.mask)
            .field("allowed_window", &self.allowed_window)
            .field("replay_store", &self.replay_store)
            .field("bypass_signature", &self.bypass_signature)
            .field("has_key_context", &self.key_context.is_some())
            .field("require_encryption", &self.require_encryption)
            .field("storage_prefix", &self.storage_prefix)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Envelope`].
#[derive(Debug, Default)]
pub struct EnvelopeBuilder {
    config: EnvelopeConfig,
}

impl EnvelopeBuilder {
    /// Start from the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the protocol version.
    pub fn version(mut self, version: impl Into<ProtocolVersion>) -> Self {
        self.config.version = version.into();
        self
    }

    /// Set the transport master key.
    pub fn transport_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.config.transport_key = Some(key.into());
        self
    }

    /// Set the field mask.
    pub fn mask(mut self, mask: impl Into<Mask>) -> Self {
        self.config.mask = mask.into();
        self
    }

    /// Set the allowed clock skew in seconds.
    pub fn allowed_window(mut self, secs: u64) -> Self {
        self.config.allowed_window = secs;
        self
    }

    /// Use a custom replay store, owned by the envelope.
    pub fn replay_store(mut self, store: impl ReplayStore + 'static) -> Self {
        self.config.replay_store = ReplayBackend::Store(Box::new(store));
        self
    }

    /// Record nonces in an external key/value store under the storage prefix.
    pub fn external_store(mut self, store: impl KeyValueStore + 'static) -> Self {
        self.config.replay_store = ReplayBackend::External(Box::new(store));
        self
    }

    /// Use a custom timestamp source.
    pub fn clock(mut self, clock: Arc<dyn ClockSource>) -> Self {
        self.config.clock = clock;
        self
    }

    /// Skip the HMAC layer.
    pub fn bypass_signature(mut self, bypass: bool) -> Self {
        self.config.bypass_signature = bypass;
        self
    }

    /// Bind derived keys to a context string.
    pub fn key_context(mut self, context: impl Into<Vec<u8>>) -> Self {
        self.config.key_context = Some(context.into());
        self
    }

    /// Reject plain frames on decode.
    pub fn require_encryption(mut self, require: bool) -> Self {
        self.config.require_encryption = require;
        self
    }

    /// Set the external replay store prefix.
    pub fn storage_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.storage_prefix = Some(prefix.into());
        self
    }

    /// Finish without validating.
    pub fn into_config(self) -> EnvelopeConfig {
        self.config
    }

    /// Validate and build the envelope.
    pub fn build(self) -> Result<Envelope> {
        Envelope::new(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EnvelopeConfig::default();
        assert_eq!(config.version, ProtocolVersion::Text(JET_V1.into()));
        assert_eq!(config.mask, Mask::Byte(0xA5));
        assert_eq!(config.allowed_window, 60);
        assert!(config.transport_key.is_none());
        assert!(!config.bypass_signature);
        assert!(!config.require_encryption);
    }

    #[test]
    fn test_storage_prefix() {
        let config = EnvelopeConfig::default();
        assert_eq!(
            config.resolved_storage_prefix(),
            "tsj_t/v1 (0.jet.alpha).sns__"
        );

        let config = EnvelopeBuilder::new().version(7i64).into_config();
        assert_eq!(config.resolved_storage_prefix(), "tsj_7.sns__");

        let config = EnvelopeBuilder::new().storage_prefix("").into_config();
        assert_eq!(config.resolved_storage_prefix(), "tsj_t/v1 (0.jet.alpha).sns__");

        let config = EnvelopeBuilder::new().storage_prefix("jet:").into_config();
        assert_eq!(config.resolved_storage_prefix(), "jet:");
    }

    #[test]
    fn test_window_minimum() {
        let config = EnvelopeBuilder::new().allowed_window(0).into_config();
        assert_eq!(config.effective_window(), 60);

        let config = EnvelopeBuilder::new().allowed_window(1).into_config();
        assert_eq!(config.effective_window(), 1);
    }

    #[test]
    fn test_builder() {
        let config = EnvelopeBuilder::new()
            .transport_key(vec![0x11u8; 64])
            .mask(vec![1u8, 2, 3])
            .bypass_signature(true)
            .key_context("tenant")
            .require_encryption(true)
            .into_config();

        assert_eq!(config.transport_key.as_deref(), Some(&[0x11; 64][..]));
        assert_eq!(config.mask, Mask::Sequence(vec![1, 2, 3]));
        assert!(config.bypass_signature);
        assert_eq!(config.key_context.as_deref(), Some(&b"tenant"[..]));
        assert!(config.require_encryption);
    }

    #[test]
    fn test_replay_backend_selection() {
        let config = EnvelopeConfig::default();
        assert!(matches!(config.replay_store, ReplayBackend::Store(_)));

        let config = EnvelopeBuilder::new()
            .external_store(crate::replay::mock::MockKv::default())
            .into_config();
        assert!(matches!(config.replay_store, ReplayBackend::External(_)));
        assert!(format!("{config:?}").contains("replay_store: External"));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = EnvelopeBuilder::new().transport_key(vec![0x77u8; 64]).into_config();
        let debug = format!("{config:?}");
        assert!(debug.contains("has_transport_key: true"));
        assert!(!debug.contains("119"));
    }
}
