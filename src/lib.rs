//! # Jet Protocol
//!
//! Secure framed envelopes for structured payloads.
//!
//! Jet turns an ordered payload into a self-describing binary frame. With a
//! transport key every frame is independently sealed:
//!
//! - **Confidentiality**: AES-256-GCM under a key derived per transport with
//!   HKDF-SHA256
//! - **Integrity**: the frame header is AEAD associated data, and a truncated
//!   HMAC-SHA256 signs `header || nonce || ciphertext`
//! - **Freshness**: a timestamp window and a nonce replay store
//! - **Transport**: frames can travel as base64, base64url, hex or base62 text
//!
//! There is no handshake and no session: every packet stands on its own.
//!
//! ## Feature Flags
//!
//! - `clock-sync` (default): [`clock::RemoteClock`], a tokio based remote
//!   time synchroniser with retry, backoff and cancellation
//!
//! ## Modules
//!
//! - [`core`]: constants and error types
//! - [`codec`]: type-tagged binary codec and the [`Value`] model
//! - [`payload`]: ordered payload container
//! - [`crypto`]: HKDF, AES-256-GCM and HMAC helpers
//! - [`encoding`]: binary-to-text codecs
//! - [`replay`]: replay stores
//! - [`clock`]: timestamp sources
//! - [`envelope`]: the protocol engine
//!
//! ## Example Usage
//!
//! ```rust
//! use jet_protocol::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<()> {
//! let envelope = Envelope::builder()
//!     .transport_key(vec![0x11u8; 64])
//!     .build()?;
//!
//! let packet = envelope
//!     .encode(Value::object([("user", Value::from("ana")), ("id", Value::from(7))]))
//!     .await?;
//!
//! let payload = envelope.decode(&packet).await?;
//! assert_eq!(payload.get(&"id".into()), Some(Value::Int(7)));
//!
//! // The same packet is refused the second time.
//! assert!(matches!(envelope.decode(&packet).await, Err(JetError::ReplayRejected)));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod clock;
pub mod codec;
pub mod core;
pub mod crypto;
pub mod encoding;
pub mod envelope;
pub mod payload;
pub mod replay;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::clock::{ClockSource, ManualClock, SystemClock};
    pub use crate::codec::{FieldKey, Value};
    pub use crate::core::{ErrorKind, JetError, Result};
    pub use crate::encoding::TextEncoding;
    pub use crate::envelope::{
        Envelope, EnvelopeBuilder, EnvelopeConfig, Mask, ProtocolVersion, ReplayBackend,
    };
    pub use crate::payload::{Payload, PayloadEntry, PayloadInput};
    pub use crate::replay::{ExternalReplayStore, KeyValueStore, MemoryReplayStore, ReplayStore};

    #[cfg(feature = "clock-sync")]
    pub use crate::clock::{CancellationToken, RemoteClock, RetryPolicy, TimeQuery};
}

// Re-export commonly used items at crate root
pub use crate::codec::{FieldKey, Value};
pub use crate::core::{ErrorKind, JetError, Result};
pub use crate::envelope::{Envelope, EnvelopeBuilder, EnvelopeConfig};
pub use crate::payload::{Payload, PayloadInput};
