//! Envelope protocol engine.
//!
//! An [`Envelope`] owns one transport configuration and turns payloads into
//! frames and back:
//!
//! ```text
//! encode: input -> Payload -> canonical bytes -> [AEAD + MAC] -> masked frame -> [text]
//! decode: [text] -> frame -> [window, replay, MAC, AEAD] -> canonical bytes -> Payload
//! ```
//!
//! Without a transport key frames are only masked, which gives neither
//! confidentiality nor integrity.

mod config;
mod engine;
mod frame;
mod mask;

pub use config::{EnvelopeBuilder, EnvelopeConfig, ProtocolVersion, ReplayBackend};
pub use engine::Envelope;
pub use frame::{Frame, FrameHeader};
pub use mask::Mask;
