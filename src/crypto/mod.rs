//! Security layer for Jet envelopes.
//!
//! Fixed suite, no negotiation:
//! - HKDF-SHA256 (zero salt) splits the transport key into an encryption and
//!   a signing key
//! - AES-256-GCM seals the payload with the frame header as associated data
//! - HMAC-SHA256, truncated to 16 bytes, signs `header || nonce || ciphertext`

mod aead;
mod kdf;
mod mac;

pub use aead::{aead_decrypt, aead_encrypt};
pub use kdf::{derive_keys, TransportKeys};
pub use mac::{constant_time_eq, hmac_sha256, hmac_sha256_parts, random_bytes, truncated_mac};
