//! Protocol constants for Jet envelopes.
//!
//! These values are part of the wire format and MUST NOT be changed.

// =============================================================================
// FRAMING
// =============================================================================

/// Magic constant opening every envelope frame (`"SERVERJET0ENVPKT"`).
pub const MAGIC: [u8; MAGIC_SIZE] = *b"SERVERJET0ENVPKT";

/// Magic constant size.
pub const MAGIC_SIZE: usize = 16;

/// Default protocol version identifier.
pub const JET_V1: &str = "t/v1 (0.jet.alpha)";

/// Encryption flag: payload travels masked but in the clear.
pub const FLAG_PLAIN: u8 = 0x00;

/// Encryption flag: payload is AEAD sealed.
pub const FLAG_ENCRYPTED: u8 = 0x01;

/// Signature flag: the truncated HMAC is not checked on receipt.
pub const FLAG_UNSIGNED: u8 = 0x00;

/// Signature flag: the truncated HMAC must verify on receipt.
pub const FLAG_SIGNED: u8 = 0x01;

/// Reserved field marking a literal (non-object) payload.
pub const LITERAL_FIELD: &str = "$payload";

// =============================================================================
// CRYPTOGRAPHIC CONSTANTS
// =============================================================================

/// Minimum transport master key size.
pub const MIN_TRANSPORT_KEY_SIZE: usize = 64;

/// HKDF output size (encryption key || signing key).
pub const DERIVED_KEY_MATERIAL_SIZE: usize = 64;

/// AES-256 key size.
pub const ENCRYPTION_KEY_SIZE: usize = 32;

/// HMAC-SHA256 signing key size.
pub const SIGNING_KEY_SIZE: usize = 32;

/// HKDF salt (fixed, all zero).
pub const HKDF_SALT: [u8; 32] = [0u8; 32];

/// AES-GCM nonce size.
pub const AEAD_NONCE_SIZE: usize = 12;

/// AES-GCM authentication tag size.
pub const AEAD_TAG_SIZE: usize = 16;

/// Full HMAC-SHA256 digest size.
pub const HMAC_SIZE: usize = 32;

/// Transmitted (truncated) MAC size.
pub const MAC_SIZE: usize = 16;

/// Key version written into every header.
pub const KEY_VERSION: u8 = 1;

/// Frame header size: key version + BE32 timestamp + duplicated low byte.
pub const HEADER_SIZE: usize = 6;

// =============================================================================
// TIMING / REPLAY
// =============================================================================

/// Default allowed clock skew in seconds.
pub const DEFAULT_ALLOWED_WINDOW: u64 = 60;

/// Replay entries live for this many windows.
pub const REPLAY_TTL_WINDOWS: u64 = 2;

// =============================================================================
// MASKING
// =============================================================================

/// Default mask byte.
pub const DEFAULT_MASK_BYTE: u8 = 0xA5;

// =============================================================================
// TRANSPORT HEADERS
// =============================================================================

/// Header carrying the protocol version.
pub const HEADER_VERSION: &str = "X-Jet-Version";

/// Header carrying the compression flag placeholder.
pub const HEADER_COMPRESSION: &str = "X-Jet-Compression-Flag";

/// Header carrying the binary-to-text transfer encoding.
pub const HEADER_TRANSFER_ENCODING: &str = "X-Jet-Transfer-Encoding";

/// Compression flag value (compression is not negotiated).
pub const COMPRESSION_FLAG_NONE: &str = "-0x00";
