//! Error types for Jet protocol.

use thiserror::Error;

/// Errors raised by the type-tagged binary codec.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Unexpected end of data.
    #[error("unexpected end of data")]
    UnexpectedEof,

    /// Unknown type tag.
    #[error("unknown type tag: {0:#04x}")]
    UnknownTag(u8),

    /// A value of a different type was expected at this position.
    #[error("unexpected type tag: expected {expected}, found {found:#04x}")]
    UnexpectedTag {
        /// Human readable name of the expected type.
        expected: &'static str,
        /// Tag actually found.
        found: u8,
    },

    /// Text field is not valid UTF-8.
    #[error("invalid utf-8 in text field")]
    InvalidUtf8,

    /// A length does not fit the 32-bit length prefix.
    #[error("length {0} exceeds the 32-bit length prefix")]
    LengthOverflow(usize),

    /// Integer does not fit the requested width.
    #[error("integer {0} out of range")]
    OutOfRange(i64),

    /// A fixed-size list has the wrong number of elements.
    #[error("expected a list of {expected} elements, found {found}")]
    ArityMismatch {
        /// Required element count.
        expected: usize,
        /// Element count actually found.
        found: usize,
    },

    /// Nesting is too deep.
    #[error("nesting depth exceeded")]
    DepthExceeded,
}

/// Errors in the crypto layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// AEAD encryption failed.
    #[error("AEAD encryption failed")]
    EncryptionFailed,

    /// AEAD decryption failed (invalid tag or corrupted).
    #[error("AEAD decryption failed (invalid tag or corrupted)")]
    DecryptionFailed,

    /// Key derivation failed.
    #[error("key derivation failed")]
    KeyDerivationFailed,

    /// Key has the wrong length for the primitive.
    #[error("invalid key length: {0}")]
    InvalidKeyLength(usize),
}

/// Errors from binary-to-text codecs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// Unsupported encoding name.
    #[error("unsupported binary-to-text encoding: {0}")]
    Unsupported(String),

    /// Malformed input text.
    #[error("malformed {encoding} input: {reason}")]
    Malformed {
        /// Encoding that rejected the input.
        encoding: &'static str,
        /// Why the input was rejected.
        reason: String,
    },
}

/// Errors from replay store backends.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReplayError {
    /// The backing store failed.
    #[error("replay store backend failure: {0}")]
    Backend(String),
}

/// Errors from clock sources.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClockError {
    /// The local system clock is before the Unix epoch.
    #[error("system clock is before the unix epoch")]
    BeforeEpoch,

    /// The remote clock has not been synchronised yet.
    #[error("remote clock not synchronised")]
    NotSynchronized,

    /// The remote time source answered with an invalid timestamp.
    #[error("invalid remote timestamp: {0}")]
    InvalidTimestamp(String),

    /// The remote time query failed.
    #[error("remote time query failed: {0}")]
    QueryFailed(String),

    /// The remote time query timed out.
    #[error("remote time query timed out")]
    Timeout,

    /// The query was cancelled by its token.
    #[error("remote time query was cancelled")]
    Cancelled,
}

/// Error taxonomy surfaced to callers.
///
/// Decode failures never reveal more than this classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input.
    InvalidArgument,
    /// Payload cannot be coerced to bytes.
    InvalidType,
    /// MAC mismatch on a signed packet.
    InvalidSignature,
    /// AEAD tag verification failed.
    AuthenticationFailure,
    /// Header timestamp outside allowed clock skew.
    WindowExpired,
    /// Nonce already seen within the replay window.
    ReplayRejected,
    /// Operation attempted after disposal.
    ResourceDisposed,
    /// Canonical bytes are not a valid entry sequence.
    MalformedPayload,
    /// Container mutated while being iterated.
    ConcurrentModification,
    /// Invalid envelope configuration.
    Configuration,
    /// Encrypted packet received without a configured transport key.
    MissingTransportKey,
    /// Replay store or clock backend failure.
    Backend,
}

/// Top-level Jet errors.
#[derive(Debug, Error)]
pub enum JetError {
    /// Malformed input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Value cannot be encoded.
    #[error("invalid type: {0}")]
    InvalidType(String),

    /// Truncated MAC did not match.
    #[error("failed to check integrity of incoming packet")]
    InvalidSignature,

    /// AEAD tag did not verify.
    #[error("packet authentication failed")]
    AuthenticationFailed,

    /// Header timestamp outside the allowed window.
    #[error("packet window expired: skew {skew}s exceeds {allowed}s")]
    WindowExpired {
        /// Observed skew in seconds.
        skew: u64,
        /// Allowed skew in seconds.
        allowed: u64,
    },

    /// Nonce replay detected.
    #[error("packet nonce refused due to replay protection")]
    ReplayRejected,

    /// Envelope already disposed.
    #[error("envelope is already disposed")]
    Disposed,

    /// Canonical bytes do not form an entry sequence.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// Payload modified during iteration.
    #[error("payload modified during iteration")]
    ConcurrentModification,

    /// Transport key shorter than the safe minimum.
    #[error("transport key is too short: {len} bytes, need at least {min}")]
    WeakTransportKey {
        /// Provided key length.
        len: usize,
        /// Minimum accepted length.
        min: usize,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Encrypted packet but no transport key configured.
    #[error("cannot unwrap encrypted packet: no transport key configured")]
    MissingTransportKey,

    /// Replay store failure.
    #[error("replay store error: {0}")]
    Replay(#[from] ReplayError),

    /// Crypto layer failure outside AEAD verification.
    #[error("crypto error: {0}")]
    Crypto(CryptoError),

    /// Text codec failure.
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// No usable clock, not even the system one.
    #[error("clock error: {0}")]
    Clock(#[from] ClockError),
}

impl JetError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            JetError::InvalidArgument(_) | JetError::Encoding(_) => ErrorKind::InvalidArgument,
            JetError::InvalidType(_) => ErrorKind::InvalidType,
            JetError::InvalidSignature => ErrorKind::InvalidSignature,
            JetError::AuthenticationFailed => ErrorKind::AuthenticationFailure,
            JetError::WindowExpired { .. } => ErrorKind::WindowExpired,
            JetError::ReplayRejected => ErrorKind::ReplayRejected,
            JetError::Disposed => ErrorKind::ResourceDisposed,
            JetError::MalformedPayload(_) => ErrorKind::MalformedPayload,
            JetError::ConcurrentModification => ErrorKind::ConcurrentModification,
            JetError::WeakTransportKey { .. } | JetError::Config(_) => ErrorKind::Configuration,
            JetError::MissingTransportKey => ErrorKind::MissingTransportKey,
            JetError::Replay(_) | JetError::Clock(_) => ErrorKind::Backend,
            JetError::Crypto(CryptoError::DecryptionFailed) => ErrorKind::AuthenticationFailure,
            JetError::Crypto(_) => ErrorKind::InvalidArgument,
        }
    }

    /// Check if this error is a security rejection of an incoming packet.
    pub fn is_security_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidSignature
                | ErrorKind::AuthenticationFailure
                | ErrorKind::WindowExpired
                | ErrorKind::ReplayRejected
        )
    }
}

impl From<CryptoError> for JetError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::DecryptionFailed => JetError::AuthenticationFailed,
            other => JetError::Crypto(other),
        }
    }
}

/// Result type for Jet operations.
pub type Result<T> = std::result::Result<T, JetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_taxonomy() {
        assert_eq!(
            JetError::InvalidArgument("bad magic".into()).kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(JetError::InvalidSignature.kind(), ErrorKind::InvalidSignature);
        assert_eq!(
            JetError::WindowExpired { skew: 61, allowed: 60 }.kind(),
            ErrorKind::WindowExpired
        );
        assert_eq!(JetError::Disposed.kind(), ErrorKind::ResourceDisposed);
        assert_eq!(
            JetError::from(EncodingError::Unsupported("rot13".into())).kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn test_decryption_failure_maps_to_authentication() {
        let err = JetError::from(CryptoError::DecryptionFailed);
        assert!(matches!(err, JetError::AuthenticationFailed));
        assert_eq!(err.kind(), ErrorKind::AuthenticationFailure);
    }

    #[test]
    fn test_security_errors() {
        assert!(JetError::ReplayRejected.is_security_error());
        assert!(JetError::AuthenticationFailed.is_security_error());
        assert!(JetError::WindowExpired { skew: 1, allowed: 0 }.is_security_error());

        assert!(!JetError::Disposed.is_security_error());
        assert!(!JetError::MalformedPayload("x".into()).is_security_error());
    }
}
