//! Message authentication and randomness helpers.

use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::core::{CryptoError, HMAC_SIZE, MAC_SIZE};

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 over a single buffer.
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<[u8; HMAC_SIZE], CryptoError> {
    hmac_sha256_parts(key, &[data])
}

/// HMAC-SHA256 over the concatenation of `parts`, without copying them.
pub fn hmac_sha256_parts(key: &[u8], parts: &[&[u8]]) -> Result<[u8; HMAC_SIZE], CryptoError> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength(key.len()))?;
    for part in parts {
        mac.update(part);
    }

    let mut out = [0u8; HMAC_SIZE];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

/// First 16 bytes of HMAC-SHA256 over `parts`.
pub fn truncated_mac(key: &[u8], parts: &[&[u8]]) -> Result<[u8; MAC_SIZE], CryptoError> {
    let full = hmac_sha256_parts(key, parts)?;
    let mut out = [0u8; MAC_SIZE];
    out.copy_from_slice(&full[..MAC_SIZE]);
    Ok(out)
}

/// Constant-time byte comparison. Different lengths never match.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Fill an array from the operating system CSPRNG.
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut out = [0u8; N];
    OsRng.fill_bytes(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hmac_rfc4231_case2() {
        let mac = hmac_sha256(b"Jefe", b"what do ya want for nothing?").unwrap();
        assert_eq!(
            hex::encode(mac),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_parts_equal_concatenation() {
        let key = [9u8; 32];
        let whole = hmac_sha256(&key, b"headernonceciphertext").unwrap();
        let parts = hmac_sha256_parts(&key, &[b"header", b"nonce", b"ciphertext"]).unwrap();
        assert_eq!(whole, parts);

        let short = truncated_mac(&key, &[b"header", b"nonce", b"ciphertext"]).unwrap();
        assert_eq!(short, whole[..MAC_SIZE]);
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"SERVERJET0ENVPKT", b"SERVERJET0ENVPKT"));
        assert!(!constant_time_eq(b"SERVERJET0ENVPKT", b"SERVERJET0ENVPKX"));
        assert!(!constant_time_eq(b"short", b"longer"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn test_random_bytes_unique() {
        let a = random_bytes::<12>();
        let b = random_bytes::<12>();
        assert_ne!(a, b);
    }
}
