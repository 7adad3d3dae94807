//! AES-256-GCM sealing.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};

use crate::core::{AEAD_NONCE_SIZE, AEAD_TAG_SIZE, CryptoError, ENCRYPTION_KEY_SIZE};

/// Encrypt `plaintext` with AES-256-GCM.
///
/// Returns `ciphertext || tag`.
pub fn aead_encrypt(
    key: &[u8; ENCRYPTION_KEY_SIZE],
    plaintext: &[u8],
    nonce: &[u8; AEAD_NONCE_SIZE],
    aad: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new(key.into());
    cipher
        .encrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|_| CryptoError::EncryptionFailed)
}

/// Decrypt `ciphertext || tag` with AES-256-GCM.
///
/// # Errors
/// Returns `DecryptionFailed` if the input is shorter than a tag or the tag
/// does not verify.
pub fn aead_decrypt(
    key: &[u8; ENCRYPTION_KEY_SIZE],
    ciphertext: &[u8],
    nonce: &[u8; AEAD_NONCE_SIZE],
    aad: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.len() < AEAD_TAG_SIZE {
        return Err(CryptoError::DecryptionFailed);
    }

    let cipher = Aes256Gcm::new(key.into());
    cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| CryptoError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gcm_known_answer() {
        // GCM test case 14: zero key, zero IV, one zero block.
        let sealed = aead_encrypt(&[0u8; 32], &[0u8; 16], &[0u8; 12], &[]).unwrap();
        assert_eq!(
            hex::encode(&sealed),
            "cea7403d4d606b6e074ec5d3baf39d18d0d1c8a799996bf0265b98b5d48ab919"
        );
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = [0x42u8; 32];
        let nonce = [7u8; 12];
        let aad = [1, 0, 0, 0, 9, 9];
        let plaintext = b"Hello, Jet!";

        let ciphertext = aead_encrypt(&key, plaintext, &nonce, &aad).unwrap();
        assert_eq!(ciphertext.len(), plaintext.len() + AEAD_TAG_SIZE);

        let decrypted = aead_decrypt(&key, &ciphertext, &nonce, &aad).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_wrong_aad_fails() {
        let key = [0x42u8; 32];
        let nonce = [0u8; 12];

        let ciphertext = aead_encrypt(&key, b"data", &nonce, b"header-a").unwrap();
        let result = aead_decrypt(&key, &ciphertext, &nonce, b"header-b");
        assert_eq!(result.unwrap_err(), CryptoError::DecryptionFailed);
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = [0x42u8; 32];
        let nonce = [0u8; 12];

        let mut ciphertext = aead_encrypt(&key, b"Secret message", &nonce, &[]).unwrap();
        ciphertext[0] ^= 0xFF;

        assert!(aead_decrypt(&key, &ciphertext, &nonce, &[]).is_err());
    }

    #[test]
    fn test_wrong_key_fails() {
        let nonce = [0u8; 12];
        let ciphertext = aead_encrypt(&[1u8; 32], b"data", &nonce, &[]).unwrap();
        assert!(aead_decrypt(&[2u8; 32], &ciphertext, &nonce, &[]).is_err());
    }

    #[test]
    fn test_short_input_fails() {
        let result = aead_decrypt(&[0u8; 32], &[0u8; AEAD_TAG_SIZE - 1], &[0u8; 12], &[]);
        assert_eq!(result.unwrap_err(), CryptoError::DecryptionFailed);
    }
}
