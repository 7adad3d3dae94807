//! Key derivation.

use std::fmt;

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::core::{
    CryptoError, DERIVED_KEY_MATERIAL_SIZE, ENCRYPTION_KEY_SIZE, HKDF_SALT, SIGNING_KEY_SIZE,
};

/// Derive `len` bytes from `master` with HKDF-SHA256 and the fixed zero salt.
///
/// `info` binds the output to a context; `None` is the empty context.
pub fn derive_keys(
    master: &[u8],
    info: Option<&[u8]>,
    len: usize,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let hk = Hkdf::<Sha256>::new(Some(&HKDF_SALT[..]), master);
    let mut okm = Zeroizing::new(vec![0u8; len]);
    hk.expand(info.unwrap_or_default(), okm.as_mut_slice())
        .map_err(|_| CryptoError::KeyDerivationFailed)?;
    Ok(okm)
}

/// Per-packet key pair derived from the transport key.
///
/// Both keys are zeroized on drop.
pub struct TransportKeys {
    encryption: Zeroizing<[u8; ENCRYPTION_KEY_SIZE]>,
    signing: Zeroizing<[u8; SIGNING_KEY_SIZE]>,
}

impl TransportKeys {
    /// Derive the encryption key (first 32 bytes) and signing key (next 32).
    pub fn derive(master: &[u8], info: Option<&[u8]>) -> Result<Self, CryptoError> {
        let okm = derive_keys(master, info, DERIVED_KEY_MATERIAL_SIZE)?;

        let mut encryption = Zeroizing::new([0u8; ENCRYPTION_KEY_SIZE]);
        let mut signing = Zeroizing::new([0u8; SIGNING_KEY_SIZE]);
        encryption.copy_from_slice(&okm[..ENCRYPTION_KEY_SIZE]);
        signing.copy_from_slice(&okm[ENCRYPTION_KEY_SIZE..]);

        Ok(Self {
            encryption,
            signing,
        })
    }

    /// AES-256-GCM key.
    pub fn encryption_key(&self) -> &[u8; ENCRYPTION_KEY_SIZE] {
        &self.encryption
    }

    /// HMAC-SHA256 key.
    pub fn signing_key(&self) -> &[u8; SIGNING_KEY_SIZE] {
        &self.signing
    }
}

impl fmt::Debug for TransportKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportKeys").finish_non_exhaustive()
    }
}
