//! Field masking.
//!
//! Masking XORs selected frame fields against a byte or a repeating byte
//! sequence. It hides structure from casual inspection and is not a security
//! boundary. Applying a mask twice restores the input.

use std::fmt;

use zeroize::Zeroize;

use crate::core::{JetError, Result, DEFAULT_MASK_BYTE};

/// Mask applied to payload, ciphertext, MAC and nonce fields.
#[derive(Clone, PartialEq, Eq)]
pub enum Mask {
    /// XOR every byte with the same value.
    Byte(u8),
    /// XOR with the sequence, repeated cyclically.
    Sequence(Vec<u8>),
}

impl Mask {
    /// Reject masks that cannot be applied.
    pub fn validate(&self) -> Result<()> {
        match self {
            Mask::Sequence(seq) if seq.is_empty() => {
                Err(JetError::Config("mask sequence must not be empty".into()))
            }
            _ => Ok(()),
        }
    }

    /// Mask `data` in place.
    pub fn apply_in_place(&self, data: &mut [u8]) {
        match self {
            Mask::Byte(b) => data.iter_mut().for_each(|d| *d ^= b),
            Mask::Sequence(seq) if !seq.is_empty() => data
                .iter_mut()
                .zip(seq.iter().cycle())
                .for_each(|(d, m)| *d ^= m),
            Mask::Sequence(_) => {}
        }
    }

    /// Return a masked copy of `data`.
    pub fn apply(&self, data: &[u8]) -> Vec<u8> {
        let mut out = data.to_vec();
        self.apply_in_place(&mut out);
        out
    }
}

impl Default for Mask {
    fn default() -> Self {
        Mask::Byte(DEFAULT_MASK_BYTE)
    }
}

impl From<u8> for Mask {
    fn from(b: u8) -> Self {
        Mask::Byte(b)
    }
}

impl From<Vec<u8>> for Mask {
    fn from(seq: Vec<u8>) -> Self {
        Mask::Sequence(seq)
    }
}

impl From<&[u8]> for Mask {
    fn from(seq: &[u8]) -> Self {
        Mask::Sequence(seq.to_vec())
    }
}

impl fmt::Debug for Mask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mask::Byte(_) => f.write_str("Mask::Byte(..)"),
            Mask::Sequence(seq) => write!(f, "Mask::Sequence({} bytes)", seq.len()),
        }
    }
}

impl Drop for Mask {
    fn drop(&mut self) {
        match self {
            Mask::Byte(b) => b.zeroize(),
            Mask::Sequence(seq) => seq.zeroize(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_mask() {
        let mask = Mask::default();
        assert_eq!(mask.apply(&[0x00, 0xA5, 0xFF]), [0xA5, 0x00, 0x5A]);
    }

    #[test]
    fn test_sequence_mask_cycles() {
        let mask = Mask::from(vec![0x01, 0x02]);
        assert_eq!(mask.apply(&[0, 0, 0, 0, 0]), [1, 2, 1, 2, 1]);
    }

    #[test]
    fn test_mask_is_involution() {
        let data = b"SERVERJET0ENVPKT payload".to_vec();
        for mask in [Mask::Byte(0x3C), Mask::from(&b"k3y"[..])] {
            assert_eq!(mask.apply(&mask.apply(&data)), data);
        }
    }

    #[test]
    fn test_validate() {
        assert!(Mask::Byte(0).validate().is_ok());
        assert!(Mask::Sequence(vec![7]).validate().is_ok());
        assert!(matches!(
            Mask::Sequence(Vec::new()).validate(),
            Err(JetError::Config(_))
        ));
    }

    #[test]
    fn test_debug_hides_mask() {
        assert_eq!(format!("{:?}", Mask::Byte(0x42)), "Mask::Byte(..)");
    }
}
