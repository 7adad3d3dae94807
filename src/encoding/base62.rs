//! Base62 over arbitrary-length input.
//!
//! The input is one big-endian integer converted by long multiplication,
//! so the cost is quadratic in the input length. Each leading zero byte is
//! written as a leading `'0'`.

use crate::core::EncodingError;

const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Encode bytes as base62 text.
pub fn encode(data: &[u8]) -> String {
    let zeros = data.iter().take_while(|&&b| b == 0).count();

    // Base-62 digits, least significant first.
    let mut digits: Vec<u8> = Vec::with_capacity(data.len() * 138 / 100 + 1);
    for &byte in &data[zeros..] {
        let mut carry = u32::from(byte);
        for digit in digits.iter_mut() {
            carry += u32::from(*digit) << 8;
            *digit = (carry % 62) as u8;
            carry /= 62;
        }
        while carry > 0 {
            digits.push((carry % 62) as u8);
            carry /= 62;
        }
    }

    let mut out = String::with_capacity(zeros + digits.len());
    out.extend(std::iter::repeat_n('0', zeros));
    out.extend(digits.iter().rev().map(|&d| ALPHABET[d as usize] as char));
    out
}

/// Decode base62 text back to bytes.
pub fn decode(text: &str) -> Result<Vec<u8>, EncodingError> {
    let zeros = text.bytes().take_while(|&c| c == b'0').count();

    // Base-256 digits, least significant first.
    let mut bytes: Vec<u8> = Vec::with_capacity(text.len());
    for (pos, c) in text.bytes().enumerate().skip(zeros) {
        let mut carry = index_of(c).ok_or_else(|| EncodingError::Malformed {
            encoding: "base62",
            reason: format!("invalid character at position {pos}"),
        })?;
        for byte in bytes.iter_mut() {
            carry += u32::from(*byte) * 62;
            *byte = (carry & 0xFF) as u8;
            carry >>= 8;
        }
        while carry > 0 {
            bytes.push((carry & 0xFF) as u8);
            carry >>= 8;
        }
    }

    let mut out = vec![0u8; zeros];
    out.extend(bytes.iter().rev());
    Ok(out)
}

fn index_of(c: u8) -> Option<u32> {
    let idx = match c {
        b'0'..=b'9' => c - b'0',
        b'A'..=b'Z' => c - b'A' + 10,
        b'a'..=b'z' => c - b'a' + 36,
        _ => return None,
    };
    Some(u32::from(idx))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        assert_eq!(encode(&[]), "");
        assert_eq!(decode("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_all_zero() {
        assert_eq!(encode(&[0, 0, 0]), "000");
        assert_eq!(decode("000").unwrap(), [0, 0, 0]);
    }

    #[test]
    fn test_zero_prefixed() {
        let data = [0x00, 0x00, 0x01, 0x00];
        let text = encode(&data);
        assert_eq!(text, "0048");
        assert_eq!(decode(&text).unwrap(), data);
    }

    #[test]
    fn test_known_values() {
        assert_eq!(encode(&[61]), "z");
        assert_eq!(encode(&[62]), "10");
        assert_eq!(encode(&[0xFF]), "47");
        assert_eq!(encode(b"hello"), "7tQLFHz");
        assert_eq!(decode("7tQLFHz").unwrap(), b"hello");
    }

    #[test]
    fn test_alphabet_order() {
        for (i, &c) in ALPHABET.iter().enumerate() {
            assert_eq!(index_of(c), Some(i as u32));
        }
        assert_eq!(index_of(b'+'), None);
    }

    #[test]
    fn test_invalid_character() {
        let err = decode("12!").unwrap_err();
        assert!(matches!(err, EncodingError::Malformed { encoding: "base62", .. }));
    }
}
