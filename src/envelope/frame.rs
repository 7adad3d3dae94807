//! Wire frame layout.
//!
//! Every field is written with the type-tagged codec, in this order:
//!
//! ```text
//! plain:  [magic][version][enc = 0][sign][mask(payload)]
//! sealed: [magic][version][enc = 1][sign][header][mask(ct)][mask(mac)][mask(nonce)]
//! ```
//!
//! Magic and header are byte fields written unmasked.

use crate::codec::{deserialize, serialize, tag, BinaryReader, BinaryWriter};
use crate::core::{
    CodecError, JetError, Result, AEAD_NONCE_SIZE, FLAG_ENCRYPTED, FLAG_PLAIN, HEADER_SIZE,
    KEY_VERSION, MAGIC,
};
use crate::crypto::constant_time_eq;

use super::config::ProtocolVersion;
use super::mask::Mask;

/// Per-packet header, authenticated as AEAD associated data.
///
/// Byte 0 is the key version, bytes 1..5 the big-endian Unix timestamp and
/// byte 5 repeats the low byte of the timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Key version.
    pub key_version: u8,
    /// Unix seconds.
    pub timestamp: u32,
    /// Trailing copy of the timestamp's low byte.
    pub trailer: u8,
}

impl FrameHeader {
    /// Header for the current key version.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if `timestamp` does not fit in 32 bits,
    /// which usually means the clock reports milliseconds.
    pub fn new(timestamp: u64) -> Result<Self> {
        let timestamp = u32::try_from(timestamp).map_err(|_| {
            JetError::InvalidArgument(format!(
                "timestamp {timestamp} does not fit the 32-bit header field"
            ))
        })?;
        Ok(Self {
            key_version: KEY_VERSION,
            timestamp,
            trailer: (timestamp & 0xFF) as u8,
        })
    }

    /// Serialize to the 6-byte wire form.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0] = self.key_version;
        out[1..5].copy_from_slice(&self.timestamp.to_be_bytes());
        out[5] = self.trailer;
        out
    }

    /// Parse the 6-byte wire form.
    ///
    /// The trailer is carried as-is; it is covered by the AEAD tag and MAC.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != HEADER_SIZE {
            return Err(JetError::InvalidArgument(format!(
                "frame header must be {HEADER_SIZE} bytes, got {}",
                bytes.len()
            )));
        }

        Ok(Self {
            key_version: bytes[0],
            timestamp: u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]),
            trailer: bytes[5],
        })
    }
}

/// A parsed envelope frame with its masked fields already unmasked.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Payload carried in the clear.
    Plain {
        /// Sender's protocol version.
        version: ProtocolVersion,
        /// Signature flag as sent.
        sign_flag: u8,
        /// Canonical payload bytes.
        payload: Vec<u8>,
    },
    /// Payload sealed with AES-256-GCM.
    Sealed {
        /// Sender's protocol version.
        version: ProtocolVersion,
        /// Signature flag as sent.
        sign_flag: u8,
        /// Packet header.
        header: FrameHeader,
        /// Ciphertext with the AEAD tag appended.
        ciphertext: Vec<u8>,
        /// Truncated HMAC.
        mac: Vec<u8>,
        /// AEAD nonce.
        nonce: [u8; AEAD_NONCE_SIZE],
    },
}

impl Frame {
    /// Write the frame, masking the masked fields with `mask`.
    pub fn write(&self, mask: &Mask) -> Result<Vec<u8>> {
        let mut writer = BinaryWriter::new();
        self.write_fields(&mut writer, mask).map_err(|e| {
            JetError::InvalidType(format!("frame cannot be encoded: {e}"))
        })?;
        Ok(writer.drain())
    }

    fn write_fields(
        &self,
        writer: &mut BinaryWriter,
        mask: &Mask,
    ) -> std::result::Result<(), CodecError> {
        serialize(writer, &MAGIC[..])?;
        match self {
            Frame::Plain {
                version,
                sign_flag,
                payload,
            } => {
                write_version(writer, version)?;
                serialize(writer, &FLAG_PLAIN)?;
                serialize(writer, sign_flag)?;
                writer.write_bytes(&mask.apply(payload))?;
            }
            Frame::Sealed {
                version,
                sign_flag,
                header,
                ciphertext,
                mac,
                nonce,
            } => {
                write_version(writer, version)?;
                serialize(writer, &FLAG_ENCRYPTED)?;
                serialize(writer, sign_flag)?;
                writer.write_bytes(&header.to_bytes())?;
                writer.write_bytes(&mask.apply(ciphertext))?;
                writer.write_bytes(&mask.apply(mac))?;
                writer.write_bytes(&mask.apply(nonce))?;
            }
        }
        Ok(())
    }

    /// Parse a frame and unmask its fields.
    ///
    /// The magic is compared in constant time. Any flag other than
    /// encrypted is read as a plain frame. Trailing bytes are ignored.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for a bad magic or any unreadable field.
    pub fn read(bytes: &[u8], mask: &Mask) -> Result<Self> {
        let mut reader = BinaryReader::new(bytes);

        let magic = reader.read_bytes().map_err(invalid)?;
        if !constant_time_eq(&magic, &MAGIC) {
            return Err(JetError::InvalidArgument(
                "the provided packet does not appear to be a transport envelope".into(),
            ));
        }

        let version = read_version(&mut reader).map_err(invalid)?;
        let enc_flag = read_flag(&mut reader)?;
        let sign_flag = read_flag(&mut reader)?;

        if enc_flag != FLAG_ENCRYPTED {
            let mut payload = reader.read_bytes().map_err(invalid)?;
            mask.apply_in_place(&mut payload);
            return Ok(Frame::Plain {
                version,
                sign_flag,
                payload,
            });
        }

        let header = FrameHeader::from_bytes(&reader.read_bytes().map_err(invalid)?)?;
        let mut ciphertext = reader.read_bytes().map_err(invalid)?;
        let mut mac = reader.read_bytes().map_err(invalid)?;
        let mut raw_nonce = reader.read_bytes().map_err(invalid)?;
        mask.apply_in_place(&mut ciphertext);
        mask.apply_in_place(&mut mac);
        mask.apply_in_place(&mut raw_nonce);

        let nonce: [u8; AEAD_NONCE_SIZE] = raw_nonce.as_slice().try_into().map_err(|_| {
            JetError::InvalidArgument(format!(
                "nonce must be {AEAD_NONCE_SIZE} bytes, got {}",
                raw_nonce.len()
            ))
        })?;

        Ok(Frame::Sealed {
            version,
            sign_flag,
            header,
            ciphertext,
            mac,
            nonce,
        })
    }

    /// Whether this frame is AEAD sealed.
    pub fn is_sealed(&self) -> bool {
        matches!(self, Frame::Sealed { .. })
    }
}

fn invalid(err: CodecError) -> JetError {
    JetError::InvalidArgument(format!("malformed frame: {err}"))
}

fn write_version(
    writer: &mut BinaryWriter,
    version: &ProtocolVersion,
) -> std::result::Result<(), CodecError> {
    match version {
        ProtocolVersion::Text(text) => writer.write_text(text),
        ProtocolVersion::Number(n) => {
            writer.write_int(*n);
            Ok(())
        }
    }
}

fn read_version(reader: &mut BinaryReader<'_>) -> std::result::Result<ProtocolVersion, CodecError> {
    match reader.peek_tag()? {
        tag::INT => reader.read_int().map(ProtocolVersion::Number),
        _ => reader.read_text().map(ProtocolVersion::Text),
    }
}

fn read_flag(reader: &mut BinaryReader<'_>) -> Result<u8> {
    deserialize::<u8>(reader).map_err(invalid)
}
