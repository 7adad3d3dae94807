//! Envelope protocol engine.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace, warn};
use zeroize::Zeroizing;

use crate::clock::{ClockSource, SystemClock};
use crate::core::{
    JetError, Result, AEAD_NONCE_SIZE, COMPRESSION_FLAG_NONE, FLAG_SIGNED, FLAG_UNSIGNED,
    HEADER_COMPRESSION, HEADER_TRANSFER_ENCODING, HEADER_VERSION, MIN_TRANSPORT_KEY_SIZE,
    REPLAY_TTL_WINDOWS,
};
use crate::crypto::{
    aead_decrypt, aead_encrypt, constant_time_eq, random_bytes, truncated_mac, TransportKeys,
};
use crate::encoding::TextEncoding;
use crate::payload::{Payload, PayloadInput};
use crate::replay::ReplayStore;

use super::config::{EnvelopeBuilder, EnvelopeConfig, ProtocolVersion};
use super::frame::{Frame, FrameHeader};
use super::mask::Mask;

/// Secrets dropped on dispose.
struct Secrets {
    transport_key: Option<Zeroizing<Vec<u8>>>,
    mask: Mask,
}

/// A protocol instance bound to one transport configuration.
///
/// Encode and decode take `&self`, so an envelope can be shared behind an
/// [`Arc`]. After [`Envelope::dispose`] every operation fails with
/// [`JetError::Disposed`].
pub struct Envelope {
    version: ProtocolVersion,
    allowed_window: u64,
    bypass_signature: bool,
    require_encryption: bool,
    key_context: Option<Vec<u8>>,
    storage_prefix: String,
    replay_store: Box<dyn ReplayStore>,
    clock: Arc<dyn ClockSource>,
    secrets: RwLock<Option<Arc<Secrets>>>,
}

impl Envelope {
    /// Validate `config` and build an envelope.
    ///
    /// # Errors
    /// Returns `WeakTransportKey` for a key shorter than 64 bytes and
    /// `Config` for an empty mask sequence.
    pub fn new(config: EnvelopeConfig) -> Result<Self> {
        if let Some(key) = &config.transport_key {
            if key.len() < MIN_TRANSPORT_KEY_SIZE {
                return Err(JetError::WeakTransportKey {
                    len: key.len(),
                    min: MIN_TRANSPORT_KEY_SIZE,
                });
            }
        }
        config.mask.validate()?;

        let allowed_window = config.effective_window();
        let storage_prefix = config.resolved_storage_prefix();

        debug!(
            version = %config.version,
            allowed_window,
            encrypted = config.transport_key.is_some(),
            bypass_signature = config.bypass_signature,
            "envelope created"
        );

        let EnvelopeConfig {
            version,
            transport_key,
            mask,
            replay_store,
            clock,
            bypass_signature,
            key_context,
            require_encryption,
            ..
        } = config;

        Ok(Self {
            version,
            allowed_window,
            bypass_signature,
            require_encryption,
            key_context,
            replay_store: replay_store.into_store(storage_prefix.clone()),
            storage_prefix,
            clock,
            secrets: RwLock::new(Some(Arc::new(Secrets {
                transport_key: transport_key.map(Zeroizing::new),
                mask,
            }))),
        })
    }

    /// Start building an envelope.
    pub fn builder() -> EnvelopeBuilder {
        EnvelopeBuilder::new()
    }

    /// Configured protocol version.
    pub fn version(&self) -> Result<ProtocolVersion> {
        self.secrets()?;
        Ok(self.version.clone())
    }

    /// Allowed clock skew in seconds.
    pub fn allowed_window(&self) -> Result<u64> {
        self.secrets()?;
        Ok(self.allowed_window)
    }

    /// Key prefix used with an external replay store.
    pub fn storage_prefix(&self) -> Result<&str> {
        self.secrets()?;
        Ok(&self.storage_prefix)
    }

    /// Whether a transport key is configured.
    pub fn is_encrypted(&self) -> Result<bool> {
        Ok(self.secrets()?.transport_key.is_some())
    }

    /// Whether [`Envelope::dispose`] has run.
    pub fn is_disposed(&self) -> bool {
        self.secrets.read().is_none()
    }

    /// Informational headers for an outer transport.
    ///
    /// `encoding` names the transfer encoding the frame will travel in;
    /// `None` means raw binary.
    pub fn headers(
        &self,
        encoding: Option<TextEncoding>,
    ) -> Result<Vec<(&'static str, String)>> {
        self.secrets()?;
        Ok(vec![
            (HEADER_VERSION, self.version.to_string().trim().to_string()),
            (HEADER_COMPRESSION, COMPRESSION_FLAG_NONE.to_string()),
            (
                HEADER_TRANSFER_ENCODING,
                encoding.map_or("binary", TextEncoding::name).to_string(),
            ),
        ])
    }

    /// Encode a payload into a binary frame.
    pub async fn encode(&self, input: impl Into<PayloadInput>) -> Result<Vec<u8>> {
        let secrets = self.secrets()?;
        let canonical = input.into().into_payload()?.to_bytes()?;

        let sign_flag = if self.bypass_signature {
            FLAG_UNSIGNED
        } else {
            FLAG_SIGNED
        };

        let frame = match &secrets.transport_key {
            None => Frame::Plain {
                version: self.version.clone(),
                sign_flag,
                payload: canonical,
            },
            Some(key) => self.seal(key, sign_flag, &canonical).await?,
        };

        let bytes = frame.write(&secrets.mask)?;
        trace!(frame_len = bytes.len(), sealed = frame.is_sealed(), "encoded frame");
        Ok(bytes)
    }

    /// Encode a payload and render the frame as text.
    pub async fn encode_text(
        &self,
        input: impl Into<PayloadInput>,
        encoding: TextEncoding,
    ) -> Result<String> {
        let bytes = self.encode(input).await?;
        Ok(encoding.encode(&bytes))
    }

    /// Decode a binary frame.
    pub async fn decode(&self, packet: &[u8]) -> Result<Payload> {
        let secrets = self.secrets()?;
        trace!(frame_len = packet.len(), "decoding frame");

        match Frame::read(packet, &secrets.mask)? {
            Frame::Plain { payload, .. } => {
                if self.require_encryption {
                    return Err(JetError::InvalidArgument(
                        "plain frame refused: encryption is required".into(),
                    ));
                }
                Payload::from_bytes(&payload)
            }
            Frame::Sealed {
                sign_flag,
                header,
                ciphertext,
                mac,
                nonce,
                ..
            } => {
                let key = secrets
                    .transport_key
                    .as_ref()
                    .ok_or(JetError::MissingTransportKey)?;
                self.open(key, sign_flag, header, &ciphertext, &mac, &nonce)
                    .await
            }
        }
    }

    /// Decode a frame rendered as text.
    pub async fn decode_text(&self, packet: &str, encoding: TextEncoding) -> Result<Payload> {
        self.secrets()?;
        let bytes = encoding.decode(packet)?;
        self.decode(&bytes).await
    }

    /// Release secrets and clear this envelope's replay store. Idempotent.
    pub fn dispose(&self) {
        let secrets = self.secrets.write().take();
        if secrets.is_some() {
            self.replay_store.purge();
            debug!(version = %self.version, "envelope disposed");
        }
    }

    async fn seal(&self, key: &[u8], sign_flag: u8, plaintext: &[u8]) -> Result<Frame> {
        let nonce = random_bytes::<AEAD_NONCE_SIZE>();
        let header = FrameHeader::new(self.timestamp().await?)?;
        let aad = header.to_bytes();

        let keys = TransportKeys::derive(key, self.key_context.as_deref())?;
        let ciphertext = aead_encrypt(keys.encryption_key(), plaintext, &nonce, &aad)?;
        let mac = truncated_mac(keys.signing_key(), &[&aad, &nonce, &ciphertext])?;

        Ok(Frame::Sealed {
            version: self.version.clone(),
            sign_flag,
            header,
            ciphertext,
            mac: mac.to_vec(),
            nonce,
        })
    }

    async fn open(
        &self,
        key: &[u8],
        sign_flag: u8,
        header: FrameHeader,
        ciphertext: &[u8],
        mac: &[u8],
        nonce: &[u8; AEAD_NONCE_SIZE],
    ) -> Result<Payload> {
        let now = self.check_window(&header).await?;
        self.check_replay(nonce, now).await?;

        let aad = header.to_bytes();
        let keys = TransportKeys::derive(key, self.key_context.as_deref())?;

        if sign_flag == FLAG_SIGNED {
            let expected = truncated_mac(keys.signing_key(), &[&aad, nonce, ciphertext])?;
            if !constant_time_eq(&expected, mac) {
                return Err(JetError::InvalidSignature);
            }
        }

        let plaintext = Zeroizing::new(aead_decrypt(
            keys.encryption_key(),
            ciphertext,
            nonce,
            &aad,
        )?);
        Payload::from_bytes(&plaintext)
    }

    async fn check_window(&self, header: &FrameHeader) -> Result<u64> {
        let now = self.timestamp().await?;
        let skew = now.abs_diff(u64::from(header.timestamp));

        if skew > self.allowed_window {
            warn!(skew, allowed = self.allowed_window, "packet window expired");
            return Err(JetError::WindowExpired {
                skew,
                allowed: self.allowed_window,
            });
        }
        Ok(now)
    }

    async fn check_replay(&self, nonce: &[u8], now: u64) -> Result<()> {
        let key = hex::encode(nonce);
        let ttl = self.allowed_window.saturating_mul(REPLAY_TTL_WINDOWS);

        if !self.replay_store.insert_if_absent(&key, now, ttl).await? {
            warn!(nonce = %key, "packet nonce refused by replay protection");
            return Err(JetError::ReplayRejected);
        }
        Ok(())
    }

    async fn timestamp(&self) -> Result<u64> {
        match self.clock.now().await {
            Ok(now) => Ok(now),
            Err(err) => {
                warn!(error = %err, "clock source failed, falling back to system clock");
                Ok(SystemClock::unix_seconds()?)
            }
        }
    }

    fn secrets(&self) -> Result<Arc<Secrets>> {
        self.secrets.read().clone().ok_or(JetError::Disposed)
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("version", &self.version)
            .field("allowed_window", &self.allowed_window)
            .field("bypass_signature", &self.bypass_signature)
            .field("require_encryption", &self.require_encryption)
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}
