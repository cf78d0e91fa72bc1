//! Encrypted message wire format
//!
//! ```text
//! [32 bytes: nonce][32 bytes: sender X25519 public key][16 bytes: SIV tag][N bytes: body]
//! ```
//!
//! Everything after the 64-byte prefix is plain RFC 5297 output; the prefix
//! lets the enclave rebuild the tx key from its own private key.

use crate::error::{CryptoError, CryptoResult};
use crate::{KEY_SIZE, NONCE_SIZE, TAG_SIZE};

/// Bytes before the SIV output
pub const PREFIX_SIZE: usize = NONCE_SIZE + KEY_SIZE;

/// Smallest valid message: prefix plus a bare tag (empty plaintext)
pub const MIN_MESSAGE_SIZE: usize = PREFIX_SIZE + TAG_SIZE;

/// Borrowed view over a complete encrypted message
#[derive(Debug, Clone, Copy)]
pub struct SealedMessage<'a> {
    bytes: &'a [u8],
}

impl<'a> SealedMessage<'a> {
    pub fn parse(bytes: &'a [u8]) -> CryptoResult<Self> {
        if bytes.len() < MIN_MESSAGE_SIZE {
            return Err(CryptoError::CiphertextTruncated {
                len: bytes.len(),
                min: MIN_MESSAGE_SIZE,
            });
        }
        Ok(Self { bytes })
    }

    pub fn nonce(&self) -> [u8; NONCE_SIZE] {
        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&self.bytes[..NONCE_SIZE]);
        nonce
    }

    pub fn sender_public_key(&self) -> [u8; KEY_SIZE] {
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&self.bytes[NONCE_SIZE..PREFIX_SIZE]);
        key
    }

    /// SIV output: `tag || body`
    pub fn sealed(&self) -> &'a [u8] {
        &self.bytes[PREFIX_SIZE..]
    }

    pub fn tag(&self) -> &'a [u8] {
        &self.bytes[PREFIX_SIZE..MIN_MESSAGE_SIZE]
    }

    pub fn body(&self) -> &'a [u8] {
        &self.bytes[MIN_MESSAGE_SIZE..]
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }
}

/// Concatenate `nonce || sender_public_key || sealed`.
pub fn assemble(
    nonce: &[u8; NONCE_SIZE],
    sender_public_key: &[u8; KEY_SIZE],
    sealed: &[u8],
) -> Vec<u8> {
    let mut out = Vec::with_capacity(PREFIX_SIZE + sealed.len());
    out.extend_from_slice(nonce);
    out.extend_from_slice(sender_public_key);
    out.extend_from_slice(sealed);
    out
}
