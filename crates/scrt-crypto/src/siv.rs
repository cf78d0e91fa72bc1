//! AES-SIV deterministic authenticated encryption (RFC 5297)
//!
//! Sealed format (binary):
//! ```text
//! [16 bytes: synthetic IV / tag][N bytes: AES-CTR ciphertext]
//! ```
//!
//! The tag is the S2V (CMAC chain) of the associated data items followed by
//! the plaintext, and doubles as the CTR IV once bits 63 and 31 are cleared.
//! A 32-byte key gives AES-128-SIV, a 64-byte key AES-256-SIV.

use constant_time_eq::constant_time_eq;
use zeroize::{Zeroize, Zeroizing};

use crate::block::{Block, BLOCK_SIZE};
use crate::error::{CryptoError, CryptoResult};
use crate::keystream::CtrKey;
use crate::mac::CmacAes;
use crate::TAG_SIZE;

/// S2V accepts at most 127 vectors; the plaintext takes one slot.
pub const MAX_ASSOCIATED_DATA: usize = 126;

/// A keyed AES-SIV instance. Holds nothing but the two sub-keys, so `seal`
/// and `open` are pure functions of their arguments.
///
/// Only raw key bytes are kept; AES key schedules live for a single call
/// and are wiped when dropped.
#[derive(Clone)]
pub struct SivCipher {
    mac_key: Zeroizing<Vec<u8>>,
    ctr: CtrKey,
}

impl SivCipher {
    /// Import a 32- or 64-byte key: first half MAC key, second half CTR key.
    pub fn new(key: &[u8]) -> CryptoResult<Self> {
        let (mac_key, ctr_key) = split_key(key)?;
        Ok(Self {
            mac_key: Zeroizing::new(mac_key.to_vec()),
            ctr: CtrKey::new(ctr_key)?,
        })
    }

    /// Encrypt `plaintext`, authenticating it together with each item of
    /// `associated_data` in order. Returns `tag || ciphertext`.
    pub fn seal<A: AsRef<[u8]>>(
        &self,
        plaintext: &[u8],
        associated_data: &[A],
    ) -> CryptoResult<Vec<u8>> {
        let tag = self.s2v(plaintext, associated_data)?;

        let mut sealed = Vec::with_capacity(TAG_SIZE + plaintext.len());
        sealed.extend_from_slice(tag.as_bytes());
        sealed.extend_from_slice(plaintext);
        self.ctr
            .apply_keystream(&ctr_iv(&tag), &mut sealed[TAG_SIZE..]);
        Ok(sealed)
    }

    /// Decrypt and verify `tag || ciphertext`. On a tag mismatch the
    /// decrypted candidate is wiped and never returned.
    pub fn open<A: AsRef<[u8]>>(
        &self,
        sealed: &[u8],
        associated_data: &[A],
    ) -> CryptoResult<Vec<u8>> {
        if sealed.len() < TAG_SIZE {
            return Err(CryptoError::CiphertextTruncated {
                len: sealed.len(),
                min: TAG_SIZE,
            });
        }

        let (tag_bytes, body) = sealed.split_at(TAG_SIZE);
        let tag = Block::from_slice(tag_bytes);

        let mut candidate = body.to_vec();
        self.ctr.apply_keystream(&ctr_iv(&tag), &mut candidate);

        let expected = match self.s2v(&candidate, associated_data) {
            Ok(expected) => expected,
            Err(e) => {
                candidate.zeroize();
                return Err(e);
            }
        };

        if !constant_time_eq(expected.as_bytes(), tag.as_bytes()) {
            candidate.zeroize();
            return Err(CryptoError::AuthenticationFailure);
        }

        Ok(candidate)
    }

    fn s2v<A: AsRef<[u8]>>(&self, plaintext: &[u8], associated_data: &[A]) -> CryptoResult<Block> {
        if associated_data.len() > MAX_ASSOCIATED_DATA {
            return Err(CryptoError::TooManyAssociatedData {
                got: associated_data.len(),
                max: MAX_ASSOCIATED_DATA,
            });
        }

        let mut mac = CmacAes::new(&self.mac_key)?;
        let mut d = mac.mac(&[0u8; BLOCK_SIZE]);

        for item in associated_data {
            d.dbl();
            d.xor(&mac.mac(item.as_ref()));
        }

        mac.reset();
        if plaintext.len() >= BLOCK_SIZE {
            // xorend: fold D into the final 16 bytes, no padding needed
            let (head, tail) = plaintext.split_at(plaintext.len() - BLOCK_SIZE);
            let mut last = Block::from_slice(tail);
            last.xor(&d);
            mac.update(head);
            mac.update(last.as_bytes());
        } else {
            d.dbl();
            let mut last = Block::padded(plaintext);
            last.xor(&d);
            mac.update(last.as_bytes());
        }

        Ok(mac.finish())
    }
}

impl std::fmt::Debug for SivCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SivCipher")
            .field("mac_key", &"[REDACTED]")
            .field("ctr", &self.ctr)
            .finish()
    }
}

/// Split an SIV key exactly in half: (MAC key, CTR key).
pub fn split_key(key: &[u8]) -> CryptoResult<(&[u8], &[u8])> {
    match key.len() {
        32 | 64 => Ok(key.split_at(key.len() / 2)),
        got => Err(CryptoError::InvalidKeyLength {
            what: "SIV key",
            expected: "32 or 64",
            got,
        }),
    }
}

/// Derive the CTR IV from a tag by clearing the top bit of the last two
/// 32-bit words, so the counter can never carry across them.
pub fn ctr_iv(tag: &Block) -> Block {
    let mut iv = tag.clone();
    let bytes = iv.as_mut_bytes();
    bytes[BLOCK_SIZE - 8] &= 0x7f;
    bytes[BLOCK_SIZE - 4] &= 0x7f;
    iv
}
