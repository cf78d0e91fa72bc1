//! AES-CTR keystream with a full 128-bit big-endian counter

use aes::{Aes128, Aes256};
use ctr::cipher::{KeyIvInit, StreamCipher};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::block::Block;
use crate::error::{CryptoError, CryptoResult};

type Aes128Ctr = ctr::Ctr128BE<Aes128>;
type Aes256Ctr = ctr::Ctr128BE<Aes256>;

/// The CTR half of an SIV key. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub enum CtrKey {
    Aes128([u8; 16]),
    Aes256([u8; 32]),
}

impl CtrKey {
    pub fn new(key: &[u8]) -> CryptoResult<Self> {
        match key.len() {
            16 => {
                let mut bytes = [0u8; 16];
                bytes.copy_from_slice(key);
                Ok(Self::Aes128(bytes))
            }
            32 => {
                let mut bytes = [0u8; 32];
                bytes.copy_from_slice(key);
                Ok(Self::Aes256(bytes))
            }
            got => Err(CryptoError::InvalidKeyLength {
                what: "CTR key",
                expected: "16 or 32",
                got,
            }),
        }
    }

    /// XOR the keystream starting at `iv` into `buf`. Encrypt and decrypt are
    /// the same operation.
    pub fn apply_keystream(&self, iv: &Block, buf: &mut [u8]) {
        let iv = iv.as_bytes();
        match self {
            Self::Aes128(key) => Aes128Ctr::new(key.into(), iv.into()).apply_keystream(buf),
            Self::Aes256(key) => Aes256Ctr::new(key.into(), iv.into()).apply_keystream(buf),
        }
    }
}

impl std::fmt::Debug for CtrKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let width = match self {
            Self::Aes128(_) => "AES-128",
            Self::Aes256(_) => "AES-256",
        };
        f.debug_tuple("CtrKey").field(&width).finish()
    }
}
