//! AES-CMAC (RFC 4493) keyed with AES-128 or AES-256
//!
//! Thin stateful wrapper over the `cmac` crate so S2V can reset, feed and
//! finish the MAC without caring which AES width the key selected.

use aes::{Aes128, Aes256};
use ::cmac::{Cmac, Mac};

use crate::block::{Block, BLOCK_SIZE};
use crate::error::{CryptoError, CryptoResult};

/// With the `zeroize` features of `aes` and `cmac` enabled, the expanded key
/// schedule is wiped when the MAC is dropped.
pub enum CmacAes {
    Aes128(Cmac<Aes128>),
    Aes256(Cmac<Aes256>),
}

impl CmacAes {
    /// Key a new MAC. 16-byte keys select AES-128, 32-byte keys AES-256.
    pub fn new(key: &[u8]) -> CryptoResult<Self> {
        let invalid = |_| CryptoError::InvalidKeyLength {
            what: "CMAC key",
            expected: "16 or 32",
            got: key.len(),
        };
        match key.len() {
            16 => Ok(Self::Aes128(
                <Cmac<Aes128> as Mac>::new_from_slice(key).map_err(invalid)?,
            )),
            32 => Ok(Self::Aes256(
                <Cmac<Aes256> as Mac>::new_from_slice(key).map_err(invalid)?,
            )),
            got => Err(CryptoError::InvalidKeyLength {
                what: "CMAC key",
                expected: "16 or 32",
                got,
            }),
        }
    }

    pub fn reset(&mut self) {
        match self {
            Self::Aes128(mac) => Mac::reset(mac),
            Self::Aes256(mac) => Mac::reset(mac),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::Aes128(mac) => mac.update(data),
            Self::Aes256(mac) => mac.update(data),
        }
    }

    /// Finish the MAC and leave the state reset for the next message.
    pub fn finish(&mut self) -> Block {
        let tag = match self {
            Self::Aes128(mac) => mac.finalize_reset().into_bytes(),
            Self::Aes256(mac) => mac.finalize_reset().into_bytes(),
        };
        debug_assert_eq!(tag.len(), BLOCK_SIZE);
        Block::from_slice(&tag)
    }

    /// One-shot MAC over `data`, discarding any buffered input first.
    pub fn mac(&mut self, data: &[u8]) -> Block {
        self.reset();
        self.update(data);
        self.finish()
    }
}

impl std::fmt::Debug for CmacAes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let width = match self {
            Self::Aes128(_) => "AES-128",
            Self::Aes256(_) => "AES-256",
        };
        f.debug_tuple("CmacAes").field(&width).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 4493 section 4 key
    const KEY: [u8; 16] = [
        0x2b, 0x7e, 0x15, 0x16, 0x28, 0xae, 0xd2, 0xa6, 0xab, 0xf7, 0x15, 0x88, 0x09, 0xcf, 0x4f,
        0x3c,
    ];

    #[test]
    fn test_rfc4493_empty_message() {
        let mut mac = CmacAes::new(&KEY).unwrap();
        let tag = mac.mac(b"");
        assert_eq!(
            hex::encode(tag.as_bytes()),
            "bb1d6929e95937287fa37d129b756746"
        );
    }

    #[test]
    fn test_rfc4493_one_block() {
        let mut mac = CmacAes::new(&KEY).unwrap();
        let msg = hex::decode("6bc1bee22e409f96e93d7e117393172a").unwrap();
        let tag = mac.mac(&msg);
        assert_eq!(
            hex::encode(tag.as_bytes()),
            "070a16b46b4d4144f79bdd9dd04a287c"
        );
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let mut mac = CmacAes::new(&[7u8; 32]).unwrap();
        let data = b"consensus io incremental update check";

        let one_shot = mac.mac(data);

        mac.reset();
        mac.update(&data[..10]);
        mac.update(&data[10..]);
        let incremental = mac.finish();

        assert_eq!(one_shot.as_bytes(), incremental.as_bytes());
    }

    #[test]
    fn test_finish_resets_state() {
        let mut mac = CmacAes::new(&KEY).unwrap();
        mac.update(b"leftover");
        let _ = mac.finish();
        mac.update(b"");
        assert_eq!(mac.finish().as_bytes(), mac.mac(b"").as_bytes());
    }

    #[test]
    fn test_key_schedules_wipe_on_drop() {
        fn assert_zeroize_on_drop<T: zeroize::ZeroizeOnDrop>() {}
        assert_zeroize_on_drop::<Aes128>();
        assert_zeroize_on_drop::<Aes256>();
    }

    #[test]
    fn test_rejects_bad_key_length() {
        assert!(matches!(
            CmacAes::new(&[0u8; 24]),
            Err(CryptoError::InvalidKeyLength { got: 24, .. })
        ));
    }
}
