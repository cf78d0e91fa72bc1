//! Key derivation: X25519 shared secret + per-message nonce → tx encryption key

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use crate::error::{CryptoError, CryptoResult};
use crate::{KEY_SIZE, NONCE_SIZE};

/// Application-wide HKDF salt. Not secret, only separates this protocol's
/// keys from any other use of the same shared secret.
pub const HKDF_SALT: [u8; 32] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x02, 0x4b, 0xea, 0xd8, 0xdf, 0x69, 0x99,
    0x08, 0x52, 0xc2, 0x02, 0xdb, 0x0e, 0x00, 0x97, 0xc1, 0xa1, 0x2e, 0xa6, 0x37, 0xd7, 0xe9, 0x6d,
];

/// A 256-bit key that seals exactly one message (and opens its response).
///
/// Zeroized on drop to prevent secrets lingering in memory.
#[derive(Clone)]
pub struct TxEncryptionKey {
    bytes: [u8; KEY_SIZE],
}

impl TxEncryptionKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for TxEncryptionKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for TxEncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxEncryptionKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Derive the tx encryption key via HKDF-SHA256.
///
/// `ikm = shared_secret || nonce`, salt = [`HKDF_SALT`], empty info, 32-byte
/// output. A single extract/expand pass, no stretching.
pub fn derive_tx_key(shared_secret: &[u8], nonce: &[u8]) -> CryptoResult<TxEncryptionKey> {
    if shared_secret.len() != KEY_SIZE {
        return Err(CryptoError::InvalidKeyLength {
            what: "shared secret",
            expected: "32",
            got: shared_secret.len(),
        });
    }
    if nonce.len() != NONCE_SIZE {
        return Err(CryptoError::InvalidKeyLength {
            what: "nonce",
            expected: "32",
            got: nonce.len(),
        });
    }

    let mut ikm = Zeroizing::new([0u8; KEY_SIZE + NONCE_SIZE]);
    ikm[..KEY_SIZE].copy_from_slice(shared_secret);
    ikm[KEY_SIZE..].copy_from_slice(nonce);

    let hkdf = Hkdf::<Sha256>::new(Some(&HKDF_SALT), ikm.as_slice());
    let mut okm = [0u8; KEY_SIZE];
    hkdf.expand(&[], &mut okm)
        .map_err(|e| CryptoError::KeyDerivation(format!("HKDF expand failed: {e}")))?;

    Ok(TxEncryptionKey::from_bytes(okm))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_salt_matches_hex() {
        assert_eq!(
            hex::encode(HKDF_SALT),
            "000000000000000000024bead8df69990852c202db0e0097c1a12ea637d7e96d"
        );
    }

    #[test]
    fn test_derive_deterministic() {
        let k1 = derive_tx_key(&[1u8; 32], &[2u8; 32]).unwrap();
        let k2 = derive_tx_key(&[1u8; 32], &[2u8; 32]).unwrap();
        assert_eq!(k1.as_bytes(), k2.as_bytes(), "KDF must be deterministic");
    }

    #[test]
    fn test_different_nonces() {
        let k1 = derive_tx_key(&[1u8; 32], &[2u8; 32]).unwrap();
        let k2 = derive_tx_key(&[1u8; 32], &[3u8; 32]).unwrap();
        assert_ne!(
            k1.as_bytes(),
            k2.as_bytes(),
            "different nonces must produce different keys"
        );
    }

    #[test]
    fn test_different_secrets() {
        let k1 = derive_tx_key(&[1u8; 32], &[9u8; 32]).unwrap();
        let k2 = derive_tx_key(&[4u8; 32], &[9u8; 32]).unwrap();
        assert_ne!(k1.as_bytes(), k2.as_bytes());
    }

    #[test]
    fn test_matches_manual_hkdf() {
        let mut ikm = vec![0x10u8; 32];
        ikm.extend_from_slice(&[0x20u8; 32]);
        let mut expected = [0u8; 32];
        Hkdf::<Sha256>::new(Some(&HKDF_SALT), &ikm)
            .expand(b"", &mut expected)
            .unwrap();

        let key = derive_tx_key(&[0x10u8; 32], &[0x20u8; 32]).unwrap();
        assert_eq!(key.as_bytes(), &expected);
    }

    #[test]
    fn test_rejects_wrong_lengths() {
        assert!(matches!(
            derive_tx_key(&[0u8; 31], &[0u8; 32]),
            Err(CryptoError::InvalidKeyLength { what: "shared secret", .. })
        ));
        assert!(matches!(
            derive_tx_key(&[0u8; 32], &[0u8; 24]),
            Err(CryptoError::InvalidKeyLength { what: "nonce", .. })
        ));
    }

    #[test]
    fn test_debug_redacted() {
        let key = derive_tx_key(&[1u8; 32], &[2u8; 32]).unwrap();
        assert!(format!("{key:?}").contains("REDACTED"));
    }
}
