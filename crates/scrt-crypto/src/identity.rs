//! X25519 encryption identity: seed → clamped private key → public key
//!
//! The identity is fully determined by its 32-byte seed, so a client that
//! remembers the seed can rebuild the tx encryption key of any past message
//! and decrypt the chain's response to it.

use rand::{CryptoRng, RngCore};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{CryptoError, CryptoResult};
use crate::KEY_SIZE;

/// Clamp a seed into an X25519 scalar (RFC 7748 section 5).
pub fn derive_private_key(seed: &[u8; KEY_SIZE]) -> [u8; KEY_SIZE] {
    let mut private_key = *seed;
    private_key[0] &= 248;
    private_key[31] &= 127;
    private_key[31] |= 64;
    private_key
}

/// Scalar-multiply the curve base point by `private_key`.
pub fn derive_public_key(private_key: &[u8; KEY_SIZE]) -> [u8; KEY_SIZE] {
    let secret = StaticSecret::from(*private_key);
    PublicKey::from(&secret).to_bytes()
}

/// X25519 shared secret between our private key and a peer public key.
pub fn shared_secret(
    private_key: &[u8],
    peer_public_key: &[u8],
) -> CryptoResult<Zeroizing<[u8; KEY_SIZE]>> {
    let private_key = Zeroizing::new(to_key("X25519 private key", private_key)?);
    let peer = PublicKey::from(to_key("X25519 public key", peer_public_key)?);
    let secret = StaticSecret::from(*private_key);
    Ok(Zeroizing::new(secret.diffie_hellman(&peer).to_bytes()))
}

fn to_key(what: &'static str, bytes: &[u8]) -> CryptoResult<[u8; KEY_SIZE]> {
    bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
        what,
        expected: "32",
        got: bytes.len(),
    })
}

/// The client's long-lived encryption key pair. Seed and private key are
/// zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionIdentity {
    seed: [u8; KEY_SIZE],
    private_key: [u8; KEY_SIZE],
    public_key: [u8; KEY_SIZE],
}

impl EncryptionIdentity {
    pub fn from_seed(seed: [u8; KEY_SIZE]) -> Self {
        let private_key = derive_private_key(&seed);
        let public_key = derive_public_key(&private_key);
        Self {
            seed,
            private_key,
            public_key,
        }
    }

    pub fn from_seed_slice(seed: &[u8]) -> CryptoResult<Self> {
        let seed = Zeroizing::new(to_key("identity seed", seed)?);
        Ok(Self::from_seed(*seed))
    }

    /// Fresh identity from a caller-supplied CSPRNG.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut seed = Zeroizing::new([0u8; KEY_SIZE]);
        rng.fill_bytes(&mut seed[..]);
        Self::from_seed(*seed)
    }

    pub fn seed(&self) -> &[u8; KEY_SIZE] {
        &self.seed
    }

    pub fn private_key(&self) -> &[u8; KEY_SIZE] {
        &self.private_key
    }

    pub fn public_key(&self) -> &[u8; KEY_SIZE] {
        &self.public_key
    }

    pub fn shared_secret(&self, peer_public_key: &[u8]) -> CryptoResult<Zeroizing<[u8; KEY_SIZE]>> {
        shared_secret(&self.private_key, peer_public_key)
    }
}

impl std::fmt::Debug for EncryptionIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionIdentity")
            .field("seed", &"[REDACTED]")
            .field("private_key", &"[REDACTED]")
            .field("public_key", &hex::encode(self.public_key))
            .finish()
    }
}
