//! scrt-crypto: client-side transaction encryption for Secret Network
//!
//! Architecture: ephemeral-nonce ECDH against the consensus IO key, then
//! deterministic AEAD
//!
//! Pipeline: seed → X25519 identity → shared secret with consensus key →
//! HKDF-SHA256(shared || nonce) → AES-SIV(context || message) → wire message
//!
//! Key hierarchy:
//! ```text
//! Identity seed (256-bit, random or configured)
//!   └── X25519 private key (clamped seed) ─┐
//!                                          ├── shared secret
//! Consensus IO public key ─────────────────┘   (hardcoded, configured, or
//!                                               extracted from the node's
//!                                               registration certificate)
//!       └── Tx Encryption Key (per message: HKDF-SHA256, ikm = shared || nonce)
//!           └── AES-128-SIV (S2V with CMAC-AES, AES-CTR), AD = [""]
//! ```

pub mod block;
pub mod cert;
pub mod consensus;
pub mod engine;
pub mod error;
pub mod identity;
pub mod kdf;
pub mod keystream;
pub mod mac;
pub mod message;
pub mod siv;

pub use cert::extract_consensus_pubkey;
pub use consensus::{
    CertificateSource, ConsensusKey, ConsensusKeyCache, FileCertificateSource, KeyOrigin,
    StaticCertificateSource,
};
pub use engine::EncryptionUtils;
pub use error::{CryptoError, CryptoResult};
pub use identity::EncryptionIdentity;
pub use kdf::{derive_tx_key, TxEncryptionKey, HKDF_SALT};
pub use message::SealedMessage;
pub use siv::SivCipher;

/// Size of an X25519 key and of a tx encryption key (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of the per-message nonce fed into HKDF
pub const NONCE_SIZE: usize = 32;

/// Size of the AES-SIV synthetic IV / tag
pub const TAG_SIZE: usize = 16;
