//! Transaction encryption: the single entry point used by tx/query builders
//!
//! ```text
//! encrypt(context, message):
//!   nonce        = 32 random bytes
//!   shared       = X25519(identity.private_key, consensus_key)
//!   tx_key       = HKDF-SHA256(shared || nonce, salt = HKDF_SALT)
//!   sealed       = AES-SIV(tx_key).seal(context || message, ad = [""])
//!   → nonce || identity.public_key || sealed
//! ```
//!
//! Responses come back sealed under the same tx key, so `decrypt` only needs
//! the nonce of the request that produced them.

use rand::{CryptoRng, RngCore};
use std::sync::Arc;
use zeroize::Zeroizing;

use scrt_core::ScrtConfig;

use crate::consensus::{CertificateSource, ConsensusKey, ConsensusKeyCache};
use crate::error::CryptoResult;
use crate::identity::EncryptionIdentity;
use crate::kdf::{derive_tx_key, TxEncryptionKey};
use crate::message::{assemble, SealedMessage};
use crate::siv::SivCipher;
use crate::NONCE_SIZE;

/// Associated data for every seal/open: one empty item.
///
/// The enclave opens with exactly this list, so it must not be extended to
/// carry caller data.
const ASSOCIATED_DATA: [&[u8]; 1] = [b""];

/// Owns the client's encryption identity and the consensus key cache.
#[derive(Debug)]
pub struct EncryptionUtils {
    identity: EncryptionIdentity,
    consensus: ConsensusKeyCache,
}

impl EncryptionUtils {
    pub fn new(identity: EncryptionIdentity, consensus: ConsensusKeyCache) -> Self {
        tracing::debug!(
            public_key = %hex::encode(identity.public_key()),
            "encryption identity ready"
        );
        Self {
            identity,
            consensus,
        }
    }

    /// Build from config. See [`ConsensusKeyCache::from_config`] for how the
    /// consensus key is chosen.
    pub fn from_config(
        config: &ScrtConfig,
        source: Option<Arc<dyn CertificateSource>>,
    ) -> CryptoResult<Self> {
        let identity = match config.identity.seed_bytes()? {
            Some(seed) => EncryptionIdentity::from_seed(seed),
            None => {
                tracing::warn!(
                    "no identity seed configured; responses can only be decrypted by this process"
                );
                EncryptionIdentity::generate(&mut rand::thread_rng())
            }
        };

        let consensus = ConsensusKeyCache::from_config(&config.chain, source)?;

        Ok(Self::new(identity, consensus))
    }

    pub fn public_key(&self) -> &[u8; 32] {
        self.identity.public_key()
    }

    /// The consensus IO key, fetched through the certificate source on first
    /// use unless already known.
    pub async fn consensus_key(&self) -> CryptoResult<ConsensusKey> {
        self.consensus.get_or_fetch().await
    }

    /// The tx key for the message sealed under `nonce`.
    pub async fn tx_encryption_key(&self, nonce: &[u8]) -> CryptoResult<TxEncryptionKey> {
        let consensus = self.consensus_key().await?;
        let shared = self.identity.shared_secret(consensus.as_bytes())?;
        derive_tx_key(shared.as_slice(), nonce)
    }

    /// Encrypt `message` for the enclave, prefixed by `context` (normally the
    /// contract code hash, lowercase hex without `0x`).
    pub async fn encrypt(&self, context: &str, message: &[u8]) -> CryptoResult<Vec<u8>> {
        let nonce = random_nonce(&mut rand::thread_rng());
        self.encrypt_with_nonce(&nonce, context, message).await
    }

    /// [`encrypt`](Self::encrypt) with an explicit randomness source.
    pub async fn encrypt_with_rng<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        context: &str,
        message: &[u8],
    ) -> CryptoResult<Vec<u8>> {
        let nonce = random_nonce(rng);
        self.encrypt_with_nonce(&nonce, context, message).await
    }

    /// Deterministic core of [`encrypt`](Self::encrypt). A nonce must never
    /// be reused for two different messages.
    pub async fn encrypt_with_nonce(
        &self,
        nonce: &[u8; NONCE_SIZE],
        context: &str,
        message: &[u8],
    ) -> CryptoResult<Vec<u8>> {
        let key = self.tx_encryption_key(nonce).await?;
        let cipher = SivCipher::new(key.as_bytes())?;

        let mut plaintext = Zeroizing::new(Vec::with_capacity(context.len() + message.len()));
        plaintext.extend_from_slice(context.as_bytes());
        plaintext.extend_from_slice(message);

        let sealed = cipher.seal(&plaintext, &ASSOCIATED_DATA)?;
        tracing::debug!(
            plaintext_len = plaintext.len(),
            sealed_len = sealed.len(),
            "message encrypted"
        );
        Ok(assemble(nonce, self.identity.public_key(), &sealed))
    }

    /// Decrypt a response (`tag || body`) to the message sealed under `nonce`.
    /// Empty input means the call produced no payload and yields empty output.
    pub async fn decrypt(&self, ciphertext: &[u8], nonce: &[u8]) -> CryptoResult<Vec<u8>> {
        if ciphertext.is_empty() {
            return Ok(Vec::new());
        }
        let key = self.tx_encryption_key(nonce).await?;
        let cipher = SivCipher::new(key.as_bytes())?;
        cipher.open(ciphertext, &ASSOCIATED_DATA)
    }

    /// Decrypt one of our own outbound messages, returning `context || message`.
    pub async fn decrypt_sealed(&self, message: &[u8]) -> CryptoResult<Vec<u8>> {
        let message = SealedMessage::parse(message)?;
        self.decrypt(message.sealed(), &message.nonce()).await
    }
}

fn random_nonce<R: RngCore + CryptoRng>(rng: &mut R) -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    rng.fill_bytes(&mut nonce);
    nonce
}
