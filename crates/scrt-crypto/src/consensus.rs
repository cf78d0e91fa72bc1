//! Consensus IO public key: known constants, injected certificate source,
//! and the write-once cache that holds whichever one won.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use scrt_core::config::ChainConfig;

use crate::cert::extract_consensus_pubkey;
use crate::error::{CryptoError, CryptoResult};
use crate::KEY_SIZE;

/// Where a consensus key came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOrigin {
    /// Hardcoded for a well-known chain id
    Known,
    /// Extracted from a certificate returned by a [`CertificateSource`]
    Fetched,
    /// Supplied directly by the caller or the config file
    Configured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsensusKey {
    bytes: [u8; KEY_SIZE],
    origin: KeyOrigin,
}

impl ConsensusKey {
    pub fn new(bytes: [u8; KEY_SIZE], origin: KeyOrigin) -> Self {
        Self { bytes, origin }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    pub fn origin(&self) -> KeyOrigin {
        self.origin
    }
}

/// Fetches the registration certificate of the active consensus set.
///
/// Implementations own transport, timeouts and retries; the cache calls this
/// at most once per successful fill.
#[async_trait]
pub trait CertificateSource: Send + Sync {
    async fn fetch_certificate(&self) -> anyhow::Result<Vec<u8>>;
}

/// Certificate bytes already in memory
#[derive(Debug, Clone)]
pub struct StaticCertificateSource {
    cert: Vec<u8>,
}

impl StaticCertificateSource {
    pub fn new(cert: Vec<u8>) -> Self {
        Self { cert }
    }
}

#[async_trait]
impl CertificateSource for StaticCertificateSource {
    async fn fetch_certificate(&self) -> anyhow::Result<Vec<u8>> {
        Ok(self.cert.clone())
    }
}

/// Certificate stored on disk (e.g. `io-master-cert.der` saved from a node)
#[derive(Debug, Clone)]
pub struct FileCertificateSource {
    path: PathBuf,
}

impl FileCertificateSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CertificateSource for FileCertificateSource {
    async fn fetch_certificate(&self) -> anyhow::Result<Vec<u8>> {
        tokio::fs::read(&self.path)
            .await
            .map_err(|e| anyhow::anyhow!("reading certificate {}: {e}", self.path.display()))
    }
}

/// Write-once holder for the consensus key.
///
/// Concurrent first callers may each run a fetch; the first value stored
/// wins and every later read sees it.
pub struct ConsensusKeyCache {
    cell: OnceLock<ConsensusKey>,
    source: Option<Arc<dyn CertificateSource>>,
}

impl ConsensusKeyCache {
    /// Cache for `chain_id`, pre-filled when the chain's key is known.
    pub fn for_chain(chain_id: &str, source: Option<Arc<dyn CertificateSource>>) -> Self {
        let cell = OnceLock::new();
        if let Some(bytes) = scrt_core::known_consensus_key(chain_id) {
            tracing::debug!(chain_id, "using hardcoded consensus key");
            let _ = cell.set(ConsensusKey::new(bytes, KeyOrigin::Known));
        }
        Self { cell, source }
    }

    /// Cache that always fetches through `source` on first use.
    pub fn from_source(source: Arc<dyn CertificateSource>) -> Self {
        Self {
            cell: OnceLock::new(),
            source: Some(source),
        }
    }

    /// Cache pre-filled with an explicit key.
    pub fn with_key(bytes: [u8; KEY_SIZE]) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(ConsensusKey::new(bytes, KeyOrigin::Configured));
        Self { cell, source: None }
    }

    /// Cache for a `[chain]` section. Precedence: explicit `consensus_key`,
    /// then the hardcoded key for `chain_id`, then `source`, then
    /// `certificate_path`.
    pub fn from_config(
        chain: &ChainConfig,
        source: Option<Arc<dyn CertificateSource>>,
    ) -> CryptoResult<Self> {
        if let Some(bytes) = chain.consensus_key_bytes()? {
            return Ok(Self::with_key(bytes));
        }
        let source = source.or_else(|| {
            chain.certificate_path.as_ref().map(|path| {
                Arc::new(FileCertificateSource::new(path)) as Arc<dyn CertificateSource>
            })
        });
        Ok(Self::for_chain(&chain.chain_id, source))
    }

    /// The cached key, without fetching.
    pub fn get(&self) -> Option<ConsensusKey> {
        self.cell.get().copied()
    }

    /// The cached key, fetching and extracting it on first use.
    pub async fn get_or_fetch(&self) -> CryptoResult<ConsensusKey> {
        if let Some(key) = self.cell.get() {
            return Ok(*key);
        }

        let source = self.source.as_ref().ok_or_else(|| {
            CryptoError::ConsensusKeyUnavailable("no certificate source configured".into())
        })?;

        let cert = source
            .fetch_certificate()
            .await
            .map_err(|e| CryptoError::ConsensusKeyUnavailable(format!("{e:#}")))?;
        if cert.is_empty() {
            return Err(CryptoError::ConsensusKeyUnavailable(
                "certificate source returned no data".into(),
            ));
        }

        let fetched = ConsensusKey::new(extract_consensus_pubkey(&cert)?, KeyOrigin::Fetched);
        let stored = *self.cell.get_or_init(|| fetched);
        tracing::info!(
            consensus_key = %hex::encode(stored.as_bytes()),
            "consensus IO key fetched"
        );
        Ok(stored)
    }
}

impl std::fmt::Debug for ConsensusKeyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsensusKeyCache")
            .field("key", &self.cell.get())
            .field("has_source", &self.source.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::tests::software_cert;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        cert: Vec<u8>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CertificateSource for CountingSource {
        async fn fetch_certificate(&self) -> anyhow::Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.cert.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl CertificateSource for FailingSource {
        async fn fetch_certificate(&self) -> anyhow::Result<Vec<u8>> {
            anyhow::bail!("node unreachable")
        }
    }

    #[tokio::test]
    async fn test_known_chain_never_fetches() {
        let source = Arc::new(CountingSource {
            cert: software_cert(&[1u8; 32]),
            calls: AtomicUsize::new(0),
        });
        let cache = ConsensusKeyCache::for_chain("secret-4", Some(source.clone()));

        let key = cache.get_or_fetch().await.unwrap();
        assert_eq!(key.origin(), KeyOrigin::Known);
        assert_eq!(key.as_bytes(), &scrt_core::MAINNET_CONSENSUS_IO_PUBKEY);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_chain_fetches_once() {
        let source = Arc::new(CountingSource {
            cert: software_cert(&[9u8; 32]),
            calls: AtomicUsize::new(0),
        });
        let cache = ConsensusKeyCache::for_chain("pulsar-3", Some(source.clone()));
        assert!(cache.get().is_none());

        for _ in 0..3 {
            let key = cache.get_or_fetch().await.unwrap();
            assert_eq!(key.as_bytes(), &[9u8; 32]);
            assert_eq!(key.origin(), KeyOrigin::Fetched);
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_use_converges() {
        let source = Arc::new(CountingSource {
            cert: software_cert(&[5u8; 32]),
            calls: AtomicUsize::new(0),
        });
        let cache = Arc::new(ConsensusKeyCache::from_source(source.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get_or_fetch().await.unwrap() })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().as_bytes(), &[5u8; 32]);
        }

        let calls = source.calls.load(Ordering::SeqCst);
        assert!((1..=8).contains(&calls));
        assert_eq!(cache.get().unwrap().as_bytes(), &[5u8; 32]);
    }

    #[tokio::test]
    async fn test_empty_certificate_unavailable() {
        let cache = ConsensusKeyCache::from_source(Arc::new(StaticCertificateSource::new(vec![])));
        assert!(matches!(
            cache.get_or_fetch().await,
            Err(CryptoError::ConsensusKeyUnavailable(_))
        ));
        assert!(cache.get().is_none(), "failed fetch must not populate the cache");
    }

    #[tokio::test]
    async fn test_fetch_error_unavailable() {
        let cache = ConsensusKeyCache::from_source(Arc::new(FailingSource));
        let err = cache.get_or_fetch().await.unwrap_err();
        assert!(err.to_string().contains("node unreachable"));
    }

    #[tokio::test]
    async fn test_no_source_unavailable() {
        let cache = ConsensusKeyCache::for_chain("pulsar-3", None);
        assert!(matches!(
            cache.get_or_fetch().await,
            Err(CryptoError::ConsensusKeyUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_certificate_surfaces() {
        let cache = ConsensusKeyCache::from_source(Arc::new(StaticCertificateSource::new(
            b"garbage".to_vec(),
        )));
        assert!(matches!(
            cache.get_or_fetch().await,
            Err(CryptoError::MalformedCertificate(_))
        ));
    }

    #[tokio::test]
    async fn test_configured_key() {
        let cache = ConsensusKeyCache::with_key([3u8; 32]);
        let key = cache.get_or_fetch().await.unwrap();
        assert_eq!(key.origin(), KeyOrigin::Configured);
        assert_eq!(key.as_bytes(), &[3u8; 32]);
    }

    #[tokio::test]
    async fn test_from_config_precedence() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("cert.der");
        std::fs::write(&path, software_cert(&[4u8; 32])).unwrap();

        let mut chain = ChainConfig {
            chain_id: "secret-4".into(),
            consensus_key: None,
            certificate_path: Some(path),
        };
        let cache = ConsensusKeyCache::from_config(&chain, None).unwrap();
        assert_eq!(cache.get().unwrap().origin(), KeyOrigin::Known);

        chain.chain_id = "pulsar-3".into();
        let cache = ConsensusKeyCache::from_config(&chain, None).unwrap();
        assert_eq!(cache.get_or_fetch().await.unwrap().as_bytes(), &[4u8; 32]);

        chain.consensus_key = Some(format!("0x{}", "06".repeat(32)));
        let cache = ConsensusKeyCache::from_config(&chain, None).unwrap();
        assert_eq!(cache.get().unwrap().as_bytes(), &[6u8; 32]);
    }

    #[tokio::test]
    async fn test_file_source() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("io-master-cert.der");
        std::fs::write(&path, software_cert(&[7u8; 32])).unwrap();

        let cache = ConsensusKeyCache::from_source(Arc::new(FileCertificateSource::new(&path)));
        assert_eq!(cache.get_or_fetch().await.unwrap().as_bytes(), &[7u8; 32]);
    }

    #[tokio::test]
    async fn test_file_source_missing() {
        let source = FileCertificateSource::new("/nonexistent/io-master-cert.der");
        assert_eq!(source.path(), Path::new("/nonexistent/io-master-cert.der"));
        let cache = ConsensusKeyCache::from_source(Arc::new(source));
        assert!(matches!(
            cache.get_or_fetch().await,
            Err(CryptoError::ConsensusKeyUnavailable(_))
        ));
    }
}
