use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ScrtError, ScrtResult};

/// Top-level client configuration (loaded from scrt.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrtConfig {
    pub chain: ChainConfig,
    pub identity: IdentityConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Chain id of the target network (default: secret-4)
    pub chain_id: String,
    /// Consensus IO public key as hex, skips the certificate fetch entirely
    pub consensus_key: Option<String>,
    /// Registration certificate on disk, used when the key is not known
    pub certificate_path: Option<PathBuf>,
}

/// Encryption identity settings.
///
/// The seed is the only secret here; `Debug` never prints it.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// 32-byte hex seed. When absent a random identity is generated per run,
    /// which means responses can only be decrypted by that same process.
    pub seed: Option<String>,
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("seed", &self.seed.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: "secret-4".into(),
            consensus_key: None,
            certificate_path: None,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ScrtConfig {
    /// Load configuration from a TOML file, falling back to defaults when the
    /// file does not exist.
    pub fn load(path: &Path) -> ScrtResult<Self> {
        if !path.exists() {
            tracing::warn!("config file not found: {}  (using defaults)", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| ScrtError::Config(format!("parsing {}: {e}", path.display())))
    }

    pub fn from_toml_str(content: &str) -> ScrtResult<Self> {
        toml::from_str(content).map_err(|e| ScrtError::Config(e.to_string()))
    }
}

impl ChainConfig {
    /// Decoded consensus key override, if one is configured.
    pub fn consensus_key_bytes(&self) -> ScrtResult<Option<[u8; 32]>> {
        self.consensus_key
            .as_deref()
            .map(|s| decode_hex32("chain.consensus_key", s))
            .transpose()
    }
}

impl IdentityConfig {
    /// Decoded identity seed, if one is configured.
    pub fn seed_bytes(&self) -> ScrtResult<Option<[u8; 32]>> {
        self.seed
            .as_deref()
            .map(|s| decode_hex32("identity.seed", s))
            .transpose()
    }
}

/// Decode a 32-byte value written as hex, with or without a `0x` prefix.
pub fn decode_hex32(field: &str, value: &str) -> ScrtResult<[u8; 32]> {
    let trimmed = value.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(digits)
        .map_err(|e| ScrtError::Config(format!("{field}: invalid hex: {e}")))?;
    bytes.try_into().map_err(|b: Vec<u8>| {
        ScrtError::Config(format!("{field}: expected 32 bytes, got {}", b.len()))
    })
}
