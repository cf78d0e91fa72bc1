//! scrt: Secret Network tx encryption CLI
//!
//! Commands:
//!   keygen [--seed HEX]                          - derive (or generate) an encryption identity
//!   consensus-key [--cert FILE]                  - show the consensus IO public key
//!   encrypt --code-hash HEX --msg JSON           - encrypt a contract message
//!   decrypt --ciphertext B64 --nonce HEX         - decrypt a contract response
//!   decrypt --sealed B64                         - decrypt one of our own encrypted messages
//!
//! Logs go to stderr; command output goes to stdout.

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use scrt_core::{decode_hex32, ScrtConfig};
use scrt_crypto::{
    ConsensusKeyCache, EncryptionIdentity, EncryptionUtils, FileCertificateSource, KeyOrigin,
    SealedMessage,
};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "scrt",
    version,
    about = "Secret Network transaction encryption",
    long_about = "scrt: derive encryption identities, extract consensus keys, and encrypt/decrypt contract messages"
)]
struct Cli {
    /// Path to scrt.toml configuration file
    #[arg(long, short = 'c', env = "SCRT_CONFIG", default_value = "scrt.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides [log] level
    #[arg(long, env = "SCRT_LOG")]
    log: Option<String>,

    /// Log format; overrides [log] format
    #[arg(long, env = "SCRT_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Chain id; overrides [chain] chain_id
    #[arg(long, env = "SCRT_CHAIN_ID")]
    chain_id: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Derive an encryption identity from a seed, or generate a fresh one
    Keygen {
        /// 32-byte hex seed (default: random)
        #[arg(long)]
        seed: Option<String>,
        /// Print JSON instead of plain lines
        #[arg(long)]
        json: bool,
    },

    /// Show the consensus IO public key
    ///
    /// With --cert the key is extracted from a saved registration certificate;
    /// otherwise it comes from config or the hardcoded key for the chain id.
    #[command(name = "consensus-key")]
    ConsensusKey {
        /// DER registration certificate (e.g. io-master-cert.der)
        #[arg(long)]
        cert: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },

    /// Encrypt a contract message for the enclave
    Encrypt {
        /// Contract code hash (hex, `0x` prefix tolerated)
        #[arg(long)]
        code_hash: String,
        /// Message JSON
        #[arg(long)]
        msg: String,
        /// Identity seed hex; overrides [identity] seed
        #[arg(long, env = "SCRT_SEED")]
        seed: Option<String>,
        /// Consensus IO key hex; overrides [chain] consensus_key
        #[arg(long)]
        consensus_key: Option<String>,
        /// Registration certificate; overrides [chain] certificate_path
        #[arg(long)]
        cert: Option<PathBuf>,
        /// Print JSON with ciphertext, nonce and sender public key
        #[arg(long)]
        json: bool,
    },

    /// Decrypt a contract response, or one of our own encrypted messages
    Decrypt {
        /// Response ciphertext (base64 `tag || body`)
        #[arg(long, requires = "nonce", conflicts_with = "sealed")]
        ciphertext: Option<String>,
        /// Nonce of the request that produced the response (hex)
        #[arg(long, requires = "ciphertext")]
        nonce: Option<String>,
        /// Complete encrypted message as produced by `scrt encrypt` (base64)
        #[arg(long)]
        sealed: Option<String>,
        /// Identity seed hex; overrides [identity] seed
        #[arg(long, env = "SCRT_SEED")]
        seed: Option<String>,
        #[arg(long)]
        consensus_key: Option<String>,
        #[arg(long)]
        cert: Option<PathBuf>,
    },
}

#[derive(Clone, Debug, ValueEnum, PartialEq)]
enum LogFormat {
    Json,
    Text,
}

/// Per-command overrides applied on top of the config file
#[derive(Debug, Default)]
struct Overrides<'a> {
    seed: Option<&'a str>,
    consensus_key: Option<&'a str>,
    cert: Option<&'a Path>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?;
    if let Some(chain_id) = &cli.chain_id {
        config.chain.chain_id = chain_id.clone();
    }

    let level = cli.log.clone().unwrap_or_else(|| config.log.level.clone());
    let format = match cli.log_format.clone() {
        Some(format) => format,
        None => parse_log_format(&config.log.format)?,
    };
    init_logging(&level, &format);

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        chain_id = %config.chain.chain_id,
        "scrt starting"
    );

    match cli.command {
        Commands::Keygen { seed, json } => cmd_keygen(seed.as_deref(), json),
        Commands::ConsensusKey { cert, json } => {
            cmd_consensus_key(&config, cert.as_deref(), json).await
        }
        Commands::Encrypt {
            code_hash,
            msg,
            seed,
            consensus_key,
            cert,
            json,
        } => {
            let overrides = Overrides {
                seed: seed.as_deref(),
                consensus_key: consensus_key.as_deref(),
                cert: cert.as_deref(),
            };
            cmd_encrypt(apply_overrides(config, &overrides), &code_hash, &msg, json).await
        }
        Commands::Decrypt {
            ciphertext,
            nonce,
            sealed,
            seed,
            consensus_key,
            cert,
        } => {
            let overrides = Overrides {
                seed: seed.as_deref(),
                consensus_key: consensus_key.as_deref(),
                cert: cert.as_deref(),
            };
            let input = match (ciphertext, nonce, sealed) {
                (Some(ciphertext), Some(nonce), None) => DecryptInput::Response { ciphertext, nonce },
                (None, None, Some(sealed)) => DecryptInput::Sealed(sealed),
                _ => anyhow::bail!("decrypt needs either --ciphertext with --nonce, or --sealed"),
            };
            cmd_decrypt(apply_overrides(config, &overrides), input).await
        }
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn parse_log_format(value: &str) -> Result<LogFormat> {
    LogFormat::from_str(value, true)
        .map_err(|_| anyhow::anyhow!("unknown log format {value:?} (expected json or text)"))
}

// ── Config loading ────────────────────────────────────────────────────────────

fn load_config(path: &Path) -> Result<ScrtConfig> {
    ScrtConfig::load(path).with_context(|| format!("loading config: {}", path.display()))
}

fn apply_overrides(mut config: ScrtConfig, overrides: &Overrides<'_>) -> ScrtConfig {
    if let Some(seed) = overrides.seed {
        config.identity.seed = Some(seed.to_string());
    }
    if let Some(key) = overrides.consensus_key {
        config.chain.consensus_key = Some(key.to_string());
    }
    if let Some(cert) = overrides.cert {
        config.chain.certificate_path = Some(cert.to_path_buf());
    }
    config
}

// ── `scrt keygen` ─────────────────────────────────────────────────────────────

fn cmd_keygen(seed: Option<&str>, json: bool) -> Result<()> {
    let identity = match seed {
        Some(hex_seed) => EncryptionIdentity::from_seed(decode_hex32("seed", hex_seed)?),
        None => EncryptionIdentity::generate(&mut rand::thread_rng()),
    };

    let seed_hex = hex::encode(identity.seed());
    let public_hex = hex::encode(identity.public_key());

    if json {
        let out = serde_json::json!({
            "seed": seed_hex,
            "public_key": public_hex,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("seed:       {seed_hex}");
        println!("public key: {public_hex}");
    }
    Ok(())
}

// ── `scrt consensus-key` ──────────────────────────────────────────────────────

async fn cmd_consensus_key(config: &ScrtConfig, cert: Option<&Path>, json: bool) -> Result<()> {
    let key = match cert {
        Some(path) => {
            let source = Arc::new(FileCertificateSource::new(path));
            let cache = ConsensusKeyCache::from_source(source.clone());
            cache.get_or_fetch().await.with_context(|| {
                format!("extracting consensus key from {}", source.path().display())
            })?
        }
        None => ConsensusKeyCache::from_config(&config.chain, None)?
            .get_or_fetch()
            .await
            .with_context(|| {
                format!(
                    "no consensus key for chain {} (pass --cert or set [chain] consensus_key)",
                    config.chain.chain_id
                )
            })?,
    };

    let key_hex = hex::encode(key.as_bytes());
    if json {
        let out = serde_json::json!({
            "consensus_key": key_hex,
            "origin": origin_label(key.origin()),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{key_hex}");
    }
    Ok(())
}

fn origin_label(origin: KeyOrigin) -> &'static str {
    match origin {
        KeyOrigin::Known => "known",
        KeyOrigin::Fetched => "certificate",
        KeyOrigin::Configured => "configured",
    }
}

// ── `scrt encrypt` ────────────────────────────────────────────────────────────

async fn cmd_encrypt(config: ScrtConfig, code_hash: &str, msg: &str, json: bool) -> Result<()> {
    serde_json::from_str::<serde_json::Value>(msg).context("--msg must be valid JSON")?;
    let code_hash = normalize_code_hash(code_hash)?;

    let utils = EncryptionUtils::from_config(&config, None)?;
    let sealed = utils
        .encrypt(&code_hash, msg.as_bytes())
        .await
        .context("encrypting message")?;

    let encoded = STANDARD.encode(&sealed);
    if json {
        let parsed = SealedMessage::parse(&sealed)?;
        let out = serde_json::json!({
            "ciphertext": encoded,
            "nonce": hex::encode(parsed.nonce()),
            "public_key": hex::encode(parsed.sender_public_key()),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{encoded}");
    }
    Ok(())
}

/// Lowercase hex without `0x`, the form the enclave hashes against.
fn normalize_code_hash(code_hash: &str) -> Result<String> {
    let trimmed = code_hash.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed).to_ascii_lowercase();
    hex::decode(&digits).with_context(|| format!("code hash is not hex: {code_hash}"))?;
    Ok(digits)
}

// ── `scrt decrypt` ────────────────────────────────────────────────────────────

#[derive(Debug)]
enum DecryptInput {
    Response { ciphertext: String, nonce: String },
    Sealed(String),
}

async fn cmd_decrypt(config: ScrtConfig, input: DecryptInput) -> Result<()> {
    if config.identity.seed.is_none() {
        anyhow::bail!("decrypt needs the identity seed used to encrypt (--seed or [identity] seed)");
    }
    let utils = EncryptionUtils::from_config(&config, None)?;

    let plaintext = match input {
        DecryptInput::Response { ciphertext, nonce } => {
            let ciphertext = STANDARD
                .decode(ciphertext.trim())
                .context("--ciphertext is not base64")?;
            let nonce = decode_hex32("nonce", &nonce)?;
            utils.decrypt(&ciphertext, &nonce).await
        }
        DecryptInput::Sealed(sealed) => {
            let sealed = STANDARD.decode(sealed.trim()).context("--sealed is not base64")?;
            utils.decrypt_sealed(&sealed).await
        }
    }
    .context("decrypting")?;

    match String::from_utf8(plaintext) {
        Ok(text) => println!("{text}"),
        Err(e) => println!("{}", hex::encode(e.into_bytes())),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_encrypt() {
        let cli = Cli::try_parse_from([
            "scrt",
            "--chain-id",
            "pulsar-3",
            "encrypt",
            "--code-hash",
            "AB12",
            "--msg",
            "{}",
        ])
        .unwrap();
        assert_eq!(cli.chain_id.as_deref(), Some("pulsar-3"));
        assert!(matches!(cli.command, Commands::Encrypt { json: false, .. }));
    }

    #[test]
    fn test_decrypt_ciphertext_requires_nonce() {
        assert!(Cli::try_parse_from(["scrt", "decrypt", "--ciphertext", "AAAA"]).is_err());
        assert!(Cli::try_parse_from([
            "scrt",
            "decrypt",
            "--ciphertext",
            "AAAA",
            "--nonce",
            "00",
            "--sealed",
            "AAAA"
        ])
        .is_err());
    }

    #[test]
    fn test_overrides_win_over_config() {
        let mut config = ScrtConfig::default();
        config.identity.seed = Some("00".repeat(32));
        let overrides = Overrides {
            seed: Some("ab"),
            consensus_key: Some("cd"),
            cert: Some(Path::new("/tmp/cert.der")),
        };
        let config = apply_overrides(config, &overrides);
        assert_eq!(config.identity.seed.as_deref(), Some("ab"));
        assert_eq!(config.chain.consensus_key.as_deref(), Some("cd"));
        assert_eq!(
            config.chain.certificate_path.as_deref(),
            Some(Path::new("/tmp/cert.der"))
        );
    }

    #[test]
    fn test_normalize_code_hash() {
        assert_eq!(normalize_code_hash("0xABcd").unwrap(), "abcd");
        assert!(normalize_code_hash("xyz").is_err());
    }

    #[test]
    fn test_parse_log_format() {
        assert_eq!(parse_log_format("JSON").unwrap(), LogFormat::Json);
        assert!(parse_log_format("yaml").is_err());
    }

    #[test]
    fn test_load_missing_config_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config.chain.chain_id, "secret-4");
    }

    #[tokio::test]
    async fn test_encrypt_then_decrypt_sealed() {
        let mut config = ScrtConfig::default();
        config.identity.seed = Some("11".repeat(32));
        let utils = EncryptionUtils::from_config(&config, None).unwrap();
        let sealed = utils.encrypt("abcd", b"{}").await.unwrap();

        let input = DecryptInput::Sealed(STANDARD.encode(&sealed));
        cmd_decrypt(config, input).await.unwrap();
    }

    #[tokio::test]
    async fn test_consensus_key_from_cert_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("io-master-cert.der");
        let payload = STANDARD.encode([3u8; 32]);
        let mut cert = vec![0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x86, 0xF8, 0x42, 0x01, 0x0D];
        cert.extend_from_slice(&[0x04, payload.len() as u8]);
        cert.extend_from_slice(payload.as_bytes());
        std::fs::write(&path, cert).unwrap();

        cmd_consensus_key(&ScrtConfig::default(), Some(path.as_path()), true)
            .await
            .unwrap();

        let missing = tmp.path().join("gone.der");
        let err = cmd_consensus_key(&ScrtConfig::default(), Some(missing.as_path()), false)
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("gone.der"));
    }

    #[tokio::test]
    async fn test_decrypt_without_seed_refused() {
        let input = DecryptInput::Sealed("AAAA".into());
        assert!(cmd_decrypt(ScrtConfig::default(), input).await.is_err());
    }
}
