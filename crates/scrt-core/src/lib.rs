pub mod chain;
pub mod config;
pub mod error;

pub use chain::{known_consensus_key, MAINNET_CHAIN_IDS, MAINNET_CONSENSUS_IO_PUBKEY};
pub use config::{decode_hex32, ScrtConfig};
pub use error::{ScrtError, ScrtResult};
