use thiserror::Error;

pub type CryptoResult<T> = Result<T, CryptoError>;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid {what} length: expected {expected} bytes, got {got}")]
    InvalidKeyLength {
        what: &'static str,
        expected: &'static str,
        got: usize,
    },

    #[error("malformed certificate: {0}")]
    MalformedCertificate(String),

    #[error("ciphertext truncated: {len} bytes (minimum {min})")]
    CiphertextTruncated { len: usize, min: usize },

    #[error("authentication failed: wrong key, wrong nonce, or corrupted ciphertext")]
    AuthenticationFailure,

    #[error("consensus IO key unavailable: {0}")]
    ConsensusKeyUnavailable(String),

    #[error("too many associated data items: {got} (maximum {max})")]
    TooManyAssociatedData { got: usize, max: usize },

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error(transparent)]
    Config(#[from] scrt_core::ScrtError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_is_transparent() {
        let err: CryptoError = scrt_core::decode_hex32("identity.seed", "zz").unwrap_err().into();
        assert!(matches!(err, CryptoError::Config(_)));
        assert!(err.to_string().starts_with("config error: identity.seed"));
    }
}
