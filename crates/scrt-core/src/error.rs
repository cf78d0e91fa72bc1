use thiserror::Error;

pub type ScrtResult<T> = Result<T, ScrtError>;

#[derive(Debug, Error)]
pub enum ScrtError {
    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
