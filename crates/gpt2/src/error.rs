//! Error types for the GPT-2 generator.

use thiserror::Error;

/// Result type alias for generator operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Model files could not be found, downloaded or parsed.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    #[error("tokenization error: {0}")]
    Tokenization(String),

    /// Sampling could not pick a token.
    #[error("sampling error: {0}")]
    Sampling(String),

    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
