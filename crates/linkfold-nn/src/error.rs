//! Error types for linkfold-nn.

use thiserror::Error;

/// linkfold-nn error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Candle tensor error.
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    /// Splitting, sampling, metric or report error.
    #[error(transparent)]
    Core(#[from] linkfold_core::Error),

    /// Encoder selector is not one of `gcn`, `gat`, `graphsage`.
    #[error("unknown encoder: {0:?} (expected gcn, gat or graphsage)")]
    UnknownEncoder(String),

    /// Unknown node feature mode.
    #[error("unknown feature mode: {0:?} (expected full_degree, train_degree or ones)")]
    UnknownFeatureMode(String),

    /// Dimension mismatch.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Invalid configuration.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Training error.
    #[error("training error: {0}")]
    Training(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
