use thiserror::Error;

/// Errors that can occur in linkfold-core.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// CSV read/write error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// A line of an edge list could not be parsed as `u v`.
    #[error("parse error at line {line}: {content:?}")]
    Parse { line: usize, content: String },
    /// The graph has no usable edges.
    #[error("graph has no edges")]
    EmptyGraph,
    /// Fewer free (non-edge, non-forbidden) pairs exist than were requested.
    #[error("non-edge space exhausted: requested {requested} negatives, {available} free pairs")]
    NonEdgeSpaceExhausted { requested: usize, available: usize },
    /// A split has no positive (or no negative) examples to score.
    #[error("insufficient positive examples in split: {split} (positives={positives}, negatives={negatives})")]
    InsufficientPositives {
        split: String,
        positives: usize,
        negatives: usize,
    },
    /// A model produced a NaN or infinite score.
    #[error("non-finite score {value} at index {index} in split: {split}")]
    NonFiniteScore { split: String, index: usize, value: f64 },
    /// Invalid configuration.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Result type alias for linkfold-core.
pub type Result<T> = std::result::Result<T, Error>;
