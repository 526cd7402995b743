//! Error types for caller-facing validation.
//!
//! Misuse of the core structures (evaluating an empty dendrogram, mixing an
//! `ActiveSet` with the wrong dendrogram) panics instead; see the module docs
//! of [`crate::dendrogram`].

use thiserror::Error;

/// Errors returned by configuration loading and engine input validation.
#[derive(Error, Debug)]
pub enum ClusterError {
    /// A point or query argument was rejected.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// An observation index does not refer to a stored observation.
    #[error("Observation {index} not found (engine holds {len})")]
    ObservationNotFound { index: usize, len: usize },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ClusterError>;
