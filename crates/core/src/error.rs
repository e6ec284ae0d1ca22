//! Engine error types.
//!
//! Every fallible engine operation returns [`IndexError`]. A failed
//! operation never leaves the index in a state violating its graph
//! invariants: validation happens before any mutation.

use thiserror::Error;

/// Errors produced by the HNSW engine.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A vector's length does not match the index dimension inferred at
    /// first insertion. The operation is rejected; the index is unchanged.
    #[error("dimension mismatch: index stores {expected}-d vectors, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// An unknown similarity metric name at construction time.
    #[error("unknown similarity metric '{0}' (expected 'cosine' or 'euclidean')")]
    InvalidMetric(String),

    /// A snapshot blob could not be parsed.
    #[error("snapshot decode failed: {0}")]
    SnapshotDecode(#[from] serde_json::Error),

    /// A snapshot parsed but failed structural validation.
    #[error("snapshot validation failed: {0}")]
    SnapshotInvalid(String),
}
