//! Store-level error types.

use smallworld_core::IndexError;
use thiserror::Error;

/// Errors produced by the blob store and the mutation serializer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An engine-level failure (dimension mismatch, bad snapshot, …).
    #[error(transparent)]
    Index(#[from] IndexError),

    /// The underlying storage could not be reached or written.
    #[error("storage unavailable: {0}")]
    Unavailable(#[from] std::io::Error),

    /// No blob is stored under the requested key.
    #[error("no snapshot stored under key '{0}'")]
    SnapshotMissing(String),

    /// A stored blob failed its integrity check.
    #[error("stored blob corrupted: {0}")]
    Corrupt(String),

    /// The mutation worker is no longer running.
    #[error("index worker stopped")]
    WorkerStopped,
}
