//! # smallworld-store
//!
//! Durable persistence and mutation serialization for `smallworld-core`
//! indexes. [`BlobStore`] keeps one CRC32-framed snapshot blob per key,
//! written atomically. [`VectorStore`] composes an engine with a store and
//! funnels every mutation through a FIFO queue with a single worker task,
//! so the graph only ever has one writer; reads take a shared lease that
//! blocks the writer.

/// Store-level error types.
pub mod error;
/// Mutation serializer and the index/store composition.
pub mod service;
/// File-backed blob store with CRC32 integrity framing.
pub mod store;

pub use error::StoreError;
pub use service::{StoreConfig, VectorStore, SNAPSHOT_KEY};
pub use store::BlobStore;
