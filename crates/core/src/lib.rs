//! # smallworld-core
//!
//! Embeddable approximate nearest neighbor index based on the Hierarchical
//! Navigable Small World (HNSW) graph. Points are high-dimensional `f32`
//! vectors identified by opaque string keys; the index answers top-K
//! similarity queries over an incrementally built multi-layer proximity
//! graph, with soft deletes and tombstone-then-reinsert updates.
//!
//! This is the synchronous engine crate with zero async dependencies —
//! suitable for embedding directly. Durable snapshots and the single-writer
//! mutation queue live in `smallworld-store`.

/// Global configuration constants: defaults and tuning parameters.
pub mod config;
/// Engine error types.
pub mod error;
/// HNSW graph: structure, insertion, search, similarity kernels, and snapshots.
pub mod hnsw;

pub use error::IndexError;
pub use hnsw::graph::{HnswConfig, HnswIndex};
pub use hnsw::node::Node;
pub use hnsw::search::{floor_from_percent, SearchParams, SearchResult};
pub use hnsw::similarity::SimilarityMetric;
