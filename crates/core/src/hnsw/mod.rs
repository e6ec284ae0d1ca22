//! Hierarchical Navigable Small World (HNSW) approximate nearest neighbor index.
//!
//! The graph is keyed by caller-supplied string ids. Each node records its
//! vector, top level, per-layer adjacency, and a tombstone flag; deleted
//! nodes stay in the graph as traversal anchors and are filtered from query
//! results. All comparisons go through similarity (higher = more similar),
//! never raw distance.

/// HNSW graph structure, configuration, level assignment, and rebuild.
pub mod graph;
/// Insertion with bidirectional linking, soft delete, and update.
pub mod insert;
/// Per-point node record with the stable snapshot field layout.
pub mod node;
/// Layered best-first search and multi-layer top-K queries.
pub mod search;
/// Similarity kernels: cosine and euclidean, higher = more similar.
pub mod similarity;
/// Snapshot round-trip in the interop JSON schema.
pub mod snapshot;
/// Ordered candidate set used by search and neighbor selection.
pub mod working_set;

pub use graph::{HnswConfig, HnswIndex};
pub use node::Node;
pub use search::{knn_search, search_layer, SearchParams, SearchResult};
pub use similarity::SimilarityMetric;
pub use working_set::{ScoredId, WorkingSet};
