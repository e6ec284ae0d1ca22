//! Global configuration constants for smallworld.
//!
//! Compile-time defaults and tuning parameters. Runtime configuration is
//! carried by [`crate::HnswConfig`] and the store-level config structs.

/// Default number of bidirectional links per HNSW node per layer.
///
/// Higher values improve recall but increase memory and build time.
/// Typical range: 8–64.
pub const HNSW_DEFAULT_M: usize = 16;

/// Default ef parameter during HNSW index construction.
///
/// Controls the size of the dynamic candidate list during insertion.
/// Higher values produce a better graph but slow down build time.
pub const HNSW_DEFAULT_EF_CONSTRUCTION: usize = 200;

/// Default beam width carried between upper layers during top-K search.
///
/// A small multi-candidate beam on the descent improves recall on small
/// indexes at modest cost.
pub const HNSW_DEFAULT_BEAM_WIDTH: usize = 10;

/// Default similarity floor for top-K search. Results scoring at or below
/// the floor are dropped.
pub const DEFAULT_SIMILARITY_FLOOR: f32 = 0.5;

/// Upper bound applied when a similarity floor is derived from a caller
/// percentage (`floor_from_percent`).
pub const MAX_SIMILARITY_FLOOR: f32 = 0.95;

/// Smallest level probability kept in the layer-assignment table.
///
/// The table is cut off once `p(level)` drops below this, which also fixes
/// the maximum assignable level.
pub const LEVEL_PROB_EPSILON: f64 = 1e-9;
