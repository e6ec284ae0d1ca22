//! HNSW graph structure and configuration.
//!
//! [`HnswConfig`] defines tuning parameters (M, level-0 cap, ef_construction,
//! similarity metric). [`HnswIndex`] holds the id-keyed node map, the entry
//! point, the level probability table, and the dimension inferred on first
//! insertion.

use crate::config;
use crate::hnsw::node::Node;
use crate::hnsw::similarity::SimilarityMetric;
use std::collections::HashMap;

/// Configuration parameters for an HNSW index.
///
/// Controls the trade-off between build speed, search speed, recall, and
/// memory usage.
#[derive(Debug, Clone)]
pub struct HnswConfig {
    /// Number of bidirectional links per node per layer (layers ≥ 1).
    pub m: usize,
    /// Maximum links per node at layer 0. Defaults to `m` (uniform cap);
    /// set to `2 * m` for the classical layout.
    pub m_max0: usize,
    /// Candidate list size during index construction.
    pub ef_construction: usize,
    /// Similarity function for vector comparison.
    pub metric: SimilarityMetric,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            m: config::HNSW_DEFAULT_M,
            m_max0: config::HNSW_DEFAULT_M,
            ef_construction: config::HNSW_DEFAULT_EF_CONSTRUCTION,
            metric: SimilarityMetric::Cosine,
        }
    }
}

impl HnswConfig {
    /// The adjacency cap at `layer`: `m_max0` at layer 0, `m` above.
    #[inline]
    pub fn max_neighbors(&self, layer: usize) -> usize {
        if layer == 0 {
            self.m_max0
        } else {
            self.m
        }
    }
}

/// HNSW index over string-keyed points.
///
/// The dimension is inferred from the first inserted vector and enforced on
/// every later insertion. `entry_point` names a node at `max_level`; it may
/// be tombstoned, in which case it still serves as the traversal anchor.
#[derive(Debug)]
pub struct HnswIndex {
    pub config: HnswConfig,
    pub nodes: HashMap<String, Node>,
    pub entry_point: Option<String>,
    pub max_level: usize,
    pub dimension: Option<usize>,
    pub(crate) level_probs: Vec<f64>,
}

impl HnswIndex {
    /// Creates a new empty index with the given configuration.
    ///
    /// `config.m` must be at least 2; the level distribution is undefined
    /// below that.
    pub fn new(config: HnswConfig) -> Self {
        debug_assert!(config.m >= 2, "HNSW requires m >= 2");
        let level_probs = level_probabilities(config.m);
        Self {
            config,
            nodes: HashMap::new(),
            entry_point: None,
            max_level: 0,
            dimension: None,
            level_probs,
        }
    }

    /// Creates a new empty index with default configuration
    /// (cosine, M=16, ef_construction=200).
    pub fn with_default_config() -> Self {
        Self::new(HnswConfig::default())
    }

    /// Returns the number of live (non-tombstoned) nodes.
    pub fn len(&self) -> usize {
        self.nodes.values().filter(|n| !n.deleted).count()
    }

    /// Returns `true` if the index contains no live nodes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the node stored under `id`, live or tombstoned.
    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Whether a live node is stored under `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.get(id).is_some_and(|n| !n.deleted)
    }

    /// Highest level the distribution can assign.
    #[inline]
    pub fn level_cap(&self) -> usize {
        self.level_probs.len().saturating_sub(1)
    }

    /// Draw a level for a new node from the exponential layer distribution.
    pub fn random_level(&self) -> usize {
        self.assign_level(rand::random::<f64>())
    }

    /// Map a uniform draw `r ∈ [0, 1)` onto a level: walk the probability
    /// table subtracting each `p(i)` until `r` falls inside, capping at the
    /// table end.
    pub(crate) fn assign_level(&self, mut r: f64) -> usize {
        for (level, p) in self.level_probs.iter().enumerate() {
            if r < *p {
                return level;
            }
            r -= p;
        }
        self.level_cap()
    }

    /// Drop all nodes and derived state. The dimension is re-inferred on
    /// the next insertion.
    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.entry_point = None;
        self.max_level = 0;
        self.dimension = None;
    }

    /// Rebuild the graph from its own records: clears the graph, then
    /// re-inserts every live node with its original id and vector (fresh
    /// level draws, fresh adjacency). Tombstoned records are dropped.
    ///
    /// `progress` is called after each re-inserted node with a percentage
    /// in `[0, 100]`, and once with `100.0` if there was nothing to insert.
    pub fn rebuild<F: FnMut(f32)>(&mut self, mut progress: F) {
        let mut records: Vec<(String, Vec<f32>)> = self
            .nodes
            .values()
            .filter(|n| !n.deleted)
            .map(|n| (n.id.clone(), n.vector.clone()))
            .collect();
        records.sort_by(|a, b| a.0.cmp(&b.0));

        self.clear();

        let total = records.len();
        tracing::info!(nodes = total, "rebuilding index from live records");
        if total == 0 {
            progress(100.0);
            return;
        }
        for (i, (id, vector)) in records.into_iter().enumerate() {
            // Re-inserted vectors came from the index, so the dimension
            // check cannot fail here.
            let _ = self.add_point(&id, &vector);
            progress((i + 1) as f32 * 100.0 / total as f32);
        }
    }
}

impl Default for HnswIndex {
    fn default() -> Self {
        Self::with_default_config()
    }
}

/// Level probability table for a given M: `p(i) = exp(−i/mL)·(1 − exp(−1/mL))`
/// with `mL = 1/ln(M)`, cut off below [`config::LEVEL_PROB_EPSILON`].
///
/// The table length fixes the level cap: levels are capped at
/// `len − 1`.
pub(crate) fn level_probabilities(m: usize) -> Vec<f64> {
    let ml = 1.0 / (m as f64).ln();
    let scale = 1.0 - (-1.0 / ml).exp();
    let mut probs = Vec::new();
    let mut level = 0usize;
    loop {
        let p = (-(level as f64) / ml).exp() * scale;
        if p < config::LEVEL_PROB_EPSILON {
            break;
        }
        probs.push(p);
        level += 1;
    }
    probs
}
