//! HNSW search: single-layer traversal and multi-layer top-K queries.
//!
//! `search_layer` is a bounded best-first traversal of one layer. Tombstoned
//! nodes are traversed and returned — they carry connectivity — and are
//! filtered only when layer results are merged into the final candidate set.
//! `knn_search` descends with a small beam through the upper layers, runs
//! one wide pass at layer 0, then applies the tombstone filter and the
//! similarity floor.

use crate::config;
use crate::error::IndexError;
use crate::hnsw::graph::HnswIndex;
use crate::hnsw::working_set::WorkingSet;
use std::collections::HashSet;

/// Parameters for a top-K search.
#[derive(Debug, Clone)]
pub struct SearchParams {
    /// Similarity floor: results scoring at or below it are dropped
    /// (strict `>` comparison).
    pub floor: f32,
    /// Working-set size at layer 0. `None` uses the index's
    /// `ef_construction`.
    pub ef: Option<usize>,
    /// Number of candidates carried between upper layers.
    pub beam_width: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            floor: config::DEFAULT_SIMILARITY_FLOOR,
            ef: None,
            beam_width: config::HNSW_DEFAULT_BEAM_WIDTH,
        }
    }
}

/// A single search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub id: String,
    pub vector: Vec<f32>,
    pub score: f32,
}

/// Convert a caller-facing percentage into a similarity floor, capping at
/// [`config::MAX_SIMILARITY_FLOOR`].
pub fn floor_from_percent(percent: f32) -> f32 {
    (percent / 100.0).clamp(0.0, config::MAX_SIMILARITY_FLOOR)
}

/// Bounded best-first traversal of one layer.
///
/// Seeds the candidate and result sets with every resolvable entry point,
/// then repeatedly expands the most similar candidate until it falls below
/// the least similar retained result. The result set is truncated to `ef`.
/// Tombstoned nodes are traversed and returned; unknown and empty-string
/// ids are skipped.
pub fn search_layer(
    index: &HnswIndex,
    query: &[f32],
    entry_points: &[String],
    ef: usize,
    layer: usize,
) -> WorkingSet {
    let metric = index.config.metric;
    let mut visited: HashSet<String> = HashSet::new();
    let mut candidates = WorkingSet::new();
    let mut results = WorkingSet::new();

    for ep in entry_points {
        if ep.is_empty() {
            continue;
        }
        let Some(node) = index.nodes.get(ep) else {
            continue;
        };
        if visited.insert(ep.clone()) {
            let sim = metric.similarity(query, &node.vector);
            candidates.push(sim, ep.clone());
            results.push(sim, ep.clone());
        }
    }
    results.truncate(ef);

    while let Some(current) = candidates.pop_first() {
        let worst = match results.peek_last() {
            Some(entry) => entry.score,
            None => break,
        };
        if current.score < worst {
            break;
        }
        let Some(node) = index.nodes.get(&current.id) else {
            continue;
        };
        for peer_id in node.neighbors_at(layer) {
            if peer_id.is_empty() || visited.contains(peer_id) {
                continue;
            }
            visited.insert(peer_id.clone());
            let Some(peer) = index.nodes.get(peer_id) else {
                continue;
            };
            let sim = metric.similarity(query, &peer.vector);
            let worst = results.peek_last().map_or(f32::MIN, |e| e.score.0);
            if results.len() < ef || sim > worst {
                candidates.push(sim, peer_id.clone());
                results.push(sim, peer_id.clone());
                results.truncate(ef);
            }
        }
    }

    results
}

/// Multi-layer top-K search.
///
/// Descends from the entry point with a `beam_width`-candidate beam through
/// layers `max_level..1`, runs one `ef`-wide pass at layer 0, merges live
/// results, and returns up to `k` hits scoring strictly above the floor,
/// ordered by descending similarity.
pub fn knn_search(
    index: &HnswIndex,
    query: &[f32],
    k: usize,
    params: &SearchParams,
) -> Result<Vec<SearchResult>, IndexError> {
    let Some(entry) = index.entry_point.clone() else {
        return Ok(Vec::new());
    };
    if let Some(expected) = index.dimension {
        if query.len() != expected {
            return Err(IndexError::DimensionMismatch {
                expected,
                got: query.len(),
            });
        }
    }

    let ef = params.ef.unwrap_or(index.config.ef_construction);
    let keep = k.max(ef);
    let mut beam: Vec<String> = vec![entry];
    let mut best = WorkingSet::new();

    for layer in (1..=index.max_level).rev() {
        let layer_results = search_layer(index, query, &beam, ef.min(params.beam_width), layer);
        merge_live(index, &layer_results, &mut best);
        best.truncate(keep);
        let next: Vec<String> = layer_results
            .iter()
            .take(params.beam_width)
            .map(|e| e.id.clone())
            .collect();
        if !next.is_empty() {
            beam = next;
        }
    }

    let bottom = search_layer(index, query, &beam, ef, 0);
    merge_live(index, &bottom, &mut best);
    best.truncate(keep);

    let mut hits = Vec::with_capacity(k.min(best.len()));
    for entry in best.iter() {
        if hits.len() == k {
            break;
        }
        let score = entry.score.0;
        if score <= params.floor {
            break;
        }
        let Some(node) = index.nodes.get(&entry.id) else {
            continue;
        };
        if node.deleted {
            continue;
        }
        hits.push(SearchResult {
            id: entry.id.clone(),
            vector: node.vector.clone(),
            score,
        });
    }
    Ok(hits)
}

/// Merge layer results into the running best set, dropping tombstones.
fn merge_live(index: &HnswIndex, layer_results: &WorkingSet, best: &mut WorkingSet) {
    for entry in layer_results.iter() {
        let live = index
            .nodes
            .get(&entry.id)
            .is_some_and(|node| !node.deleted);
        if live {
            best.push(entry.score.0, entry.id.clone());
        }
    }
}
