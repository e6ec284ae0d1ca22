//! Snapshot round-trip in the interop JSON schema.
//!
//! The wire form is JSON with fixed field names shared with other
//! implementations of the same index format: `M`, `efConstruction`,
//! `levelMax`, `entryPointId`, and per-node records keyed `uniqueid` /
//! `level` / `vector` / `neighbors` / `deleted`. A supplemental `metric`
//! tag defaults to cosine so blobs written without it load unchanged.
//!
//! Serialization sorts nodes by id, making `to_snapshot` byte-stable for a
//! given index state. Deserialization reconstructs the similarity function
//! and level probability table from `M` and the metric tag, prunes legacy
//! empty-string adjacency entries, and validates the result before handing
//! it back.

use crate::error::IndexError;
use crate::hnsw::graph::{HnswConfig, HnswIndex};
use crate::hnsw::node::Node;
use crate::hnsw::similarity::SimilarityMetric;
use serde::{Deserialize, Serialize};

/// Wire layout of a serialized index.
#[derive(Debug, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "M")]
    pub m: usize,
    #[serde(rename = "efConstruction")]
    pub ef_construction: usize,
    #[serde(rename = "levelMax")]
    pub level_max: usize,
    /// Entry point id; empty string when the index is empty.
    #[serde(rename = "entryPointId")]
    pub entry_point_id: String,
    /// `(id, record)` pairs, sorted by id.
    pub nodes: Vec<(String, Node)>,
    /// Similarity metric; absent in blobs from older writers.
    #[serde(default)]
    pub metric: SimilarityMetric,
}

impl HnswIndex {
    /// Serialize the index to its opaque snapshot blob.
    pub fn to_snapshot(&self) -> Result<Vec<u8>, IndexError> {
        let mut nodes: Vec<(String, Node)> = self
            .nodes
            .iter()
            .map(|(id, node)| (id.clone(), node.clone()))
            .collect();
        nodes.sort_by(|a, b| a.0.cmp(&b.0));

        let snapshot = Snapshot {
            m: self.config.m,
            ef_construction: self.config.ef_construction,
            level_max: self.max_level,
            entry_point_id: self.entry_point.clone().unwrap_or_default(),
            nodes,
            metric: self.config.metric,
        };
        let bytes = serde_json::to_vec(&snapshot)?;
        tracing::debug!(
            bytes = bytes.len(),
            nodes = snapshot.nodes.len(),
            "serialized index snapshot"
        );
        Ok(bytes)
    }

    /// Rebuild an index from a snapshot blob, replacing all state.
    ///
    /// The level-0 cap is not part of the wire schema and reconstructs as
    /// `M`.
    pub fn from_snapshot(bytes: &[u8]) -> Result<Self, IndexError> {
        let snapshot: Snapshot = serde_json::from_slice(bytes)?;
        let node_count = snapshot.nodes.len();

        let config = HnswConfig {
            m: snapshot.m,
            m_max0: snapshot.m,
            ef_construction: snapshot.ef_construction,
            metric: snapshot.metric,
        };
        let mut index = HnswIndex::new(config);
        index.max_level = snapshot.level_max;
        index.entry_point = if snapshot.entry_point_id.is_empty() {
            None
        } else {
            Some(snapshot.entry_point_id)
        };

        for (key, mut node) in snapshot.nodes {
            if key != node.id {
                return Err(IndexError::SnapshotInvalid(format!(
                    "node key '{key}' does not match record id '{}'",
                    node.id
                )));
            }
            for layer in 0..node.neighbors.len() {
                node.prune_empty_neighbors(layer);
            }
            index.nodes.insert(key, node);
        }

        index.dimension = index.nodes.values().next().map(|n| n.vector.len());
        index.validate_loaded()?;
        tracing::info!(nodes = node_count, "loaded index snapshot");
        Ok(index)
    }

    /// Structural checks after deserialization: entry-point soundness,
    /// dimension uniformity, resolvable adjacency.
    fn validate_loaded(&self) -> Result<(), IndexError> {
        match (&self.entry_point, self.nodes.is_empty()) {
            (None, false) => {
                return Err(IndexError::SnapshotInvalid(
                    "non-empty index without an entry point".into(),
                ))
            }
            (Some(ep), true) => {
                return Err(IndexError::SnapshotInvalid(format!(
                    "entry point '{ep}' on an empty index"
                )))
            }
            (Some(ep), false) => match self.nodes.get(ep) {
                None => {
                    return Err(IndexError::SnapshotInvalid(format!(
                        "entry point '{ep}' does not resolve"
                    )))
                }
                Some(node) if node.level != self.max_level => {
                    // A shadowing update can leave the anchor below levelMax;
                    // traversal tolerates it, so the blob stays loadable.
                    tracing::warn!(
                        entry = ep.as_str(),
                        level = node.level,
                        level_max = self.max_level,
                        "entry point sits below levelMax"
                    );
                }
                Some(_) => {}
            },
            (None, true) => {}
        }

        if let Some(dim) = self.dimension {
            for node in self.nodes.values() {
                if node.vector.len() != dim {
                    return Err(IndexError::SnapshotInvalid(format!(
                        "node '{}' has dimension {} (index stores {dim})",
                        node.id,
                        node.vector.len()
                    )));
                }
            }
        }

        for node in self.nodes.values() {
            for (layer, list) in node.neighbors.iter().enumerate() {
                for peer in list {
                    if !self.nodes.contains_key(peer) {
                        return Err(IndexError::SnapshotInvalid(format!(
                            "node '{}' references unknown '{peer}' at layer {layer}",
                            node.id
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hnsw::search::{knn_search, SearchParams};

    fn sample_index() -> HnswIndex {
        let mut idx = HnswIndex::new(HnswConfig {
            m: 4,
            m_max0: 4,
            ef_construction: 10,
            metric: SimilarityMetric::Cosine,
        });
        idx.add_point("a", &[1.0, 0.0, 0.0]).unwrap();
        idx.add_point("b", &[0.0, 1.0, 0.0]).unwrap();
        idx.add_point("c", &[0.0, 0.0, 1.0]).unwrap();
        idx.remove_point("c");
        idx
    }

    #[test]
    fn test_round_trip_preserves_state() {
        let idx = sample_index();
        let blob = idx.to_snapshot().unwrap();
        let loaded = HnswIndex::from_snapshot(&blob).unwrap();

        assert_eq!(loaded.config.m, 4);
        assert_eq!(loaded.config.ef_construction, 10);
        assert_eq!(loaded.config.metric, SimilarityMetric::Cosine);
        assert_eq!(loaded.max_level, idx.max_level);
        assert_eq!(loaded.entry_point, idx.entry_point);
        assert_eq!(loaded.dimension, Some(3));
        assert_eq!(loaded.nodes.len(), 3);
        assert!(loaded.get("c").unwrap().deleted);
        for (id, node) in &idx.nodes {
            let other = loaded.get(id).unwrap();
            assert_eq!(other.vector, node.vector);
            assert_eq!(other.level, node.level);
            assert_eq!(other.neighbors, node.neighbors);
        }
    }

    #[test]
    fn test_to_snapshot_is_byte_stable() {
        let idx = sample_index();
        let blob = idx.to_snapshot().unwrap();
        let reloaded = HnswIndex::from_snapshot(&blob).unwrap();
        assert_eq!(blob, reloaded.to_snapshot().unwrap());
    }

    #[test]
    fn test_wire_field_names() {
        let idx = sample_index();
        let blob = idx.to_snapshot().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&blob).unwrap();
        assert_eq!(json["M"], 4);
        assert_eq!(json["efConstruction"], 10);
        assert!(json["levelMax"].is_number());
        assert!(json["entryPointId"].is_string());
        let first = &json["nodes"][0];
        assert_eq!(first[0], "a");
        assert_eq!(first[1]["uniqueid"], "a");
        assert!(first[1]["vector"].is_array());
        assert!(first[1]["neighbors"].is_array());
        assert!(first[1]["deleted"].is_boolean());
    }

    #[test]
    fn test_empty_index_round_trip() {
        let idx = HnswIndex::with_default_config();
        let blob = idx.to_snapshot().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&blob).unwrap();
        assert_eq!(json["entryPointId"], "");
        let loaded = HnswIndex::from_snapshot(&blob).unwrap();
        assert!(loaded.is_empty());
        assert!(loaded.entry_point.is_none());
        assert!(loaded.dimension.is_none());
    }

    #[test]
    fn test_legacy_blob_without_metric_or_deleted() {
        let blob = r#"{
            "M": 4,
            "efConstruction": 10,
            "levelMax": 0,
            "entryPointId": "p",
            "nodes": [["p", {"uniqueid": "p", "level": 0, "vector": [1.0, 0.0], "neighbors": [[]]}]]
        }"#;
        let loaded = HnswIndex::from_snapshot(blob.as_bytes()).unwrap();
        assert_eq!(loaded.config.metric, SimilarityMetric::Cosine);
        assert!(!loaded.get("p").unwrap().deleted);
    }

    #[test]
    fn test_legacy_empty_string_neighbors_pruned_on_load() {
        let blob = r#"{
            "M": 4,
            "efConstruction": 10,
            "levelMax": 0,
            "entryPointId": "p",
            "nodes": [
                ["p", {"uniqueid": "p", "level": 0, "vector": [1.0], "neighbors": [["", "q", ""]], "deleted": false}],
                ["q", {"uniqueid": "q", "level": 0, "vector": [2.0], "neighbors": [["p"]], "deleted": false}]
            ]
        }"#;
        let loaded = HnswIndex::from_snapshot(blob.as_bytes()).unwrap();
        assert_eq!(loaded.get("p").unwrap().neighbors_at(0), ["q".to_string()]);
    }

    #[test]
    fn test_mismatched_node_key_rejected() {
        let blob = r#"{
            "M": 4, "efConstruction": 10, "levelMax": 0, "entryPointId": "p",
            "nodes": [["p", {"uniqueid": "other", "level": 0, "vector": [1.0], "neighbors": [[]], "deleted": false}]]
        }"#;
        let err = HnswIndex::from_snapshot(blob.as_bytes()).unwrap_err();
        assert!(matches!(err, IndexError::SnapshotInvalid(_)));
    }

    #[test]
    fn test_dangling_neighbor_rejected() {
        let blob = r#"{
            "M": 4, "efConstruction": 10, "levelMax": 0, "entryPointId": "p",
            "nodes": [["p", {"uniqueid": "p", "level": 0, "vector": [1.0], "neighbors": [["ghost"]], "deleted": false}]]
        }"#;
        let err = HnswIndex::from_snapshot(blob.as_bytes()).unwrap_err();
        assert!(matches!(err, IndexError::SnapshotInvalid(_)));
    }

    #[test]
    fn test_uneven_dimensions_rejected() {
        let blob = r#"{
            "M": 4, "efConstruction": 10, "levelMax": 0, "entryPointId": "p",
            "nodes": [
                ["p", {"uniqueid": "p", "level": 0, "vector": [1.0, 2.0], "neighbors": [[]], "deleted": false}],
                ["q", {"uniqueid": "q", "level": 0, "vector": [1.0], "neighbors": [[]], "deleted": false}]
            ]
        }"#;
        let err = HnswIndex::from_snapshot(blob.as_bytes()).unwrap_err();
        assert!(matches!(err, IndexError::SnapshotInvalid(_)));
    }

    #[test]
    fn test_missing_entry_point_rejected() {
        let blob = r#"{
            "M": 4, "efConstruction": 10, "levelMax": 0, "entryPointId": "",
            "nodes": [["p", {"uniqueid": "p", "level": 0, "vector": [1.0], "neighbors": [[]], "deleted": false}]]
        }"#;
        let err = HnswIndex::from_snapshot(blob.as_bytes()).unwrap_err();
        assert!(matches!(err, IndexError::SnapshotInvalid(_)));
    }

    #[test]
    fn test_garbage_blob_is_decode_error() {
        let err = HnswIndex::from_snapshot(b"not json at all").unwrap_err();
        assert!(matches!(err, IndexError::SnapshotDecode(_)));
    }

    #[test]
    fn test_loaded_index_answers_queries() {
        let idx = sample_index();
        let blob = idx.to_snapshot().unwrap();
        let loaded = HnswIndex::from_snapshot(&blob).unwrap();
        let hits = knn_search(&loaded, &[1.0, 0.0, 0.0], 1, &SearchParams::default()).unwrap();
        assert_eq!(hits[0].id, "a");
    }
}
