//! Per-point node record.
//!
//! A node stores the point's id, vector, top level, per-layer adjacency,
//! and tombstone flag. The serde field names are the stable snapshot
//! layout shared with other implementations of the same index format, so
//! they must not change: `uniqueid`, `level`, `vector`, `neighbors`,
//! `deleted`.

use serde::{Deserialize, Serialize};

/// A single indexed point and its graph state.
///
/// `neighbors[l]` is the adjacency list at layer `l`, for `l` in
/// `0..=level`. Tombstoned nodes keep their adjacency and remain traversal
/// anchors; they are excluded from query results only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Caller-supplied id, unique across live nodes.
    #[serde(rename = "uniqueid")]
    pub id: String,
    /// Highest layer this node participates in.
    pub level: usize,
    /// The point's vector.
    pub vector: Vec<f32>,
    /// Per-layer adjacency, indexed by layer.
    pub neighbors: Vec<Vec<String>>,
    /// Tombstone flag. Older snapshots without the field read as live.
    #[serde(default)]
    pub deleted: bool,
}

impl Node {
    /// Create a live node with empty adjacency lists for layers `0..=level`.
    pub fn new(id: String, vector: Vec<f32>, level: usize) -> Self {
        Self {
            id,
            level,
            vector,
            neighbors: vec![Vec::new(); level + 1],
            deleted: false,
        }
    }

    /// Adjacency at `layer`, or an empty slice past the node's top level.
    #[inline]
    pub fn neighbors_at(&self, layer: usize) -> &[String] {
        self.neighbors.get(layer).map_or(&[], |l| l.as_slice())
    }

    /// Drop legacy empty-string entries from the adjacency at `layer`.
    ///
    /// Blobs written by older implementations can carry empty-id sentinels;
    /// they are pruned whenever a list is touched.
    pub fn prune_empty_neighbors(&mut self, layer: usize) {
        if let Some(list) = self.neighbors.get_mut(layer) {
            list.retain(|id| !id.is_empty());
        }
    }

    /// Whether `peer` is already linked at `layer`.
    #[inline]
    pub fn has_neighbor(&self, layer: usize, peer: &str) -> bool {
        self.neighbors_at(layer).iter().any(|id| id == peer)
    }

    /// Append `peer` to the adjacency at `layer` (no presence check).
    pub fn push_neighbor(&mut self, layer: usize, peer: String) {
        if let Some(list) = self.neighbors.get_mut(layer) {
            list.push(peer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_node_adjacency_shape() {
        let n = Node::new("a".into(), vec![1.0, 0.0], 3);
        assert_eq!(n.neighbors.len(), 4);
        assert!(n.neighbors.iter().all(|l| l.is_empty()));
        assert!(!n.deleted);
    }

    #[test]
    fn test_neighbors_at_out_of_range_is_empty() {
        let n = Node::new("a".into(), vec![1.0], 0);
        assert!(n.neighbors_at(0).is_empty());
        assert!(n.neighbors_at(7).is_empty());
    }

    #[test]
    fn test_prune_empty_neighbors() {
        let mut n = Node::new("a".into(), vec![1.0], 0);
        n.neighbors[0] = vec!["".into(), "b".into(), "".into(), "c".into()];
        n.prune_empty_neighbors(0);
        assert_eq!(n.neighbors[0], vec!["b".to_string(), "c".to_string()]);
        // pruning a missing layer is a no-op
        n.prune_empty_neighbors(5);
    }

    #[test]
    fn test_has_and_push_neighbor() {
        let mut n = Node::new("a".into(), vec![1.0], 1);
        assert!(!n.has_neighbor(1, "b"));
        n.push_neighbor(1, "b".into());
        assert!(n.has_neighbor(1, "b"));
        assert!(!n.has_neighbor(0, "b"));
    }

    #[test]
    fn test_serde_field_names_are_stable() {
        let n = Node::new("p1".into(), vec![0.5, 0.25], 1);
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["uniqueid"], "p1");
        assert_eq!(json["level"], 1);
        assert_eq!(json["vector"].as_array().unwrap().len(), 2);
        assert_eq!(json["neighbors"].as_array().unwrap().len(), 2);
        assert_eq!(json["deleted"], false);
    }

    #[test]
    fn test_missing_deleted_field_reads_as_live() {
        let json = r#"{"uniqueid":"x","level":0,"vector":[1.0],"neighbors":[[]]}"#;
        let n: Node = serde_json::from_str(json).unwrap();
        assert!(!n.deleted);
    }
}
