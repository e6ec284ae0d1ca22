//! HNSW insertion, soft delete, and update.
//!
//! Insertion runs in three phases: a greedy ef=1 descent from the entry
//! point down to the new node's level, a per-layer `ef_construction` search
//! collecting candidate neighbors, and a linking pass that wires
//! bidirectional edges and shrinks any peer pushed over its adjacency cap.
//! Deletes are tombstones; updates are tombstone-then-reinsert with a fresh
//! level draw.

use crate::error::IndexError;
use crate::hnsw::graph::HnswIndex;
use crate::hnsw::node::Node;
use crate::hnsw::search::search_layer;
use crate::hnsw::working_set::WorkingSet;

impl HnswIndex {
    /// Insert a point. Empty ids and empty vectors are silently skipped;
    /// a vector whose length differs from the inferred dimension is
    /// rejected and the index is left unchanged.
    ///
    /// Re-inserting an existing id replaces its record in place; callers
    /// that want the old point tombstoned first should use
    /// [`update_point`](Self::update_point).
    pub fn add_point(&mut self, id: &str, vector: &[f32]) -> Result<(), IndexError> {
        if id.is_empty() {
            tracing::trace!("skipping point with empty id");
            return Ok(());
        }
        if vector.is_empty() {
            tracing::trace!(id, "skipping point with empty vector");
            return Ok(());
        }
        if let Some(expected) = self.dimension {
            if vector.len() != expected {
                return Err(IndexError::DimensionMismatch {
                    expected,
                    got: vector.len(),
                });
            }
        }
        self.insert_node(id.to_string(), vector.to_vec());
        Ok(())
    }

    /// Tombstone the point stored under `id`. The node keeps its adjacency
    /// and stays in the graph as a traversal anchor; queries no longer
    /// return it. Returns `false` if the id is unknown.
    pub fn remove_point(&mut self, id: &str) -> bool {
        match self.nodes.get_mut(id) {
            Some(node) => {
                node.deleted = true;
                tracing::debug!(id, "tombstoned point");
                true
            }
            None => false,
        }
    }

    /// Replace the vector stored under `id`: the existing record is
    /// tombstoned, then a new node with the same id is inserted with a
    /// fresh level draw and fresh adjacency. The new record shadows the old
    /// one in the id map; the old graph positions stay reachable through
    /// peers that still reference the id. An unknown id promotes to a plain
    /// insert.
    pub fn update_point(&mut self, id: &str, vector: &[f32]) -> Result<(), IndexError> {
        if id.is_empty() || vector.is_empty() {
            tracing::trace!("skipping update with empty id or vector");
            return Ok(());
        }
        if !self.nodes.contains_key(id) {
            return self.add_point(id, vector);
        }
        if let Some(expected) = self.dimension {
            if vector.len() != expected {
                return Err(IndexError::DimensionMismatch {
                    expected,
                    got: vector.len(),
                });
            }
        }
        if let Some(old) = self.nodes.get_mut(id) {
            old.deleted = true;
        }
        self.insert_node(id.to_string(), vector.to_vec());
        Ok(())
    }

    /// Clear the index (including the inferred dimension) and insert every
    /// item in order. Stops at the first rejected item.
    pub fn build_index<I>(&mut self, items: I) -> Result<(), IndexError>
    where
        I: IntoIterator<Item = (String, Vec<f32>)>,
    {
        self.clear();
        for (id, vector) in items {
            self.add_point(&id, &vector)?;
        }
        Ok(())
    }

    /// Core insertion. Preconditions (non-empty id and vector, dimension
    /// match) are already checked; on an update path the old record is
    /// already tombstoned but still in the map, so the search phases can
    /// traverse its adjacency.
    fn insert_node(&mut self, id: String, vector: Vec<f32>) {
        let level = self.random_level();

        // First node: becomes the entry point and fixes the dimension.
        if self.entry_point.is_none() {
            self.dimension = Some(vector.len());
            self.max_level = level;
            self.entry_point = Some(id.clone());
            tracing::debug!(id = %id, level, "inserted first point");
            self.nodes.insert(id.clone(), Node::new(id, vector, level));
            return;
        }

        let entry = self
            .entry_point
            .clone()
            .expect("entry point exists after is_none() guard");

        // Phase 1: greedy descent with ef=1 from the top layer down to the
        // layer just above the new node's level.
        let mut entry_points: Vec<String> = vec![entry];
        for layer in (level + 1..=self.max_level).rev() {
            let nearest = search_layer(self, &vector, &entry_points, 1, layer);
            if let Some(best) = nearest.peek_first() {
                entry_points = vec![best.id.clone()];
            }
        }

        // Phase 2: search each layer the node participates in and select
        // its neighbors (top-cap by similarity; the working set order is
        // deterministic). The full working set seeds the next layer down.
        let top = level.min(self.max_level);
        let mut per_layer: Vec<Vec<String>> = vec![Vec::new(); level + 1];
        for layer in (0..=top).rev() {
            let found = search_layer(
                self,
                &vector,
                &entry_points,
                self.config.ef_construction,
                layer,
            );
            let cap = self.config.max_neighbors(layer);
            per_layer[layer] = found
                .iter()
                .filter(|e| e.id != id)
                .take(cap)
                .map(|e| e.id.clone())
                .collect();
            entry_points = found.ids();
            if entry_points.is_empty() {
                entry_points = vec![self
                    .entry_point
                    .clone()
                    .expect("entry point exists while the index is non-empty")];
            }
        }

        // Phase 3: store the node, then wire bidirectional edges and shrink
        // any peer now over its cap.
        let mut node = Node::new(id.clone(), vector, level);
        node.neighbors = per_layer;
        self.nodes.insert(id.clone(), node);

        for layer in 0..=top {
            let cap = self.config.max_neighbors(layer);
            let selected = match self.nodes.get(&id) {
                Some(n) => n.neighbors_at(layer).to_vec(),
                None => break,
            };
            for peer_id in selected {
                let needs_shrink = {
                    let Some(peer) = self.nodes.get_mut(&peer_id) else {
                        continue;
                    };
                    // A peer reached through stale references can sit below
                    // this layer; give it the missing layer lists so the
                    // back-link keeps adjacency symmetric.
                    while peer.neighbors.len() <= layer {
                        peer.neighbors.push(Vec::new());
                    }
                    peer.prune_empty_neighbors(layer);
                    if !peer.has_neighbor(layer, &id) {
                        peer.push_neighbor(layer, id.clone());
                    }
                    peer.neighbors_at(layer).len() > cap
                };
                if needs_shrink {
                    self.shrink_neighbors(&peer_id, layer, cap);
                }
            }
        }

        if level > self.max_level {
            self.max_level = level;
            self.entry_point = Some(id.clone());
            tracing::debug!(id = %id, level, "promoted entry point");
        }
    }

    /// Rebuild the adjacency of `id` at `layer` as the top-`cap` current
    /// neighbors ranked by similarity to the node's own vector. Empty-id
    /// sentinels, self references, and dangling ids are dropped, and every
    /// pruned edge is removed from the far side too, keeping adjacency
    /// symmetric.
    fn shrink_neighbors(&mut self, id: &str, layer: usize, cap: usize) {
        let (base, current) = match self.nodes.get(id) {
            Some(node) => (node.vector.clone(), node.neighbors_at(layer).to_vec()),
            None => return,
        };
        let metric = self.config.metric;
        let mut ranked = WorkingSet::new();
        for peer_id in &current {
            if peer_id.is_empty() || peer_id == id {
                continue;
            }
            if let Some(peer) = self.nodes.get(peer_id) {
                ranked.push(metric.similarity(&base, &peer.vector), peer_id.clone());
            }
        }
        ranked.truncate(cap);
        let kept = ranked.ids();

        for peer_id in &current {
            if kept.iter().any(|k| k == peer_id) {
                continue;
            }
            if let Some(peer) = self.nodes.get_mut(peer_id) {
                if let Some(list) = peer.neighbors.get_mut(layer) {
                    list.retain(|p| p != id);
                }
            }
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.neighbors[layer] = kept;
        }
    }
}
