//! Mutation serializer and the index/store composition.
//!
//! [`VectorStore`] owns an engine behind an `Arc<RwLock>` and a FIFO
//! command queue drained by a single worker task. Every mutating operation
//! enters the queue with a oneshot reply and runs to completion before the
//! next starts; operations enqueued in order take effect in that order, and
//! a failing operation rejects only its own reply. Reads bypass the queue
//! on a shared lock lease that blocks the writer, so they never observe a
//! half-applied mutation.
//!
//! After each drained batch of successful mutations the worker persists one
//! snapshot under the reserved `"primary"` key (when a store is attached
//! and autosave is on). An optional offload mode ships each mutation to a
//! blocking executor holding its own deserialized copy of the index and
//! replaces the owner's state from the returned blob.

use crate::error::StoreError;
use crate::store::BlobStore;
use parking_lot::RwLock;
use smallworld_core::hnsw::search::knn_search;
use smallworld_core::{HnswConfig, HnswIndex, Node, SearchParams, SearchResult};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Reserved key holding the current snapshot blob.
pub const SNAPSHOT_KEY: &str = "primary";

/// Depth of the command queue before enqueueing backpressures.
const COMMAND_QUEUE_DEPTH: usize = 1024;

/// Maximum commands drained per batch before the autosave point.
const MUTATION_BATCH_MAX: usize = 64;

/// Progress callback for rebuilds, invoked with a percentage in `[0, 100]`.
pub type ProgressFn = Box<dyn FnMut(f32) + Send>;

/// Configuration for a [`VectorStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Index name; also the blob store directory name.
    pub name: String,
    /// Root directory for blob storage. `None` keeps the index memory-only.
    pub data_dir: Option<PathBuf>,
    /// Persist a snapshot after each batch of committed mutations.
    pub autosave: bool,
    /// Apply each mutation on a detached copy in a blocking executor and
    /// swap the result in, instead of mutating in place.
    pub offload: bool,
    /// Engine configuration used when no snapshot exists yet.
    pub hnsw: HnswConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: "index".to_string(),
            data_dir: None,
            autosave: true,
            offload: false,
            hnsw: HnswConfig::default(),
        }
    }
}

enum Mutation {
    Add { id: String, vector: Vec<f32> },
    Remove { id: String },
    Update { id: String, vector: Vec<f32> },
    Build { items: Vec<(String, Vec<f32>)> },
    Replace { blob: Vec<u8> },
    Rebuild { progress: Option<ProgressFn> },
}

enum Command {
    Mutate {
        op: Mutation,
        done: oneshot::Sender<Result<(), StoreError>>,
    },
    Save {
        done: oneshot::Sender<Result<(), StoreError>>,
    },
    Load {
        done: oneshot::Sender<Result<(), StoreError>>,
    },
}

/// An HNSW index composed with a blob store, mutated through a single
/// worker task.
///
/// Cloning the handle is cheap; all clones share the same index and queue.
#[derive(Clone, Debug)]
pub struct VectorStore {
    index: Arc<RwLock<HnswIndex>>,
    commands: mpsc::Sender<Command>,
}

impl VectorStore {
    /// Open a store: loads the `"primary"` snapshot when one exists,
    /// otherwise starts an empty index, then spawns the mutation worker.
    ///
    /// Must be called within a tokio runtime.
    pub fn open(config: StoreConfig) -> Result<Self, StoreError> {
        let store = match &config.data_dir {
            Some(root) => Some(BlobStore::open(root, &config.name)?),
            None => None,
        };

        let index = match store.as_ref().map(|s| s.get_blob(SNAPSHOT_KEY)) {
            Some(Ok(blob)) => HnswIndex::from_snapshot(&blob)?,
            Some(Err(StoreError::SnapshotMissing(_))) => {
                tracing::info!(name = %config.name, "no snapshot found, starting empty");
                HnswIndex::new(config.hnsw.clone())
            }
            Some(Err(e)) => return Err(e),
            None => HnswIndex::new(config.hnsw.clone()),
        };

        let index = Arc::new(RwLock::new(index));
        let (commands, queue) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        tokio::spawn(worker_loop(Arc::clone(&index), store, queue, config));
        Ok(Self { index, commands })
    }

    async fn submit(&self, build: impl FnOnce(oneshot::Sender<Result<(), StoreError>>) -> Command) -> Result<(), StoreError> {
        let (done, reply) = oneshot::channel();
        self.commands
            .send(build(done))
            .await
            .map_err(|_| StoreError::WorkerStopped)?;
        reply.await.map_err(|_| StoreError::WorkerStopped)?
    }

    async fn mutate(&self, op: Mutation) -> Result<(), StoreError> {
        self.submit(|done| Command::Mutate { op, done }).await
    }

    /// Insert a point. Empty ids and vectors are silently skipped.
    pub async fn add_point(&self, id: &str, vector: &[f32]) -> Result<(), StoreError> {
        self.mutate(Mutation::Add {
            id: id.to_string(),
            vector: vector.to_vec(),
        })
        .await
    }

    /// Tombstone a point; unknown ids are a no-op.
    pub async fn remove_point(&self, id: &str) -> Result<(), StoreError> {
        self.mutate(Mutation::Remove { id: id.to_string() }).await
    }

    /// Tombstone-and-reinsert a point; unknown ids promote to insert.
    pub async fn update_point(&self, id: &str, vector: &[f32]) -> Result<(), StoreError> {
        self.mutate(Mutation::Update {
            id: id.to_string(),
            vector: vector.to_vec(),
        })
        .await
    }

    /// Clear the index and insert every item in order.
    pub async fn build_index(&self, items: Vec<(String, Vec<f32>)>) -> Result<(), StoreError> {
        self.mutate(Mutation::Build { items }).await
    }

    /// Replace the index state wholesale from a snapshot blob.
    pub async fn from_snapshot(&self, blob: Vec<u8>) -> Result<(), StoreError> {
        self.mutate(Mutation::Replace { blob }).await
    }

    /// Rebuild the graph from its live records, re-drawing levels.
    /// `progress` receives percentages in `[0, 100]`.
    pub async fn rebuild(&self, progress: Option<ProgressFn>) -> Result<(), StoreError> {
        self.mutate(Mutation::Rebuild { progress }).await
    }

    /// Persist the current snapshot under the reserved key now.
    pub async fn save(&self) -> Result<(), StoreError> {
        self.submit(|done| Command::Save { done }).await
    }

    /// Reload the index from the stored snapshot, replacing current state.
    pub async fn load(&self) -> Result<(), StoreError> {
        self.submit(|done| Command::Load { done }).await
    }

    /// Top-K similarity search. Runs outside the queue on a shared read
    /// lease; concurrent mutations wait for it.
    pub fn search_knn(
        &self,
        query: &[f32],
        k: usize,
        params: &SearchParams,
    ) -> Result<Vec<SearchResult>, StoreError> {
        Ok(knn_search(&self.index.read(), query, k, params)?)
    }

    /// Fetch a point's record (live or tombstoned).
    pub fn get_node(&self, id: &str) -> Option<Node> {
        self.index.read().get(id).cloned()
    }

    /// Serialize the current index state.
    pub fn to_snapshot(&self) -> Result<Vec<u8>, StoreError> {
        Ok(self.index.read().to_snapshot()?)
    }

    /// Number of live points.
    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }
}

/// Single-owner worker: drains the queue in FIFO order, applies each
/// command to completion, and autosaves once per batch of successful
/// mutations.
async fn worker_loop(
    index: Arc<RwLock<HnswIndex>>,
    store: Option<BlobStore>,
    mut queue: mpsc::Receiver<Command>,
    config: StoreConfig,
) {
    while let Some(first) = queue.recv().await {
        let mut batch = vec![first];
        while batch.len() < MUTATION_BATCH_MAX {
            match queue.try_recv() {
                Ok(command) => batch.push(command),
                Err(_) => break,
            }
        }

        let mut dirty = false;
        for command in batch {
            match command {
                Command::Mutate { op, done } => {
                    let result = if config.offload {
                        apply_offloaded(&index, op).await
                    } else {
                        apply_op(&mut index.write(), op)
                    };
                    if result.is_ok() {
                        dirty = true;
                    }
                    let _ = done.send(result);
                }
                Command::Save { done } => {
                    let result = persist(&index, store.as_ref());
                    if result.is_ok() {
                        dirty = false;
                    }
                    let _ = done.send(result);
                }
                Command::Load { done } => {
                    let _ = done.send(load_into(&index, store.as_ref()));
                }
            }
        }

        if dirty && config.autosave {
            if let Err(e) = persist(&index, store.as_ref()) {
                tracing::warn!(error = %e, "autosave failed");
            }
        }
    }
    tracing::debug!("mutation worker stopped");
}

fn apply_op(engine: &mut HnswIndex, op: Mutation) -> Result<(), StoreError> {
    match op {
        Mutation::Add { id, vector } => engine.add_point(&id, &vector)?,
        Mutation::Remove { id } => {
            engine.remove_point(&id);
        }
        Mutation::Update { id, vector } => engine.update_point(&id, &vector)?,
        Mutation::Build { items } => engine.build_index(items)?,
        Mutation::Replace { blob } => {
            // parse first so a bad blob leaves the current state intact
            *engine = HnswIndex::from_snapshot(&blob)?;
        }
        Mutation::Rebuild { progress } => match progress {
            Some(mut report) => engine.rebuild(move |p| report(p)),
            None => engine.rebuild(|_| {}),
        },
    }
    Ok(())
}

/// Offload path: serialize, mutate a detached copy on the blocking
/// executor, and swap the result in. Nothing mutable is shared across the
/// boundary.
async fn apply_offloaded(
    index: &Arc<RwLock<HnswIndex>>,
    op: Mutation,
) -> Result<(), StoreError> {
    let blob = index.read().to_snapshot()?;
    let updated = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, StoreError> {
        let mut detached = HnswIndex::from_snapshot(&blob)?;
        apply_op(&mut detached, op)?;
        Ok(detached.to_snapshot()?)
    })
    .await
    .map_err(|_| StoreError::WorkerStopped)??;

    *index.write() = HnswIndex::from_snapshot(&updated)?;
    Ok(())
}

fn persist(index: &RwLock<HnswIndex>, store: Option<&BlobStore>) -> Result<(), StoreError> {
    let Some(store) = store else {
        return Ok(());
    };
    let blob = index.read().to_snapshot()?;
    store.put_blob(SNAPSHOT_KEY, &blob)
}

fn load_into(index: &RwLock<HnswIndex>, store: Option<&BlobStore>) -> Result<(), StoreError> {
    let Some(store) = store else {
        return Err(StoreError::SnapshotMissing(SNAPSHOT_KEY.to_string()));
    };
    let blob = store.get_blob(SNAPSHOT_KEY)?;
    let loaded = HnswIndex::from_snapshot(&blob)?;
    *index.write() = loaded;
    Ok(())
}
