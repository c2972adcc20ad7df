//! Synchronized graph store shared by controllers and traversal workers

use crate::diff::{DiffEngine, GraphDiff};
use crate::error::{GraphError, GraphResult};
use crate::graph::Graph;
use crate::model::*;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

/// How many unread diffs a slow subscriber may fall behind by.
const DIFF_CHANNEL_CAPACITY: usize = 256;

struct StoreState {
    graph: Graph,
    diffs: DiffEngine,
    epoch: u64,
}

/// The single piece of state shared between controllers and traversal runs.
///
/// Cloning is cheap and yields a handle onto the same graph. Every
/// operation takes the lock exactly once, so readers only ever see a graph
/// with each mutation fully applied or not applied at all. Labels passed in
/// are run through [`normalize_label`] first.
#[derive(Clone)]
pub struct GraphStore {
    state: Arc<RwLock<StoreState>>,
    diff_tx: broadcast::Sender<GraphDiff>,
}

impl std::fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphStore")
            .field("subscribers", &self.diff_tx.receiver_count())
            .finish()
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphStore {
    /// A store holding the default graph.
    pub fn new() -> Self {
        Self::from_graph(Graph::with_defaults())
    }

    pub fn from_graph(graph: Graph) -> Self {
        let (diff_tx, _) = broadcast::channel(DIFF_CHANNEL_CAPACITY);
        GraphStore {
            state: Arc::new(RwLock::new(StoreState {
                graph,
                diffs: DiffEngine::new(),
                epoch: 0,
            })),
            diff_tx,
        }
    }

    /// Receive a [`GraphDiff`] for every successful mutation, in order.
    pub fn subscribe(&self) -> broadcast::Receiver<GraphDiff> {
        self.diff_tx.subscribe()
    }

    fn publish(&self, diff: GraphDiff) {
        debug!(sequence = diff.sequence, "publishing graph diff");
        // No subscribers is fine.
        let _ = self.diff_tx.send(diff);
    }

    pub async fn add_node(&self, id: &str) -> GraphResult<()> {
        self.add_node_connected(id, None).await
    }

    /// Insert a node and optionally wire it to an existing one, as one step.
    ///
    /// If `connect_to` is given and unknown, nothing is inserted.
    pub async fn add_node_connected(&self, id: &str, connect_to: Option<&str>) -> GraphResult<()> {
        let label = normalize_label(id);
        let target = connect_to.map(normalize_label);

        let mut state = self.state.write().await;
        if label.is_empty() {
            return Err(GraphError::InvalidId(id.to_string()));
        }
        if let Some(target) = &target {
            if !state.graph.contains(target) && *target != label {
                return Err(GraphError::UnknownNode(target.clone()));
            }
        }
        state.graph.add_node(&label)?;

        let mut diff = state.diffs.next_diff();
        diff.added_nodes.push(label.clone());
        if let Some(target) = target {
            if state.graph.add_edge(&label, &target)? == EdgeChange::Added {
                diff.added_edges.push(EdgePair::new(label.clone(), target));
            }
        }
        info!(node = %label, "node added");
        self.publish(diff);
        Ok(())
    }

    pub async fn remove_node(&self, id: &str) -> GraphResult<()> {
        let label = normalize_label(id);
        let mut state = self.state.write().await;
        let former = state.graph.remove_node(&label)?;

        let mut diff = state.diffs.next_diff();
        diff.removed_edges = former
            .into_iter()
            .map(|neighbor| EdgePair::new(label.clone(), neighbor))
            .collect();
        diff.removed_nodes.push(label.clone());
        info!(node = %label, "node removed");
        self.publish(diff);
        Ok(())
    }

    /// Connect `a` and `b`. Adding an edge that already exists is a no-op.
    pub async fn add_edge(&self, a: &str, b: &str) -> GraphResult<EdgeChange> {
        let (a, b) = (normalize_label(a), normalize_label(b));
        let mut state = self.state.write().await;
        let change = state.graph.add_edge(&a, &b)?;

        if change == EdgeChange::Added {
            let mut diff = state.diffs.next_diff();
            diff.added_edges.push(EdgePair::new(a.clone(), b.clone()));
            info!(%a, %b, "edge added");
            self.publish(diff);
        } else {
            debug!(%a, %b, ?change, "edge not added");
        }
        Ok(change)
    }

    /// Adjacent labels in edge insertion order.
    pub async fn neighbors(&self, id: &str) -> GraphResult<Vec<String>> {
        let state = self.state.read().await;
        state.graph.neighbors(&normalize_label(id))
    }

    /// Like [`neighbors`](Self::neighbors), plus the epoch the read was made in.
    pub async fn neighbors_with_epoch(&self, id: &str) -> (u64, GraphResult<Vec<String>>) {
        let state = self.state.read().await;
        (state.epoch, state.graph.neighbors(&normalize_label(id)))
    }

    /// Check that every label exists; returns the current epoch if so.
    pub async fn require_nodes(&self, ids: &[&str]) -> GraphResult<u64> {
        let state = self.state.read().await;
        for id in ids {
            let label = normalize_label(id);
            if !state.graph.contains(&label) {
                return Err(GraphError::UnknownNode(label));
            }
        }
        Ok(state.epoch)
    }

    /// Replace the whole graph with the default one and bump the epoch.
    pub async fn reset(&self) {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let fresh = Graph::with_defaults();
        let mut diff = state.diffs.compute_diff(&state.graph, &fresh);
        diff.reset = true;
        state.graph = fresh;
        state.epoch += 1;
        info!(epoch = state.epoch, "graph reset");
        self.publish(diff);
    }

    pub async fn epoch(&self) -> u64 {
        self.state.read().await.epoch
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.state.read().await.graph.contains(&normalize_label(id))
    }

    pub async fn node_count(&self) -> usize {
        self.state.read().await.graph.node_count()
    }

    pub async fn edge_count(&self) -> usize {
        self.state.read().await.graph.edge_count()
    }

    /// Labels in insertion order.
    pub async fn nodes(&self) -> Vec<String> {
        self.state.read().await.graph.nodes()
    }

    pub async fn edges(&self) -> Vec<EdgePair> {
        self.state.read().await.graph.edges()
    }

    pub async fn snapshot(&self) -> GraphSnapshot {
        let state = self.state.read().await;
        GraphSnapshot {
            epoch: state.epoch,
            nodes: state.graph.nodes(),
            edges: state.graph.edges(),
        }
    }

    /// Copy of the underlying graph, for structural comparisons.
    pub async fn graph(&self) -> Graph {
        self.state.read().await.graph.clone()
    }
}
