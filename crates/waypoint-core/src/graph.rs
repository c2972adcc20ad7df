//! Graph wrapper using petgraph::StableUnGraph keyed by node label

use crate::error::{GraphError, GraphResult};
use crate::model::*;
use petgraph::stable_graph::{NodeIndex, StableUnGraph};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

/// Node weight: the label plus the order it was inserted in.
#[derive(Debug, Clone)]
struct NodeSlot {
    label: String,
    seq: u64,
}

/// The undirected, unweighted graph. Not synchronized; see [`crate::GraphStore`].
///
/// Every node and edge carries an insertion sequence number so that
/// neighbor and listing order stay stable across removals, which
/// petgraph's recycled indices would otherwise scramble.
#[derive(Clone)]
pub struct Graph {
    inner: StableUnGraph<NodeSlot, u64>,
    index: HashMap<String, NodeIndex>,
    next_seq: u64,
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("node_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

impl Graph {
    pub fn new() -> Self {
        Graph {
            inner: StableUnGraph::default(),
            index: HashMap::new(),
            next_seq: 0,
        }
    }

    /// The six-node, six-edge starting graph.
    pub fn with_defaults() -> Self {
        let mut graph = Graph::new();
        for label in DEFAULT_NODES {
            graph.insert_unchecked(label.to_string());
        }
        // Default edges only name default nodes.
        for (a, b) in DEFAULT_EDGES {
            let (ia, ib) = (graph.index[a], graph.index[b]);
            graph.connect_unchecked(ia, ib);
        }
        graph
    }

    fn bump(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn insert_unchecked(&mut self, label: String) {
        let seq = self.bump();
        let idx = self.inner.add_node(NodeSlot { label: label.clone(), seq });
        self.index.insert(label, idx);
    }

    fn connect_unchecked(&mut self, a: NodeIndex, b: NodeIndex) {
        let seq = self.bump();
        self.inner.add_edge(a, b, seq);
    }

    fn lookup(&self, label: &str) -> GraphResult<NodeIndex> {
        self.index
            .get(label)
            .copied()
            .ok_or_else(|| GraphError::UnknownNode(label.to_string()))
    }

    fn label(&self, idx: NodeIndex) -> &str {
        self.inner
            .node_weight(idx)
            .map(|slot| slot.label.as_str())
            .unwrap_or_default()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.index.contains_key(label)
    }

    /// Total number of nodes.
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Total number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Insert an isolated node. `label` must already be normalized.
    pub fn add_node(&mut self, label: &str) -> GraphResult<()> {
        if label.is_empty() {
            return Err(GraphError::InvalidId(label.to_string()));
        }
        if self.contains(label) {
            return Err(GraphError::DuplicateNode(label.to_string()));
        }
        self.insert_unchecked(label.to_string());
        Ok(())
    }

    /// Remove a node and every edge touching it.
    /// Returns the neighbors it had, in adjacency order.
    pub fn remove_node(&mut self, label: &str) -> GraphResult<Vec<String>> {
        let former = self.neighbors(label)?;
        let idx = self.lookup(label)?;
        self.inner.remove_node(idx);
        self.index.remove(label);
        Ok(former)
    }

    /// Connect two existing nodes in both directions.
    pub fn add_edge(&mut self, a: &str, b: &str) -> GraphResult<EdgeChange> {
        let ia = self.lookup(a)?;
        let ib = self.lookup(b)?;
        if ia == ib {
            return Ok(EdgeChange::SelfLoop);
        }
        if self.inner.find_edge(ia, ib).is_some() {
            return Ok(EdgeChange::AlreadyPresent);
        }
        self.connect_unchecked(ia, ib);
        Ok(EdgeChange::Added)
    }

    pub fn has_edge(&self, a: &str, b: &str) -> bool {
        match (self.index.get(a), self.index.get(b)) {
            (Some(&ia), Some(&ib)) => self.inner.find_edge(ia, ib).is_some(),
            _ => false,
        }
    }

    /// Adjacent labels in the order the edges were added.
    pub fn neighbors(&self, label: &str) -> GraphResult<Vec<String>> {
        let idx = self.lookup(label)?;
        let mut adjacent: Vec<(u64, NodeIndex)> = self
            .inner
            .edges(idx)
            .map(|edge| {
                let other = if edge.source() == idx { edge.target() } else { edge.source() };
                (*edge.weight(), other)
            })
            .collect();
        adjacent.sort_unstable_by_key(|(seq, _)| *seq);
        Ok(adjacent
            .into_iter()
            .map(|(_, other)| self.label(other).to_string())
            .collect())
    }

    /// All labels in insertion order.
    pub fn nodes(&self) -> Vec<String> {
        let mut slots: Vec<&NodeSlot> = self
            .inner
            .node_indices()
            .filter_map(|idx| self.inner.node_weight(idx))
            .collect();
        slots.sort_unstable_by_key(|slot| slot.seq);
        slots.into_iter().map(|slot| slot.label.clone()).collect()
    }

    /// All edges in insertion order, each listed once.
    pub fn edges(&self) -> Vec<EdgePair> {
        let mut edges: Vec<(u64, EdgePair)> = self
            .inner
            .edge_indices()
            .filter_map(|e| {
                let (a, b) = self.inner.edge_endpoints(e)?;
                let seq = *self.inner.edge_weight(e)?;
                Some((seq, EdgePair::new(self.label(a), self.label(b))))
            })
            .collect();
        edges.sort_unstable_by_key(|(seq, _)| *seq);
        edges.into_iter().map(|(_, pair)| pair).collect()
    }

    /// Label → adjacency map, used to compare graph states structurally.
    pub fn adjacency(&self) -> HashMap<String, Vec<String>> {
        self.nodes()
            .into_iter()
            .map(|label| {
                let adjacent = self.neighbors(&label).unwrap_or_default();
                (label, adjacent)
            })
            .collect()
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}
