//! Graph diff computation for incremental renderer updates

use crate::graph::Graph;
use crate::model::*;
use serde::{Deserialize, Serialize};

/// Represents a change to the graph that should be broadcast to renderers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDiff {
    /// Monotonically increasing diff sequence number.
    pub sequence: u64,
    /// The graph was replaced wholesale; renderers should redraw from scratch.
    pub reset: bool,
    /// Nodes added in this update.
    pub added_nodes: Vec<String>,
    /// Nodes removed in this update.
    pub removed_nodes: Vec<String>,
    /// Edges added in this update.
    pub added_edges: Vec<EdgePair>,
    /// Edges removed in this update.
    pub removed_edges: Vec<EdgePair>,
}

impl GraphDiff {
    /// Create an empty diff with given sequence number.
    pub fn new(sequence: u64) -> Self {
        GraphDiff {
            sequence,
            reset: false,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            added_edges: Vec::new(),
            removed_edges: Vec::new(),
        }
    }

    /// Check if this diff is empty (no changes).
    pub fn is_empty(&self) -> bool {
        !self.reset
            && self.added_nodes.is_empty()
            && self.removed_nodes.is_empty()
            && self.added_edges.is_empty()
            && self.removed_edges.is_empty()
    }
}

/// Hands out diff sequence numbers.
#[derive(Debug)]
pub struct DiffEngine {
    sequence: u64,
}

impl DiffEngine {
    pub fn new() -> Self {
        DiffEngine { sequence: 0 }
    }

    /// Start the next diff in sequence.
    pub fn next_diff(&mut self) -> GraphDiff {
        self.sequence += 1;
        GraphDiff::new(self.sequence)
    }

    /// Compute the difference between two graph states.
    pub fn compute_diff(&mut self, old_graph: &Graph, new_graph: &Graph) -> GraphDiff {
        let mut diff = self.next_diff();

        for label in new_graph.nodes() {
            if !old_graph.contains(&label) {
                diff.added_nodes.push(label);
            }
        }

        for label in old_graph.nodes() {
            if !new_graph.contains(&label) {
                diff.removed_nodes.push(label);
            }
        }

        for edge in new_graph.edges() {
            if !old_graph.has_edge(&edge.a, &edge.b) {
                diff.added_edges.push(edge);
            }
        }

        for edge in old_graph.edges() {
            if !new_graph.has_edge(&edge.a, &edge.b) {
                diff.removed_edges.push(edge);
            }
        }

        diff
    }

    /// Get current sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self::new()
    }
}
