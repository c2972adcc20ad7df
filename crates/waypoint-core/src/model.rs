//! Core data structures shared by the store, the traversal engine and renderers

use serde::{Deserialize, Serialize};

/// Labels of the graph every store starts from (and returns to on reset).
pub const DEFAULT_NODES: [&str; 6] = ["A", "B", "C", "D", "E", "F"];

/// Default edges: two parallel routes between the hubs A and D.
pub const DEFAULT_EDGES: [(&str, &str); 6] = [
    ("A", "B"),
    ("A", "C"),
    ("C", "E"),
    ("E", "F"),
    ("F", "D"),
    ("B", "D"),
];

/// Canonical form of a node label: surrounding whitespace dropped, upper case.
pub fn normalize_label(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// One undirected edge, endpoints in the order they were first connected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgePair {
    pub a: String,
    pub b: String,
}

impl EdgePair {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        EdgePair { a: a.into(), b: b.into() }
    }

    /// True if this edge joins `x` and `y`, in either direction.
    pub fn joins(&self, x: &str, y: &str) -> bool {
        (self.a == x && self.b == y) || (self.a == y && self.b == x)
    }
}

/// Result of an `add_edge` call that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeChange {
    /// Both directions were inserted.
    Added,
    /// The edge was already there; nothing changed.
    AlreadyPresent,
    /// Both endpoints were the same node; nothing changed.
    SelfLoop,
}

/// Point-in-time copy of the whole graph, sent to renderers for full redraws.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Incremented by every reset.
    pub epoch: u64,
    /// Node labels in insertion order.
    pub nodes: Vec<String>,
    /// Edges in insertion order, each listed once.
    pub edges: Vec<EdgePair>,
}
