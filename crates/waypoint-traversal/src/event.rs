//! Events emitted by a traversal run

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one run. Increases with every run an engine starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct RunId(pub u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

/// One discrete step of a breadth-first search, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraversalEvent {
    /// The start node was visited.
    NodeVisited { node: String },
    /// `node` was reached for the first time, from `parent`.
    NodeDiscovered { node: String, parent: String },
    /// One edge of the found path. Emitted from the end back to the start.
    PathEdge { from: String, to: String },
    /// Always the last event of a run that ran to completion.
    TraversalFinished { found: bool },
}

impl TraversalEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TraversalEvent::TraversalFinished { .. })
    }
}

impl fmt::Display for TraversalEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraversalEvent::NodeVisited { node } => write!(f, "visit     {node}"),
            TraversalEvent::NodeDiscovered { node, parent } => {
                write!(f, "discover  {node} (via {parent})")
            }
            TraversalEvent::PathEdge { from, to } => write!(f, "path      {from} -- {to}"),
            TraversalEvent::TraversalFinished { found: true } => write!(f, "finished  path found"),
            TraversalEvent::TraversalFinished { found: false } => write!(f, "finished  no path"),
        }
    }
}

/// An event tagged with the run that produced it, for fan-out to many consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunEvent {
    pub run: RunId,
    pub event: TraversalEvent,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The end node was reached; `path_len` is the number of edges.
    Found { path_len: usize },
    /// The frontier emptied without reaching the end node.
    NotFound,
    /// Cancelled by a newer run, by its handle, or because nobody was listening.
    Cancelled,
    /// The graph was reset underneath the run.
    Invalidated,
}

impl RunOutcome {
    /// True for outcomes whose event stream ended with `TraversalFinished`.
    pub fn completed(&self) -> bool {
        matches!(self, RunOutcome::Found { .. } | RunOutcome::NotFound)
    }
}
