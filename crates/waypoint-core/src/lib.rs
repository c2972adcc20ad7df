//! Waypoint Core — Graph data model, synchronized store, and change diffs

pub mod error;
pub mod model;
pub mod graph;
pub mod diff;
pub mod store;


pub use error::{GraphError, GraphResult};
pub use model::{normalize_label, EdgeChange, EdgePair, GraphSnapshot, DEFAULT_EDGES, DEFAULT_NODES};
pub use graph::Graph;
pub use diff::{DiffEngine, GraphDiff};
pub use store::GraphStore;
