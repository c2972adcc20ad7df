//! Error types for graph store operations.

use thiserror::Error;

/// Result type alias for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

/// Everything a store operation can refuse.
///
/// A failed operation never changes the graph. "Edge already exists" and
/// "no path found" are not errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The operation names a node that is not in the graph.
    #[error("unknown node: {0}")]
    UnknownNode(String),

    /// `add_node` on a label that is already taken.
    #[error("duplicate node: {0}")]
    DuplicateNode(String),

    /// `add_node` on an empty label.
    #[error("invalid node id: {0:?}")]
    InvalidId(String),
}

impl GraphError {
    /// Short machine-readable code, used on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            GraphError::UnknownNode(_) => "unknown_node",
            GraphError::DuplicateNode(_) => "duplicate_node",
            GraphError::InvalidId(_) => "invalid_id",
        }
    }
}
