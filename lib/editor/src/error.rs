//! Error types for the editor core.
//!
//! Errors are hand-rolled enums carrying only the information available at
//! their own layer:
//! - `GraphError`: defects in graph mutation operations
//! - `ValidationError`: local execution-gating failures, reported before any
//!   network call is made

use crate::edge::EdgeId;
use crate::node::NodeId;
use std::fmt;

/// Errors from graph store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Node with the given ID was not found in the graph.
    NodeNotFound { node_id: NodeId },
    /// A node with the given ID already exists.
    DuplicateNode { node_id: NodeId },
    /// An edge with the given ID already exists.
    DuplicateEdge { edge_id: EdgeId },
    /// An edge references a node that is not in the graph.
    EndpointMissing { edge_id: EdgeId, node_id: NodeId },
    /// Placeholder resolution was requested for a non-placeholder node.
    NotAPlaceholder { node_id: NodeId },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeNotFound { node_id } => {
                write!(f, "node not found: {node_id}")
            }
            Self::DuplicateNode { node_id } => {
                write!(f, "node already exists: {node_id}")
            }
            Self::DuplicateEdge { edge_id } => {
                write!(f, "edge already exists: {edge_id}")
            }
            Self::EndpointMissing { edge_id, node_id } => {
                write!(f, "edge {edge_id} references missing node {node_id}")
            }
            Self::NotAPlaceholder { node_id } => {
                write!(f, "node {node_id} is not a placeholder")
            }
        }
    }
}

impl std::error::Error for GraphError {}

/// Local validation failures that gate execution.
///
/// These are reported synchronously with the full offending-node list so the
/// caller can surface every violation at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Execution was requested for an empty graph.
    EmptyGraph,
    /// One or more nodes are missing required configuration.
    Unconfigured { node_ids: Vec<NodeId> },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyGraph => write!(f, "workflow has no nodes to execute"),
            Self::Unconfigured { node_ids } => {
                write!(
                    f,
                    "{} node(s) missing required configuration",
                    node_ids.len()
                )
            }
        }
    }
}

impl std::error::Error for ValidationError {}
