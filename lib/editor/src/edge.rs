//! Edge types for workflow graphs.
//!
//! Edges are directed connections between two nodes' ports. The port names
//! are optional; a missing port means the node's default handle for the
//! current layout direction. Edge orientation is derived state: it is
//! re-stamped by the layout adapter and never set independently.

use crate::layout::LayoutDirection;
use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// A unique identifier for an edge within a workflow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(Ulid);

impl EdgeId {
    /// Creates a new random edge ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Creates an edge ID from a ULID.
    #[must_use]
    pub const fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }
}

impl Default for EdgeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "edge_{}", self.0)
    }
}

/// A directed connection between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Unique identifier for this edge.
    pub id: EdgeId,
    /// The source node.
    pub source: NodeId,
    /// The output port on the source node, if not the default.
    pub source_port: Option<String>,
    /// The target node.
    pub target: NodeId,
    /// The input port on the target node, if not the default.
    pub target_port: Option<String>,
    /// The layout direction the edge was last arranged for.
    #[serde(default)]
    pub orientation: LayoutDirection,
}

impl Edge {
    /// Creates a new edge between the default ports of two nodes.
    #[must_use]
    pub fn new(source: NodeId, target: NodeId) -> Self {
        Self {
            id: EdgeId::new(),
            source,
            source_port: None,
            target,
            target_port: None,
            orientation: LayoutDirection::default(),
        }
    }

    /// Creates a new edge with a specific ID.
    #[must_use]
    pub fn with_id(id: EdgeId, source: NodeId, target: NodeId) -> Self {
        let mut edge = Self::new(source, target);
        edge.id = id;
        edge
    }

    /// Sets the source and target port names.
    #[must_use]
    pub fn with_ports(
        mut self,
        source_port: impl Into<String>,
        target_port: impl Into<String>,
    ) -> Self {
        self.source_port = Some(source_port.into());
        self.target_port = Some(target_port.into());
        self
    }

    /// Returns true if this edge touches the given node on either end.
    #[must_use]
    pub fn touches(&self, node_id: NodeId) -> bool {
        self.source == node_id || self.target == node_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_id_display() {
        let id = EdgeId::new();
        assert!(id.to_string().starts_with("edge_"));
    }

    #[test]
    fn edge_defaults_to_unnamed_ports() {
        let edge = Edge::new(NodeId::new(), NodeId::new());
        assert!(edge.source_port.is_none());
        assert!(edge.target_port.is_none());
    }

    #[test]
    fn edge_with_ports() {
        let edge = Edge::new(NodeId::new(), NodeId::new()).with_ports("result", "input");
        assert_eq!(edge.source_port.as_deref(), Some("result"));
        assert_eq!(edge.target_port.as_deref(), Some("input"));
    }

    #[test]
    fn touches_both_ends() {
        let source = NodeId::new();
        let target = NodeId::new();
        let other = NodeId::new();
        let edge = Edge::new(source, target);

        assert!(edge.touches(source));
        assert!(edge.touches(target));
        assert!(!edge.touches(other));
    }

    #[test]
    fn edge_serde_roundtrip() {
        let edge = Edge::new(NodeId::new(), NodeId::new()).with_ports("out", "in");
        let json = serde_json::to_string(&edge).expect("serialize");
        let parsed: Edge = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(edge, parsed);
    }
}
