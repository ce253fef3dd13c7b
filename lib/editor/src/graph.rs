//! The canonical graph store.
//!
//! [`GraphStore`] owns the live node/edge collections and exposes the
//! mutation primitives everything else operates on. Operations are
//! synchronous and atomic from the caller's perspective: validation happens
//! before any mutation, so no observer can see an edge referencing a removed
//! node. Node order is insertion order and is preserved across snapshots,
//! which keeps "first unconfigured node" reporting deterministic.

use crate::edge::{Edge, EdgeId};
use crate::error::GraphError;
use crate::node::{ConfigMap, Node, NodeId, NodeKind, Position};
use crate::schema::NodeTypeRef;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// An immutable captured `(nodes, edges)` pair.
///
/// Snapshots are produced by [`GraphStore::snapshot`] and owned by the
/// history manager; the store's live state is a distinct working copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// The nodes, in graph order.
    pub nodes: Vec<Node>,
    /// The edges, in insertion order.
    pub edges: Vec<Edge>,
}

impl GraphSnapshot {
    /// Creates a snapshot from owned collections.
    #[must_use]
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    /// Returns true if the snapshot has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// The chosen type for an unresolved placeholder node.
///
/// Delivered synchronously into [`GraphStore::resolve_placeholder`] by
/// whatever surface lets the user pick a node type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceholderChoice {
    /// The placeholder node to resolve.
    pub placeholder: NodeId,
    /// The concrete kind the node becomes.
    pub kind: NodeKind,
    /// The chosen type reference.
    pub type_ref: NodeTypeRef,
    /// Optional label override; defaults to the type's humanized name.
    pub label: Option<String>,
}

/// The canonical node/edge collections and their mutation primitives.
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    node_index: HashMap<NodeId, usize>,
}

impl GraphStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node to the graph.
    ///
    /// # Errors
    ///
    /// Returns an error if a node with the same ID already exists.
    pub fn add_node(&mut self, node: Node) -> Result<NodeId, GraphError> {
        let node_id = node.id;
        if self.node_index.contains_key(&node_id) {
            return Err(GraphError::DuplicateNode { node_id });
        }
        self.node_index.insert(node_id, self.nodes.len());
        self.nodes.push(node);
        Ok(node_id)
    }

    /// Removes a node and every edge touching it in one operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is not in the graph.
    pub fn remove_node(&mut self, node_id: NodeId) -> Result<Node, GraphError> {
        let index = self
            .node_index
            .get(&node_id)
            .copied()
            .ok_or(GraphError::NodeNotFound { node_id })?;

        let node = self.nodes.remove(index);
        self.edges.retain(|edge| !edge.touches(node_id));
        self.rebuild_index();
        Ok(node)
    }

    /// Adds an edge between two existing nodes.
    ///
    /// # Errors
    ///
    /// Returns an error if either endpoint is missing or the edge ID is
    /// already present.
    pub fn add_edge(&mut self, edge: Edge) -> Result<EdgeId, GraphError> {
        if self.edges.iter().any(|e| e.id == edge.id) {
            return Err(GraphError::DuplicateEdge { edge_id: edge.id });
        }
        for endpoint in [edge.source, edge.target] {
            if !self.node_index.contains_key(&endpoint) {
                return Err(GraphError::EndpointMissing {
                    edge_id: edge.id,
                    node_id: endpoint,
                });
            }
        }
        let edge_id = edge.id;
        self.edges.push(edge);
        Ok(edge_id)
    }

    /// Removes every edge matching the predicate, returning how many were
    /// removed.
    pub fn remove_edges_matching(&mut self, predicate: impl Fn(&Edge) -> bool) -> usize {
        let before = self.edges.len();
        self.edges.retain(|edge| !predicate(edge));
        before - self.edges.len()
    }

    /// Moves a node to a new position.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is not in the graph.
    pub fn set_node_position(&mut self, node_id: NodeId, position: Position) -> Result<(), GraphError> {
        let node = self.node_mut(node_id)?;
        node.position = position;
        Ok(())
    }

    /// Shallow-merges the given values into a node's configuration.
    ///
    /// Keys present in `partial` overwrite; existing keys absent from it are
    /// retained. The config is never replaced wholesale.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is not in the graph.
    pub fn update_node_config(
        &mut self,
        node_id: NodeId,
        partial: ConfigMap,
    ) -> Result<(), GraphError> {
        let node = self.node_mut(node_id)?;
        for (key, value) in partial {
            node.config.insert(key, value);
        }
        Ok(())
    }

    /// Resolves a placeholder node into a concrete kind and type.
    ///
    /// The node keeps its ID, position, configuration and edges. This is the
    /// one sanctioned mutation of `kind`/`type_ref`.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is missing or not a placeholder.
    pub fn resolve_placeholder(&mut self, choice: PlaceholderChoice) -> Result<(), GraphError> {
        let node = self.node_mut(choice.placeholder)?;
        if !node.is_placeholder() {
            return Err(GraphError::NotAPlaceholder {
                node_id: choice.placeholder,
            });
        }
        node.kind = choice.kind;
        node.label = choice
            .label
            .unwrap_or_else(|| choice.type_ref.humanized());
        node.type_ref = Some(choice.type_ref);
        Ok(())
    }

    /// Replaces the entire graph with the given collections.
    ///
    /// The input is validated in full before any mutation: node IDs must be
    /// unique and every edge endpoint must exist in the new node set.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first violation; on error the store
    /// is left untouched.
    pub fn replace_all(&mut self, nodes: Vec<Node>, edges: Vec<Edge>) -> Result<(), GraphError> {
        let mut seen = HashSet::with_capacity(nodes.len());
        for node in &nodes {
            if !seen.insert(node.id) {
                return Err(GraphError::DuplicateNode { node_id: node.id });
            }
        }
        for edge in &edges {
            for endpoint in [edge.source, edge.target] {
                if !seen.contains(&endpoint) {
                    return Err(GraphError::EndpointMissing {
                        edge_id: edge.id,
                        node_id: endpoint,
                    });
                }
            }
        }

        self.nodes = nodes;
        self.edges = edges;
        self.rebuild_index();
        Ok(())
    }

    /// Captures the current state as an immutable snapshot.
    #[must_use]
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot::new(self.nodes.clone(), self.edges.clone())
    }

    /// Restores the store from a snapshot, replacing the live state.
    pub fn restore(&mut self, snapshot: &GraphSnapshot) {
        self.nodes = snapshot.nodes.clone();
        self.edges = snapshot.edges.clone();
        self.rebuild_index();
    }

    /// Returns a reference to a node by its ID.
    #[must_use]
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        let index = self.node_index.get(&node_id)?;
        self.nodes.get(*index)
    }

    /// Returns true if the node is in the graph.
    #[must_use]
    pub fn contains_node(&self, node_id: NodeId) -> bool {
        self.node_index.contains_key(&node_id)
    }

    /// Returns the nodes in graph order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Returns the edges in insertion order.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Returns the number of nodes in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of edges in the graph.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns true if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node_mut(&mut self, node_id: NodeId) -> Result<&mut Node, GraphError> {
        let index = self
            .node_index
            .get(&node_id)
            .copied()
            .ok_or(GraphError::NodeNotFound { node_id })?;
        Ok(&mut self.nodes[index])
    }

    fn rebuild_index(&mut self) {
        self.node_index.clear();
        for (index, node) in self.nodes.iter().enumerate() {
            self.node_index.insert(node.id, index);
        }
    }
}
