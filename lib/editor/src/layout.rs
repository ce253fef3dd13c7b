//! Auto-layout support.
//!
//! Positioning is delegated to an external [`LayoutEngine`]; the
//! [`LayoutAdapter`] re-stamps the results with directional metadata so
//! edge attachment sides stay consistent with the chosen orientation.
//! [`LayeredLayout`] is the built-in engine: a deterministic longest-path
//! layering, so repeated loads never visually jitter.

use crate::edge::Edge;
use crate::node::{Node, NodeId, Position};
use petgraph::graph::DiGraph;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Horizontal spacing between layout slots.
const SLOT_GAP: f64 = 200.0;
/// Vertical spacing between layers.
const LAYER_GAP: f64 = 120.0;
/// Canvas origin offset for the first slot/layer.
const ORIGIN: f64 = 80.0;

/// The orientation of the graph layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutDirection {
    /// Top-to-bottom flow; edges attach bottom-to-top.
    #[default]
    Vertical,
    /// Left-to-right flow; edges attach right-to-left.
    Horizontal,
}

/// The side of a node an edge attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleSide {
    Top,
    Bottom,
    Left,
    Right,
}

impl LayoutDirection {
    /// Returns the `(source, target)` attachment sides for edges.
    #[must_use]
    pub fn edge_attachments(&self) -> (HandleSide, HandleSide) {
        match self {
            Self::Vertical => (HandleSide::Bottom, HandleSide::Top),
            Self::Horizontal => (HandleSide::Right, HandleSide::Left),
        }
    }
}

/// Computes node positions for a graph.
///
/// Implementations must be deterministic: the same nodes, edges and
/// direction always yield the same positions.
pub trait LayoutEngine: Send + Sync {
    /// Positions the nodes, returning the repositioned collections.
    fn compute(
        &self,
        nodes: Vec<Node>,
        edges: Vec<Edge>,
        direction: LayoutDirection,
    ) -> (Vec<Node>, Vec<Edge>);
}

/// Invokes the layout engine and stamps directional metadata.
///
/// Pure aside from the engine call; callers decide whether the result is
/// history-worthy.
#[derive(Debug, Clone)]
pub struct LayoutAdapter<E> {
    engine: E,
}

impl<E: LayoutEngine> LayoutAdapter<E> {
    /// Creates a new adapter around the given engine.
    #[must_use]
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    /// Applies the layout and re-stamps every node and edge with the
    /// active direction.
    #[must_use]
    pub fn apply(
        &self,
        nodes: Vec<Node>,
        edges: Vec<Edge>,
        direction: LayoutDirection,
    ) -> (Vec<Node>, Vec<Edge>) {
        let (mut nodes, mut edges) = self.engine.compute(nodes, edges, direction);
        for node in &mut nodes {
            node.orientation = direction;
        }
        for edge in &mut edges {
            edge.orientation = direction;
        }
        (nodes, edges)
    }
}

/// Deterministic longest-path layered layout.
///
/// Nodes are assigned layers by their longest path from an entry node;
/// within a layer, slots follow graph order. Cyclic graphs fall back to
/// relaxing edges in graph order, which is still deterministic.
#[derive(Debug, Clone)]
pub struct LayeredLayout {
    /// Spacing between slots within a layer.
    pub slot_gap: f64,
    /// Spacing between layers.
    pub layer_gap: f64,
}

impl Default for LayeredLayout {
    fn default() -> Self {
        Self {
            slot_gap: SLOT_GAP,
            layer_gap: LAYER_GAP,
        }
    }
}

impl LayeredLayout {
    /// Computes the layer index for each node.
    fn layers(nodes: &[Node], edges: &[Edge]) -> Vec<usize> {
        let mut graph = DiGraph::<usize, ()>::new();
        let mut index_of: HashMap<NodeId, petgraph::graph::NodeIndex> = HashMap::new();

        for (slot, node) in nodes.iter().enumerate() {
            let idx = graph.add_node(slot);
            index_of.insert(node.id, idx);
        }
        for edge in edges {
            if let (Some(&source), Some(&target)) =
                (index_of.get(&edge.source), index_of.get(&edge.target))
                && source != target
            {
                graph.add_edge(source, target, ());
            }
        }

        let order = petgraph::algo::toposort(&graph, None)
            .unwrap_or_else(|_| graph.node_indices().collect());

        let mut layers = vec![0usize; nodes.len()];
        for idx in order {
            let slot = graph[idx];
            for edge in graph.edges(idx) {
                let successor = graph[edge.target()];
                if layers[successor] < layers[slot] + 1 {
                    layers[successor] = layers[slot] + 1;
                }
            }
        }
        layers
    }
}

impl LayoutEngine for LayeredLayout {
    fn compute(
        &self,
        mut nodes: Vec<Node>,
        edges: Vec<Edge>,
        direction: LayoutDirection,
    ) -> (Vec<Node>, Vec<Edge>) {
        let layers = Self::layers(&nodes, &edges);

        let mut next_slot: HashMap<usize, usize> = HashMap::new();
        for (index, node) in nodes.iter_mut().enumerate() {
            let layer = layers[index];
            let slot = next_slot.entry(layer).or_insert(0);
            let along = ORIGIN + (*slot as f64) * self.slot_gap;
            let across = ORIGIN + (layer as f64) * self.layer_gap;
            *slot += 1;

            node.position = match direction {
                LayoutDirection::Vertical => Position::new(along, across),
                LayoutDirection::Horizontal => Position::new(across, along),
            };
        }

        (nodes, edges)
    }
}
