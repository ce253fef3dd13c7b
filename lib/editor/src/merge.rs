//! Graph merge reconciliation.
//!
//! AI generation and document loads hand the editor a full or partial graph
//! description. Applying it verbatim would erase whatever the user has
//! already typed into matching nodes, so the merge walks the incoming
//! description against the live snapshot and preserves local state the
//! payload does not explicitly overwrite:
//!
//! - config is merged key-by-key; existing keys absent from the payload
//!   are retained
//! - custom schemas and custom logic are never silently dropped
//!
//! The incoming description is authoritative for graph membership: nodes it
//! omits are removed, nodes it adds appear. Edges referencing absent nodes
//! are pruned rather than left dangling.

use crate::edge::{Edge, EdgeId};
use crate::graph::GraphSnapshot;
use crate::node::{ConfigMap, Node, NodeId, NodeKind, Position};
use crate::schema::{ConfigSchema, NodeTypeRef};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Offset applied below/beside a source node when placing a new node.
const PLACEMENT_OFFSET: f64 = 140.0;
/// Fallback grid spacing for new nodes with no source to hang off.
const GRID_COLUMNS: usize = 3;
const GRID_ORIGIN: f64 = 80.0;
const GRID_COL_GAP: f64 = 200.0;
const GRID_ROW_GAP: f64 = 120.0;

/// One node in an incoming graph description.
///
/// Everything except the identity is optional; missing fields fall back to
/// the live node's values (on an id match) or to derived defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDescription {
    /// The node identity used for matching.
    pub id: NodeId,
    /// The node kind.
    pub kind: NodeKind,
    /// Reference into the node-type registry.
    pub type_ref: Option<NodeTypeRef>,
    /// Label; defaults to a humanized name when absent.
    pub label: Option<String>,
    /// Description text.
    pub description: Option<String>,
    /// Canvas position; placed automatically when absent.
    pub position: Option<Position>,
    /// Configuration values to lay over the existing config.
    #[serde(default)]
    pub config: ConfigMap,
    /// Ad-hoc schema for custom nodes.
    pub custom_schema: Option<ConfigSchema>,
    /// Ad-hoc logic for custom nodes.
    pub custom_logic: Option<String>,
}

impl NodeDescription {
    /// Creates a minimal description for the given kind.
    #[must_use]
    pub fn new(id: NodeId, kind: NodeKind) -> Self {
        Self {
            id,
            kind,
            type_ref: None,
            label: None,
            description: None,
            position: None,
            config: ConfigMap::new(),
            custom_schema: None,
            custom_logic: None,
        }
    }
}

/// One edge in an incoming graph description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeDescription {
    /// Edge identity; generated when absent.
    pub id: Option<EdgeId>,
    /// The source node.
    pub source: NodeId,
    /// The output port on the source node.
    pub source_port: Option<String>,
    /// The target node.
    pub target: NodeId,
    /// The input port on the target node.
    pub target_port: Option<String>,
}

impl EdgeDescription {
    /// Creates a description connecting the default ports of two nodes.
    #[must_use]
    pub fn new(source: NodeId, target: NodeId) -> Self {
        Self {
            id: None,
            source,
            source_port: None,
            target,
            target_port: None,
        }
    }
}

/// An incoming graph description from AI generation or a loaded document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDescription {
    /// The nodes, in intended graph order.
    #[serde(default)]
    pub nodes: Vec<NodeDescription>,
    /// The edges.
    #[serde(default)]
    pub edges: Vec<EdgeDescription>,
}

/// The result of a merge.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// The merged nodes, in incoming order.
    pub nodes: Vec<Node>,
    /// The merged edges, dangling references pruned.
    pub edges: Vec<Edge>,
    /// How many nodes were new.
    pub added: usize,
    /// How many nodes were enriched from an existing match.
    pub updated: usize,
    /// How many incoming edges referenced absent nodes and were dropped.
    pub dropped_edges: usize,
}

/// Reconciles an incoming description against the current snapshot.
#[must_use]
pub fn merge(current: &GraphSnapshot, incoming: &GraphDescription) -> MergeOutcome {
    let existing: HashMap<NodeId, &Node> =
        current.nodes.iter().map(|node| (node.id, node)).collect();

    let mut added = 0;
    let mut updated = 0;
    let mut nodes = Vec::with_capacity(incoming.nodes.len());

    for (index, description) in incoming.nodes.iter().enumerate() {
        match existing.get(&description.id) {
            Some(node) => {
                nodes.push(merge_node(node, description));
                updated += 1;
            }
            None => {
                nodes.push(build_node(description, index, incoming, &nodes, &existing));
                added += 1;
            }
        }
    }

    let present: HashMap<NodeId, ()> = nodes.iter().map(|node| (node.id, ())).collect();
    let mut dropped_edges = 0;
    let mut edges = Vec::with_capacity(incoming.edges.len());
    for description in &incoming.edges {
        if !present.contains_key(&description.source) || !present.contains_key(&description.target)
        {
            dropped_edges += 1;
            continue;
        }
        let mut edge = Edge::with_id(
            description.id.unwrap_or_default(),
            description.source,
            description.target,
        );
        edge.source_port = description.source_port.clone();
        edge.target_port = description.target_port.clone();
        edges.push(edge);
    }

    MergeOutcome {
        nodes,
        edges,
        added,
        updated,
        dropped_edges,
    }
}

/// Enriches an existing node with an incoming description.
fn merge_node(existing: &Node, incoming: &NodeDescription) -> Node {
    let mut node = existing.clone();

    // Kind and type reference are immutable for concrete nodes. An
    // unresolved placeholder may adopt an incoming concrete type.
    if node.kind == NodeKind::Placeholder && incoming.kind != NodeKind::Placeholder {
        node.kind = incoming.kind;
        node.type_ref = incoming.type_ref.clone();
    }

    if let Some(label) = &incoming.label {
        node.label = label.clone();
    }
    if let Some(description) = &incoming.description {
        node.description = Some(description.clone());
    }
    if let Some(position) = incoming.position {
        node.position = position;
    }

    // Incoming values win on shared keys; keys the payload never mentions
    // are retained.
    for (key, value) in &incoming.config {
        node.config.insert(key.clone(), value.clone());
    }

    if node.custom_schema.is_none() {
        node.custom_schema = incoming.custom_schema.clone();
    }
    if node.custom_logic.is_none() {
        node.custom_logic = incoming.custom_logic.clone();
    }

    node
}

/// Builds a brand-new node from an incoming description.
fn build_node(
    description: &NodeDescription,
    index: usize,
    incoming: &GraphDescription,
    merged_so_far: &[Node],
    existing: &HashMap<NodeId, &Node>,
) -> Node {
    let label = description
        .label
        .clone()
        .or_else(|| description.type_ref.as_ref().map(NodeTypeRef::humanized))
        .unwrap_or_else(|| description.kind.display_name().to_string());

    let mut node = Node::with_id(
        description.id,
        description.kind,
        description.type_ref.clone(),
        label,
    );
    node.description = description.description.clone();
    node.config = description.config.clone();
    node.custom_schema = description.custom_schema.clone();
    node.custom_logic = description.custom_logic.clone();
    node.position = description
        .position
        .unwrap_or_else(|| place(description.id, index, incoming, merged_so_far, existing));
    node
}

/// Chooses a position for a node the payload did not place.
///
/// Prefers hanging off the source node of the first incoming edge; falls
/// back to a grid walk.
fn place(
    node_id: NodeId,
    index: usize,
    incoming: &GraphDescription,
    merged_so_far: &[Node],
    existing: &HashMap<NodeId, &Node>,
) -> Position {
    let source_position = incoming
        .edges
        .iter()
        .find(|edge| edge.target == node_id)
        .and_then(|edge| {
            merged_so_far
                .iter()
                .find(|node| node.id == edge.source)
                .map(|node| node.position)
                .or_else(|| existing.get(&edge.source).map(|node| node.position))
        });

    match source_position {
        Some(position) => position.translated(0.0, PLACEMENT_OFFSET),
        None => {
            let col = index % GRID_COLUMNS;
            let row = index / GRID_COLUMNS;
            Position::new(
                GRID_ORIGIN + (col as f64) * GRID_COL_GAP,
                GRID_ORIGIN + (row as f64) * GRID_ROW_GAP,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ConfigField;

    fn live_node(label: &str) -> Node {
        Node::new(NodeKind::Action, Some("email_send".into()), label)
    }

    fn description_of(node: &Node) -> NodeDescription {
        NodeDescription {
            id: node.id,
            kind: node.kind,
            type_ref: node.type_ref.clone(),
            label: Some(node.label.clone()),
            description: None,
            position: None,
            config: ConfigMap::new(),
            custom_schema: None,
            custom_logic: None,
        }
    }

    #[test]
    fn merge_preserves_unseen_config_keys() {
        let node = live_node("Send")
            .with_config_value("a", serde_json::json!(1))
            .with_config_value("b", serde_json::json!(2));
        let current = GraphSnapshot::new(vec![node.clone()], Vec::new());

        let mut description = description_of(&node);
        description
            .config
            .insert("a".to_string(), serde_json::json!(9));
        let incoming = GraphDescription {
            nodes: vec![description],
            edges: Vec::new(),
        };

        let outcome = merge(&current, &incoming);
        let merged = &outcome.nodes[0];
        assert_eq!(merged.config.get("a"), Some(&serde_json::json!(9)));
        assert_eq!(merged.config.get("b"), Some(&serde_json::json!(2)));
        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.added, 0);
    }

    #[test]
    fn merge_preserves_custom_schema() {
        let schema = ConfigSchema::new().with_field(ConfigField::required("prompt"));
        let node = live_node("Custom").with_custom_schema(schema.clone());
        let current = GraphSnapshot::new(vec![node.clone()], Vec::new());

        // Payload says nothing about the custom schema.
        let incoming = GraphDescription {
            nodes: vec![description_of(&node)],
            edges: Vec::new(),
        };

        let outcome = merge(&current, &incoming);
        assert_eq!(outcome.nodes[0].custom_schema, Some(schema));
    }

    #[test]
    fn existing_custom_schema_wins_over_incoming() {
        let existing_schema = ConfigSchema::new().with_field(ConfigField::required("prompt"));
        let incoming_schema = ConfigSchema::new().with_field(ConfigField::optional("other"));
        let node = live_node("Custom").with_custom_schema(existing_schema.clone());
        let current = GraphSnapshot::new(vec![node.clone()], Vec::new());

        let mut description = description_of(&node);
        description.custom_schema = Some(incoming_schema);
        let incoming = GraphDescription {
            nodes: vec![description],
            edges: Vec::new(),
        };

        let outcome = merge(&current, &incoming);
        assert_eq!(outcome.nodes[0].custom_schema, Some(existing_schema));
    }

    #[test]
    fn incoming_label_overwrites() {
        let node = live_node("Old Label");
        let current = GraphSnapshot::new(vec![node.clone()], Vec::new());

        let mut description = description_of(&node);
        description.label = Some("New Label".to_string());
        let incoming = GraphDescription {
            nodes: vec![description],
            edges: Vec::new(),
        };

        let outcome = merge(&current, &incoming);
        assert_eq!(outcome.nodes[0].label, "New Label");
    }

    #[test]
    fn kind_and_type_ref_survive_conflicting_payload() {
        let node = live_node("Send");
        let current = GraphSnapshot::new(vec![node.clone()], Vec::new());

        let mut description = description_of(&node);
        description.kind = NodeKind::Transform;
        description.type_ref = Some("json_path".into());
        let incoming = GraphDescription {
            nodes: vec![description],
            edges: Vec::new(),
        };

        let outcome = merge(&current, &incoming);
        assert_eq!(outcome.nodes[0].kind, NodeKind::Action);
        assert_eq!(outcome.nodes[0].type_ref, Some("email_send".into()));
    }

    #[test]
    fn placeholder_adopts_incoming_type() {
        let node = Node::placeholder();
        let current = GraphSnapshot::new(vec![node.clone()], Vec::new());

        let mut description = description_of(&node);
        description.kind = NodeKind::Action;
        description.type_ref = Some("email_send".into());
        let incoming = GraphDescription {
            nodes: vec![description],
            edges: Vec::new(),
        };

        let outcome = merge(&current, &incoming);
        assert_eq!(outcome.nodes[0].kind, NodeKind::Action);
        assert_eq!(outcome.nodes[0].type_ref, Some("email_send".into()));
    }

    #[test]
    fn new_node_label_falls_back_to_type_then_kind() {
        let current = GraphSnapshot::default();
        let mut typed = NodeDescription::new(NodeId::new(), NodeKind::Action);
        typed.type_ref = Some("http_request".into());
        let untyped = NodeDescription::new(NodeId::new(), NodeKind::Placeholder);

        let incoming = GraphDescription {
            nodes: vec![typed, untyped],
            edges: Vec::new(),
        };

        let outcome = merge(&current, &incoming);
        assert_eq!(outcome.nodes[0].label, "Http Request");
        assert_eq!(outcome.nodes[1].label, "New step");
        assert_eq!(outcome.added, 2);
    }

    #[test]
    fn new_node_placed_relative_to_source() {
        let source = live_node("Source").with_position(Position::new(100.0, 50.0));
        let current = GraphSnapshot::new(vec![source.clone()], Vec::new());

        let new_id = NodeId::new();
        let incoming = GraphDescription {
            nodes: vec![
                description_of(&source),
                NodeDescription::new(new_id, NodeKind::Action),
            ],
            edges: vec![EdgeDescription::new(source.id, new_id)],
        };

        let outcome = merge(&current, &incoming);
        let placed = outcome.nodes.iter().find(|n| n.id == new_id).unwrap();
        assert_eq!(placed.position.x, 100.0);
        assert!(placed.position.y > 50.0);
    }

    #[test]
    fn dangling_incoming_edges_are_pruned() {
        let node = live_node("Only");
        let current = GraphSnapshot::new(vec![node.clone()], Vec::new());

        let incoming = GraphDescription {
            nodes: vec![description_of(&node)],
            edges: vec![EdgeDescription::new(node.id, NodeId::new())],
        };

        let outcome = merge(&current, &incoming);
        assert!(outcome.edges.is_empty());
        assert_eq!(outcome.dropped_edges, 1);
    }

    #[test]
    fn omitted_nodes_are_removed() {
        let keep = live_node("Keep");
        let drop = live_node("Drop");
        let current = GraphSnapshot::new(vec![keep.clone(), drop], Vec::new());

        let incoming = GraphDescription {
            nodes: vec![description_of(&keep)],
            edges: Vec::new(),
        };

        let outcome = merge(&current, &incoming);
        assert_eq!(outcome.nodes.len(), 1);
        assert_eq!(outcome.nodes[0].id, keep.id);
    }

    #[test]
    fn description_deserializes_from_sparse_json() {
        let json = serde_json::json!({
            "nodes": [
                { "id": NodeId::new(), "kind": "action", "type_ref": "email_send" }
            ]
        });
        let description: GraphDescription =
            serde_json::from_value(json).expect("deserialize sparse payload");
        assert_eq!(description.nodes.len(), 1);
        assert!(description.nodes[0].label.is_none());
        assert!(description.edges.is_empty());
    }
}
