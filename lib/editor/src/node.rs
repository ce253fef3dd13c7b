//! Workflow node types.
//!
//! Nodes are the vertices of the workflow graph. Each node has:
//! - A unique ID, stable across saves and loads
//! - A kind determining its default handle topology
//! - An optional reference into the node-type registry
//! - A configuration map shaped by the resolved schema
//!
//! A node's `kind` and `type_ref` are fixed once it exists in a graph;
//! edits only ever touch `position` and `config`. The single exception is
//! placeholder resolution through [`GraphStore`](crate::graph::GraphStore).

use crate::layout::LayoutDirection;
use crate::schema::{ConfigSchema, NodeTypeRef};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use ulid::Ulid;

/// A unique identifier for a node within a workflow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Ulid);

impl NodeId {
    /// Creates a new random node ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Creates a node ID from a ULID.
    #[must_use]
    pub const fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node_{}", self.0)
    }
}

/// The kind of a workflow node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Entry point that initiates workflow execution.
    Trigger,
    /// Performs an external action.
    Action,
    /// Reshapes data flowing between nodes.
    Transform,
    /// Terminal node with no outgoing connections.
    End,
    /// Unresolved node awaiting a type selection.
    Placeholder,
}

impl NodeKind {
    /// Returns true if nodes of this kind accept incoming edges.
    #[must_use]
    pub fn accepts_input(&self) -> bool {
        !matches!(self, Self::Trigger)
    }

    /// Returns true if nodes of this kind produce outgoing edges.
    #[must_use]
    pub fn produces_output(&self) -> bool {
        !matches!(self, Self::End)
    }

    /// Returns a display name for the kind.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Trigger => "Trigger",
            Self::Action => "Action",
            Self::Transform => "Transform",
            Self::End => "End",
            Self::Placeholder => "New step",
        }
    }
}

/// A 2D canvas coordinate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// Creates a new position.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns this position shifted by the given offsets.
    #[must_use]
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Per-node configuration values, keyed by field name.
///
/// Values may exist for fields the resolved schema does not (yet) declare;
/// such keys must survive merges untouched.
pub type ConfigMap = BTreeMap<String, JsonValue>;

/// A workflow node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier, stable across saves and loads.
    pub id: NodeId,
    /// The node kind.
    pub kind: NodeKind,
    /// Reference into the node-type registry. `None` for placeholders.
    pub type_ref: Option<NodeTypeRef>,
    /// Human-readable label.
    pub label: String,
    /// Optional longer description.
    pub description: Option<String>,
    /// Canvas position.
    pub position: Position,
    /// Configuration values keyed by field name.
    #[serde(default)]
    pub config: ConfigMap,
    /// Ad-hoc schema for AI-generated custom nodes.
    pub custom_schema: Option<ConfigSchema>,
    /// Ad-hoc logic for AI-generated custom nodes.
    pub custom_logic: Option<String>,
    /// The layout direction the node was last arranged for.
    #[serde(default)]
    pub orientation: LayoutDirection,
}

impl Node {
    /// Creates a new node of the given kind.
    #[must_use]
    pub fn new(kind: NodeKind, type_ref: Option<NodeTypeRef>, label: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(),
            kind,
            type_ref,
            label: label.into(),
            description: None,
            position: Position::default(),
            config: ConfigMap::new(),
            custom_schema: None,
            custom_logic: None,
            orientation: LayoutDirection::default(),
        }
    }

    /// Creates a new node with a specific ID.
    #[must_use]
    pub fn with_id(
        id: NodeId,
        kind: NodeKind,
        type_ref: Option<NodeTypeRef>,
        label: impl Into<String>,
    ) -> Self {
        let mut node = Self::new(kind, type_ref, label);
        node.id = id;
        node
    }

    /// Creates a new unresolved placeholder node.
    #[must_use]
    pub fn placeholder() -> Self {
        Self::new(
            NodeKind::Placeholder,
            None,
            NodeKind::Placeholder.display_name(),
        )
    }

    /// Sets the position.
    #[must_use]
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    /// Sets a configuration value.
    #[must_use]
    pub fn with_config_value(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.config.insert(key.into(), value);
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets an ad-hoc custom schema.
    #[must_use]
    pub fn with_custom_schema(mut self, schema: ConfigSchema) -> Self {
        self.custom_schema = Some(schema);
        self
    }

    /// Returns true if this node is an unresolved placeholder.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.kind == NodeKind::Placeholder
    }
}
