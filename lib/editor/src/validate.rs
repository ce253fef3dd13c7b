//! Configuration validation.
//!
//! Determines whether nodes have every required field populated, and
//! aggregates that across the graph to gate execution. A node's custom
//! schema takes precedence over its registry schema; nodes with no
//! resolvable schema have nothing to require and count as configured.

use crate::node::Node;
use crate::schema::{ConfigSchema, NodeTypeRegistry};
use serde_json::Value as JsonValue;

/// Aggregate configuration state, emitted to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigurationStatus {
    /// Nodes missing required configuration.
    pub unconfigured: usize,
    /// Nodes with all required fields populated.
    pub configured: usize,
    /// Total nodes in the graph.
    pub total: usize,
}

impl ConfigurationStatus {
    /// Returns true if every node is configured.
    #[must_use]
    pub fn is_fully_configured(&self) -> bool {
        self.unconfigured == 0
    }
}

/// Returns true if the value counts as populated for a required field.
///
/// Strings must be non-blank after trimming; `null` never counts.
fn is_populated(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

/// Resolves the schema governing a node's configuration.
fn schema_for<'a>(node: &'a Node, registry: &'a dyn NodeTypeRegistry) -> Option<&'a ConfigSchema> {
    if let Some(schema) = &node.custom_schema {
        return Some(schema);
    }
    node.type_ref
        .as_ref()
        .and_then(|type_ref| registry.resolve(type_ref))
        .map(|node_type| &node_type.schema)
}

/// Returns true if every required field of the node's schema is populated.
#[must_use]
pub fn is_node_configured(node: &Node, registry: &dyn NodeTypeRegistry) -> bool {
    let Some(schema) = schema_for(node, registry) else {
        return true;
    };
    schema
        .required_fields()
        .all(|field| node.config.get(&field.name).is_some_and(is_populated))
}

/// Filters the nodes missing required configuration, in graph order.
///
/// Order is stable so "first unconfigured node" selection is deterministic,
/// and callers get the full list to report every violation at once.
#[must_use]
pub fn unconfigured_nodes<'a>(
    nodes: &'a [Node],
    registry: &dyn NodeTypeRegistry,
) -> Vec<&'a Node> {
    nodes
        .iter()
        .filter(|node| !is_node_configured(node, registry))
        .collect()
}

/// Computes the aggregate configuration status for the graph.
#[must_use]
pub fn configuration_status(
    nodes: &[Node],
    registry: &dyn NodeTypeRegistry,
) -> ConfigurationStatus {
    let total = nodes.len();
    let unconfigured = unconfigured_nodes(nodes, registry).len();
    ConfigurationStatus {
        unconfigured,
        configured: total - unconfigured,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;
    use crate::schema::{ConfigField, NodeType, StaticRegistry};

    fn registry() -> StaticRegistry {
        StaticRegistry::new().with_type(
            "email_send",
            NodeType::new("Send Email").with_schema(
                ConfigSchema::new()
                    .with_field(ConfigField::required("to"))
                    .with_field(ConfigField::optional("cc")),
            ),
        )
    }

    fn email_node() -> Node {
        Node::new(NodeKind::Action, Some("email_send".into()), "Send Email")
    }

    #[test]
    fn missing_required_field_is_unconfigured() {
        let registry = registry();
        let node = email_node();
        assert!(!is_node_configured(&node, &registry));
    }

    #[test]
    fn blank_string_does_not_count() {
        let registry = registry();
        let node = email_node().with_config_value("to", serde_json::json!("   "));
        assert!(!is_node_configured(&node, &registry));

        let fixed = email_node().with_config_value("to", serde_json::json!("x"));
        assert!(is_node_configured(&fixed, &registry));
    }

    #[test]
    fn null_does_not_count() {
        let registry = registry();
        let node = email_node().with_config_value("to", serde_json::json!(null));
        assert!(!is_node_configured(&node, &registry));
    }

    #[test]
    fn no_required_fields_means_configured() {
        let registry = StaticRegistry::new().with_type(
            "log",
            NodeType::new("Log").with_schema(
                ConfigSchema::new().with_field(ConfigField::optional("level")),
            ),
        );
        let node = Node::new(NodeKind::Action, Some("log".into()), "Log");
        assert!(is_node_configured(&node, &registry));
    }

    #[test]
    fn custom_schema_takes_precedence() {
        let registry = registry();
        // Registry requires "to", but the custom schema requires "prompt".
        let node = email_node()
            .with_custom_schema(ConfigSchema::new().with_field(ConfigField::required("prompt")))
            .with_config_value("to", serde_json::json!("x"));
        assert!(!is_node_configured(&node, &registry));

        let satisfied = node.with_config_value("prompt", serde_json::json!("write a reply"));
        assert!(is_node_configured(&satisfied, &registry));
    }

    #[test]
    fn unresolvable_type_counts_as_configured() {
        let registry = StaticRegistry::new();
        let placeholder = Node::placeholder();
        let unknown = Node::new(NodeKind::Action, Some("unknown".into()), "Mystery");
        assert!(is_node_configured(&placeholder, &registry));
        assert!(is_node_configured(&unknown, &registry));
    }

    #[test]
    fn unconfigured_listing_preserves_graph_order() {
        let registry = registry();
        let first = email_node();
        let configured = email_node().with_config_value("to", serde_json::json!("x"));
        let second = email_node();
        let first_id = first.id;
        let second_id = second.id;

        let nodes = vec![first, configured, second];
        let unconfigured = unconfigured_nodes(&nodes, &registry);
        let ids: Vec<_> = unconfigured.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![first_id, second_id]);
    }

    #[test]
    fn status_counts() {
        let registry = registry();
        let nodes = vec![
            email_node(),
            email_node().with_config_value("to", serde_json::json!("x")),
        ];

        let status = configuration_status(&nodes, &registry);
        assert_eq!(status.total, 2);
        assert_eq!(status.unconfigured, 1);
        assert_eq!(status.configured, 1);
        assert!(!status.is_fully_configured());
    }
}
