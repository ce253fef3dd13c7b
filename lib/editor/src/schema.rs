//! Configuration schemas and the node-type registry contract.
//!
//! Every concrete node type declares a configuration schema: the set of
//! fields a user can fill in, and which of them are required before the
//! workflow may execute. Registry content itself (display names, schemas)
//! is external static metadata reached through [`NodeTypeRegistry`].

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// A reference into the node-type registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeTypeRef(String);

impl NodeTypeRef {
    /// Creates a new type reference.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the registry key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derives a human-readable name from the registry key.
    ///
    /// Splits on `_`, `-` and `.` and capitalizes each word, so
    /// `email_send` becomes `Email Send`.
    #[must_use]
    pub fn humanized(&self) -> String {
        self.0
            .split(['_', '-', '.'])
            .filter(|part| !part.is_empty())
            .map(|part| {
                let mut chars = part.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl std::fmt::Display for NodeTypeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeTypeRef {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// A single field in a configuration schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigField {
    /// The field name, used as the key in a node's config map.
    pub name: String,
    /// Optional display label.
    pub label: Option<String>,
    /// Whether this field must be populated before execution.
    pub required: bool,
    /// Optional default value.
    pub default: Option<JsonValue>,
}

impl ConfigField {
    /// Creates a new required field.
    #[must_use]
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            required: true,
            default: None,
        }
    }

    /// Creates a new optional field.
    #[must_use]
    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            required: false,
            default: None,
        }
    }

    /// Sets the display label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn with_default(mut self, default: JsonValue) -> Self {
        self.default = Some(default);
        self
    }
}

/// The configuration schema for a node type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigSchema {
    /// The declared fields, in display order.
    pub fields: Vec<ConfigField>,
}

impl ConfigSchema {
    /// Creates an empty schema (no fields, nothing required).
    #[must_use]
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Adds a field to the schema.
    #[must_use]
    pub fn with_field(mut self, field: ConfigField) -> Self {
        self.fields.push(field);
        self
    }

    /// Returns the field with the given name, if any.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&ConfigField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns an iterator over the required fields.
    pub fn required_fields(&self) -> impl Iterator<Item = &ConfigField> {
        self.fields.iter().filter(|f| f.required)
    }

    /// Returns true if the schema declares no required fields.
    #[must_use]
    pub fn has_no_required_fields(&self) -> bool {
        self.required_fields().next().is_none()
    }
}

/// A resolved node type: display metadata plus its configuration schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeType {
    /// Human-readable display name.
    pub name: String,
    /// Optional description for palettes and tooltips.
    pub description: Option<String>,
    /// The configuration schema for nodes of this type.
    pub schema: ConfigSchema,
}

impl NodeType {
    /// Creates a new node type with an empty schema.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            schema: ConfigSchema::new(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the configuration schema.
    #[must_use]
    pub fn with_schema(mut self, schema: ConfigSchema) -> Self {
        self.schema = schema;
        self
    }
}

/// Resolves type references to node-type metadata.
///
/// Registry content is static data owned by the surrounding application;
/// the editor core only reads it.
pub trait NodeTypeRegistry: Send + Sync {
    /// Resolves a type reference, returning `None` for unknown keys.
    fn resolve(&self, type_ref: &NodeTypeRef) -> Option<&NodeType>;
}

/// An in-memory registry backed by a map.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    types: HashMap<NodeTypeRef, NodeType>,
}

impl StaticRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node type, replacing any previous entry for the key.
    #[must_use]
    pub fn with_type(mut self, key: impl Into<NodeTypeRef>, node_type: NodeType) -> Self {
        self.types.insert(key.into(), node_type);
        self
    }

    /// Registers a node type in place.
    pub fn register(&mut self, key: impl Into<NodeTypeRef>, node_type: NodeType) {
        self.types.insert(key.into(), node_type);
    }

    /// Returns the number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns true if no types are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl NodeTypeRegistry for StaticRegistry {
    fn resolve(&self, type_ref: &NodeTypeRef) -> Option<&NodeType> {
        self.types.get(type_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_ref_humanized() {
        assert_eq!(NodeTypeRef::new("email_send").humanized(), "Email Send");
        assert_eq!(NodeTypeRef::new("http-request").humanized(), "Http Request");
        assert_eq!(NodeTypeRef::new("slack").humanized(), "Slack");
    }

    #[test]
    fn schema_required_fields() {
        let schema = ConfigSchema::new()
            .with_field(ConfigField::required("to"))
            .with_field(ConfigField::optional("cc"))
            .with_field(ConfigField::required("subject"));

        let required: Vec<_> = schema.required_fields().map(|f| f.name.as_str()).collect();
        assert_eq!(required, vec!["to", "subject"]);
        assert!(!schema.has_no_required_fields());
    }

    #[test]
    fn empty_schema_has_no_required_fields() {
        assert!(ConfigSchema::new().has_no_required_fields());
    }

    #[test]
    fn static_registry_resolves() {
        let registry = StaticRegistry::new().with_type(
            "email_send",
            NodeType::new("Send Email").with_schema(
                ConfigSchema::new().with_field(ConfigField::required("to")),
            ),
        );

        let resolved = registry.resolve(&NodeTypeRef::new("email_send"));
        assert!(resolved.is_some());
        assert_eq!(resolved.unwrap().name, "Send Email");
        assert!(registry.resolve(&NodeTypeRef::new("unknown")).is_none());
    }

    #[test]
    fn schema_serde_roundtrip() {
        let schema = ConfigSchema::new()
            .with_field(ConfigField::required("url").with_label("Request URL"));
        let json = serde_json::to_string(&schema).expect("serialize");
        let parsed: ConfigSchema = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(schema, parsed);
    }
}
