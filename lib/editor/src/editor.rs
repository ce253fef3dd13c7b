//! The editor session.
//!
//! [`EditorSession`] is the orchestrating layer over the graph store,
//! history, layout adapter and validator. Every externally-visible mutation
//! records a history snapshot and notifies the registered observers; undo
//! and redo restore snapshots under the replay guard so restoration never
//! records itself.
//!
//! External graph updates (AI generation, loaded documents) enter through
//! [`EditorSession::merge_description`], never directly into the store —
//! that is what guarantees a regeneration cannot erase a user's typed-in
//! configuration.

use crate::edge::{Edge, EdgeId};
use crate::error::GraphError;
use crate::graph::{GraphSnapshot, GraphStore, PlaceholderChoice};
use crate::history::{HistoryManager, HistoryState};
use crate::layout::{LayoutAdapter, LayoutDirection, LayoutEngine};
use crate::merge::{self, GraphDescription, MergeOutcome, NodeDescription};
use crate::node::{ConfigMap, Node, NodeId, Position};
use crate::schema::NodeTypeRegistry;
use crate::store::{DocumentMeta, StoreError, WorkflowDocument, WorkflowStore};
use crate::validate::{self, ConfigurationStatus};
use flowloom_core::WorkflowId;
use std::sync::Arc;

/// Emitted after every graph mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphChanged {
    /// Node count after the mutation.
    pub node_count: usize,
    /// Edge count after the mutation.
    pub edge_count: usize,
}

type GraphObserver = Box<dyn Fn(GraphChanged) + Send + Sync>;
type HistoryObserver = Box<dyn Fn(HistoryState) + Send + Sync>;
type ConfigurationObserver = Box<dyn Fn(ConfigurationStatus) + Send + Sync>;

/// The workflow graph editor core.
pub struct EditorSession<L: LayoutEngine> {
    store: GraphStore,
    history: HistoryManager,
    layout: LayoutAdapter<L>,
    registry: Arc<dyn NodeTypeRegistry>,
    direction: LayoutDirection,
    graph_observers: Vec<GraphObserver>,
    history_observers: Vec<HistoryObserver>,
    configuration_observers: Vec<ConfigurationObserver>,
}

impl<L: LayoutEngine> EditorSession<L> {
    /// Creates a session over an empty canvas.
    pub fn new(engine: L, registry: Arc<dyn NodeTypeRegistry>) -> Self {
        let store = GraphStore::new();
        let history = HistoryManager::new(store.snapshot());
        Self {
            store,
            history,
            layout: LayoutAdapter::new(engine),
            registry,
            direction: LayoutDirection::default(),
            graph_observers: Vec::new(),
            history_observers: Vec::new(),
            configuration_observers: Vec::new(),
        }
    }

    /// Registers an observer for graph mutations.
    pub fn on_graph_changed(&mut self, observer: impl Fn(GraphChanged) + Send + Sync + 'static) {
        self.graph_observers.push(Box::new(observer));
    }

    /// Registers an observer for undo/redo availability.
    pub fn on_history_changed(&mut self, observer: impl Fn(HistoryState) + Send + Sync + 'static) {
        self.history_observers.push(Box::new(observer));
    }

    /// Registers an observer for configuration gating state.
    pub fn on_configuration_status_changed(
        &mut self,
        observer: impl Fn(ConfigurationStatus) + Send + Sync + 'static,
    ) {
        self.configuration_observers.push(Box::new(observer));
    }

    /// Adds a node.
    ///
    /// # Errors
    ///
    /// Returns an error if the node's ID is already present.
    pub fn add_node(&mut self, node: Node) -> Result<NodeId, GraphError> {
        let node_id = self.store.add_node(node)?;
        self.commit();
        Ok(node_id)
    }

    /// Removes a node and every edge touching it.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is not in the graph.
    pub fn remove_node(&mut self, node_id: NodeId) -> Result<Node, GraphError> {
        let node = self.store.remove_node(node_id)?;
        self.commit();
        Ok(node)
    }

    /// Connects two nodes.
    ///
    /// # Errors
    ///
    /// Returns an error if either endpoint is missing.
    pub fn add_edge(&mut self, edge: Edge) -> Result<EdgeId, GraphError> {
        let edge_id = self.store.add_edge(edge)?;
        self.commit();
        Ok(edge_id)
    }

    /// Removes every edge matching the predicate.
    pub fn remove_edges_matching(&mut self, predicate: impl Fn(&Edge) -> bool) -> usize {
        let removed = self.store.remove_edges_matching(predicate);
        if removed > 0 {
            self.commit();
        }
        removed
    }

    /// Moves a node, typically at the end of a drag.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is not in the graph.
    pub fn set_node_position(
        &mut self,
        node_id: NodeId,
        position: Position,
    ) -> Result<(), GraphError> {
        self.store.set_node_position(node_id, position)?;
        self.commit();
        Ok(())
    }

    /// Shallow-merges values into a node's configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is not in the graph.
    pub fn update_node_config(
        &mut self,
        node_id: NodeId,
        partial: ConfigMap,
    ) -> Result<(), GraphError> {
        self.store.update_node_config(node_id, partial)?;
        self.commit();
        Ok(())
    }

    /// Resolves a placeholder into a concrete node type.
    ///
    /// # Errors
    ///
    /// Returns an error if the target is missing or not a placeholder.
    pub fn resolve_placeholder(&mut self, choice: PlaceholderChoice) -> Result<(), GraphError> {
        self.store.resolve_placeholder(choice)?;
        self.commit();
        Ok(())
    }

    /// Replaces the whole graph.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is internally inconsistent; on error
    /// the current graph is untouched.
    pub fn replace_all(&mut self, nodes: Vec<Node>, edges: Vec<Edge>) -> Result<(), GraphError> {
        self.store.replace_all(nodes, edges)?;
        self.commit();
        Ok(())
    }

    /// Merges an incoming graph description, relayouts, and records the
    /// result.
    ///
    /// Configuration values, custom schemas and custom logic on id-matched
    /// nodes survive; see [`merge`](crate::merge).
    ///
    /// # Errors
    ///
    /// Returns an error if the merged graph is internally inconsistent.
    pub fn merge_description(
        &mut self,
        incoming: &GraphDescription,
    ) -> Result<MergeOutcome, GraphError> {
        let outcome = merge::merge(&self.store.snapshot(), incoming);
        tracing::debug!(
            added = outcome.added,
            updated = outcome.updated,
            dropped_edges = outcome.dropped_edges,
            "merged incoming graph description"
        );

        let (nodes, edges) =
            self.layout
                .apply(outcome.nodes.clone(), outcome.edges.clone(), self.direction);
        self.store.replace_all(nodes, edges)?;
        self.commit();
        Ok(outcome)
    }

    /// Relayouts the current graph in the given direction.
    pub fn apply_layout(&mut self, direction: LayoutDirection) {
        self.direction = direction;
        let snapshot = self.store.snapshot();
        let (nodes, edges) = self.layout.apply(snapshot.nodes, snapshot.edges, direction);
        // The layout result is structurally identical, so this cannot fail.
        if self.store.replace_all(nodes, edges).is_ok() {
            self.commit();
        }
    }

    /// Undoes the last mutation. Returns false at the beginning of history.
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.undo() else {
            return false;
        };
        self.restore(&snapshot);
        true
    }

    /// Redoes the last undone mutation. Returns false at the end of history.
    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.history.redo() else {
            return false;
        };
        self.restore(&snapshot);
        true
    }

    /// Loads a document into the session.
    ///
    /// A missing document initializes a blank canvas. Loaded content flows
    /// through the merge engine like any other external update.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn load_from(
        &mut self,
        store: &dyn WorkflowStore,
        id: WorkflowId,
    ) -> Result<Option<WorkflowDocument>, StoreError> {
        let Some(document) = store.load(id).await? else {
            tracing::debug!(workflow_id = %id, "no stored document; starting blank");
            self.store = GraphStore::new();
            self.commit();
            return Ok(None);
        };

        let description = description_from_snapshot(&document.graph);
        // The merged graph is built from a stored document; inconsistency
        // here means corrupted persistence.
        self.merge_description(&description)
            .map_err(|err| StoreError::Serialization {
                message: err.to_string(),
            })?;
        tracing::info!(
            workflow_id = %id,
            node_count = document.graph.nodes.len(),
            "loaded workflow document"
        );
        Ok(Some(document))
    }

    /// Saves the current graph.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn save_to(
        &self,
        store: &dyn WorkflowStore,
        id: Option<WorkflowId>,
        name: &str,
        meta: DocumentMeta,
    ) -> Result<WorkflowDocument, StoreError> {
        let document = store.save(id, name, &self.store.snapshot(), meta).await?;
        tracing::info!(
            workflow_id = %document.id,
            node_count = document.graph.nodes.len(),
            "saved workflow document"
        );
        Ok(document)
    }

    /// Captures the current graph for submission or inspection.
    #[must_use]
    pub fn snapshot(&self) -> GraphSnapshot {
        self.store.snapshot()
    }

    /// Returns a node by ID.
    #[must_use]
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.store.node(node_id)
    }

    /// Returns the nodes in graph order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        self.store.nodes()
    }

    /// Returns the edges.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        self.store.edges()
    }

    /// Returns the active layout direction.
    #[must_use]
    pub fn direction(&self) -> LayoutDirection {
        self.direction
    }

    /// Returns true if undo is possible.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Returns true if redo is possible.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Returns the nodes missing required configuration, in graph order.
    #[must_use]
    pub fn unconfigured_nodes(&self) -> Vec<&Node> {
        validate::unconfigured_nodes(self.store.nodes(), self.registry.as_ref())
    }

    /// Returns the aggregate configuration status.
    #[must_use]
    pub fn configuration_status(&self) -> ConfigurationStatus {
        validate::configuration_status(self.store.nodes(), self.registry.as_ref())
    }

    /// Records the current state and notifies every observer group.
    fn commit(&mut self) {
        self.history.record(self.store.snapshot());
        self.notify();
    }

    /// Restores a snapshot under the replay guard.
    fn restore(&mut self, snapshot: &GraphSnapshot) {
        self.history.set_replaying(true);
        self.store.restore(snapshot);
        self.notify();
        self.history.set_replaying(false);
    }

    fn notify(&self) {
        let graph_change = GraphChanged {
            node_count: self.store.node_count(),
            edge_count: self.store.edge_count(),
        };
        for observer in &self.graph_observers {
            observer(graph_change);
        }

        let history_state = self.history.state();
        for observer in &self.history_observers {
            observer(history_state);
        }

        let configuration = self.configuration_status();
        for observer in &self.configuration_observers {
            observer(configuration);
        }
    }
}

/// Converts a stored snapshot into a merge description.
fn description_from_snapshot(snapshot: &GraphSnapshot) -> GraphDescription {
    GraphDescription {
        nodes: snapshot
            .nodes
            .iter()
            .map(|node| NodeDescription {
                id: node.id,
                kind: node.kind,
                type_ref: node.type_ref.clone(),
                label: Some(node.label.clone()),
                description: node.description.clone(),
                position: Some(node.position),
                config: node.config.clone(),
                custom_schema: node.custom_schema.clone(),
                custom_logic: node.custom_logic.clone(),
            })
            .collect(),
        edges: snapshot
            .edges
            .iter()
            .map(|edge| crate::merge::EdgeDescription {
                id: Some(edge.id),
                source: edge.source,
                source_port: edge.source_port.clone(),
                target: edge.target,
                target_port: edge.target_port.clone(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayeredLayout;
    use crate::merge::EdgeDescription;
    use crate::node::NodeKind;
    use crate::schema::{ConfigField, ConfigSchema, NodeType, StaticRegistry};
    use crate::store::InMemoryWorkflowStore;
    use std::sync::Mutex;

    fn registry() -> Arc<dyn NodeTypeRegistry> {
        Arc::new(StaticRegistry::new().with_type(
            "email_send",
            NodeType::new("Send Email")
                .with_schema(ConfigSchema::new().with_field(ConfigField::required("to"))),
        ))
    }

    fn session() -> EditorSession<LayeredLayout> {
        EditorSession::new(LayeredLayout::default(), registry())
    }

    fn action_node(label: &str) -> Node {
        Node::new(NodeKind::Action, Some("email_send".into()), label)
    }

    #[test]
    fn undo_redo_inverse_law() {
        let mut editor = session();

        // Start empty, add A, add B, connect A -> B.
        let a = editor.add_node(action_node("A")).unwrap();
        let b = editor.add_node(action_node("B")).unwrap();
        editor.add_edge(Edge::new(a, b)).unwrap();

        let final_snapshot = editor.snapshot();

        // Two undos leave only node A.
        assert!(editor.undo());
        assert!(editor.undo());
        assert_eq!(editor.nodes().len(), 1);
        assert_eq!(editor.nodes()[0].id, a);
        assert!(editor.edges().is_empty());

        // A third undo returns to the empty canvas, a fourth is a no-op.
        assert!(editor.undo());
        assert!(editor.snapshot().is_empty());
        assert!(!editor.undo());

        // Redo all the way forward restores the final state exactly.
        assert!(editor.redo());
        assert!(editor.redo());
        assert!(editor.redo());
        assert_eq!(editor.snapshot(), final_snapshot);
        assert!(!editor.redo());
    }

    #[test]
    fn mutations_notify_all_observer_groups() {
        let mut editor = session();
        let graph_events = Arc::new(Mutex::new(Vec::new()));
        let history_events = Arc::new(Mutex::new(Vec::new()));
        let config_events = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&graph_events);
        editor.on_graph_changed(move |change| sink.lock().unwrap().push(change));
        let sink = Arc::clone(&history_events);
        editor.on_history_changed(move |state| sink.lock().unwrap().push(state));
        let sink = Arc::clone(&config_events);
        editor.on_configuration_status_changed(move |status| {
            sink.lock().unwrap().push(status)
        });

        editor.add_node(action_node("A")).unwrap();

        assert_eq!(
            *graph_events.lock().unwrap(),
            vec![GraphChanged {
                node_count: 1,
                edge_count: 0
            }]
        );
        let history = history_events.lock().unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].can_undo);
        assert!(!history[0].can_redo);
        let config = config_events.lock().unwrap();
        assert_eq!(config[0].unconfigured, 1);
    }

    #[test]
    fn undo_does_not_record_itself() {
        let mut editor = session();
        editor.add_node(action_node("A")).unwrap();
        editor.add_node(action_node("B")).unwrap();

        // A graph observer that reaches back into history would otherwise
        // corrupt it mid-restore; the replay guard makes this safe.
        editor.undo();
        assert!(editor.can_redo());
        assert!(editor.redo());
        assert_eq!(editor.nodes().len(), 2);
    }

    #[test]
    fn merge_preserves_config_and_relayouts() {
        let mut editor = session();
        let node = action_node("Send")
            .with_config_value("to", serde_json::json!("ops@example.com"))
            .with_config_value("subject", serde_json::json!("Digest"));
        let node_id = editor.add_node(node).unwrap();

        let mut incoming_node = NodeDescription::new(node_id, NodeKind::Action);
        incoming_node.type_ref = Some("email_send".into());
        incoming_node.label = Some("Send summary".to_string());
        incoming_node
            .config
            .insert("subject".to_string(), serde_json::json!("Summary"));
        let added = NodeDescription::new(NodeId::new(), NodeKind::End);
        let added_id = added.id;
        let incoming = GraphDescription {
            nodes: vec![incoming_node, added],
            edges: vec![EdgeDescription::new(node_id, added_id)],
        };

        let outcome = editor.merge_description(&incoming).unwrap();
        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.updated, 1);

        let merged = editor.node(node_id).unwrap();
        assert_eq!(merged.label, "Send summary");
        assert_eq!(merged.config.get("to"), Some(&serde_json::json!("ops@example.com")));
        assert_eq!(merged.config.get("subject"), Some(&serde_json::json!("Summary")));

        // Relayout stamped the active direction everywhere.
        assert!(editor
            .edges()
            .iter()
            .all(|edge| edge.orientation == editor.direction()));

        // And the merge is a single undoable step.
        assert!(editor.undo());
        assert!(editor.node(added_id).is_none());
    }

    #[test]
    fn apply_layout_changes_direction_and_positions() {
        let mut editor = session();
        let a = editor.add_node(action_node("A")).unwrap();
        let b = editor.add_node(action_node("B")).unwrap();
        editor.add_edge(Edge::new(a, b)).unwrap();

        editor.apply_layout(LayoutDirection::Horizontal);

        assert_eq!(editor.direction(), LayoutDirection::Horizontal);
        let a_pos = editor.node(a).unwrap().position;
        let b_pos = editor.node(b).unwrap().position;
        assert!(a_pos.x < b_pos.x);
        assert!(editor
            .nodes()
            .iter()
            .all(|node| node.orientation == LayoutDirection::Horizontal));
    }

    #[test]
    fn configuration_gating_updates_with_edits() {
        let mut editor = session();
        let id = editor.add_node(action_node("Send")).unwrap();
        assert_eq!(editor.unconfigured_nodes().len(), 1);

        let mut partial = ConfigMap::new();
        partial.insert("to".to_string(), serde_json::json!("x"));
        editor.update_node_config(id, partial).unwrap();

        assert!(editor.unconfigured_nodes().is_empty());
        assert!(editor.configuration_status().is_fully_configured());
    }

    #[test]
    fn placeholder_flow_through_editor() {
        let mut editor = session();
        let placeholder = Node::placeholder();
        let id = editor.add_node(placeholder).unwrap();

        editor
            .resolve_placeholder(PlaceholderChoice {
                placeholder: id,
                kind: NodeKind::Action,
                type_ref: "email_send".into(),
                label: None,
            })
            .unwrap();

        let node = editor.node(id).unwrap();
        assert_eq!(node.kind, NodeKind::Action);
        // Resolution is undoable like any other mutation.
        editor.undo();
        assert!(editor.node(id).unwrap().is_placeholder());
    }

    #[tokio::test(start_paused = true)]
    async fn editor_snapshot_drives_orchestrator() {
        use crate::execution::{ExecutionRecord, ExecutionRequest, ExecutionStatus, SubmitOutcome};
        use crate::orchestrator::{ExecutionError, ExecutionOrchestrator};
        use crate::service::{ExecutionService, ServiceError};
        use flowloom_core::ExecutionId;

        /// Backend double that runs every submission inline.
        struct InlineService;

        #[async_trait::async_trait]
        impl ExecutionService for InlineService {
            async fn submit(
                &self,
                request: ExecutionRequest,
            ) -> Result<SubmitOutcome, ServiceError> {
                Ok(SubmitOutcome::Completed {
                    record: ExecutionRecord::queued(ExecutionId::new(), request.workflow_id)
                        .with_status(ExecutionStatus::Success),
                })
            }

            async fn find_recent(
                &self,
                _workflow_id: WorkflowId,
            ) -> Result<Option<ExecutionRecord>, ServiceError> {
                Ok(None)
            }

            async fn get_status(
                &self,
                _execution_id: ExecutionId,
            ) -> Result<Option<ExecutionRecord>, ServiceError> {
                Ok(None)
            }
        }

        let shared_registry = registry();
        let mut editor = EditorSession::new(LayeredLayout::default(), Arc::clone(&shared_registry));
        let orchestrator = ExecutionOrchestrator::new(InlineService, shared_registry);
        let workflow_id = WorkflowId::new();

        // An unconfigured graph is rejected before any network call.
        let id = editor.add_node(action_node("Send")).unwrap();
        let result = orchestrator
            .execute(workflow_id, editor.snapshot(), serde_json::Value::Null)
            .await;
        assert!(matches!(result, Err(ExecutionError::Validation(_))));

        // Configuring the node unblocks execution.
        let mut partial = ConfigMap::new();
        partial.insert("to".to_string(), serde_json::json!("ops@example.com"));
        editor.update_node_config(id, partial).unwrap();

        let record = orchestrator
            .execute(workflow_id, editor.snapshot(), serde_json::Value::Null)
            .await
            .expect("configured graph executes");
        assert_eq!(record.status, ExecutionStatus::Success);
    }

    #[tokio::test]
    async fn load_missing_document_starts_blank() {
        let store = InMemoryWorkflowStore::new();
        let mut editor = session();
        editor.add_node(action_node("Stale")).unwrap();

        let loaded = editor.load_from(&store, WorkflowId::new()).await.unwrap();
        assert!(loaded.is_none());
        assert!(editor.snapshot().is_empty());
    }

    #[tokio::test]
    async fn save_then_load_roundtrip() {
        let store = InMemoryWorkflowStore::new();
        let mut editor = session();
        let a = editor.add_node(
            action_node("Send").with_config_value("to", serde_json::json!("ops@example.com")),
        )
        .unwrap();
        let b = editor.add_node(action_node("Audit")).unwrap();
        editor.add_edge(Edge::new(a, b)).unwrap();

        let saved = editor
            .save_to(&store, None, "Digest", DocumentMeta::new())
            .await
            .unwrap();

        let mut fresh = session();
        let loaded = fresh.load_from(&store, saved.id).await.unwrap();
        assert!(loaded.is_some());
        assert_eq!(fresh.nodes().len(), 2);
        assert_eq!(fresh.edges().len(), 1);
        assert_eq!(
            fresh.node(a).unwrap().config.get("to"),
            Some(&serde_json::json!("ops@example.com"))
        );
    }
}
