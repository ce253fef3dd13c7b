//! Workflow graph editor core for the flowloom platform.
//!
//! This crate provides the headless editor engine behind the visual
//! workflow builder, including:
//!
//! - **Graph Store**: canonical node/edge collections with atomic mutation
//!   primitives and cascading deletes
//! - **History**: snapshot-based undo/redo with a replay guard
//! - **Merge**: reconciliation of AI-generated or loaded graphs that
//!   preserves user configuration
//! - **Validation**: required-field gating aggregated across the graph
//! - **Orchestration**: submit/discover/track execution polling with
//!   bounded discovery and monotonic status transitions
//! - **Layout**: deterministic auto-layout behind a collaborator trait
//!
//! Rendering, persistence backends, registry content and the execution
//! backend are external collaborators reached through traits.

pub mod config;
pub mod edge;
pub mod editor;
pub mod error;
pub mod execution;
pub mod graph;
pub mod history;
pub mod layout;
pub mod merge;
pub mod node;
pub mod orchestrator;
pub mod schema;
pub mod service;
pub mod store;
pub mod validate;

pub use config::{EditorConfig, OrchestratorSettings};
pub use edge::{Edge, EdgeId};
pub use editor::{EditorSession, GraphChanged};
pub use error::{GraphError, ValidationError};
pub use execution::{
    ExecutionRecord, ExecutionRequest, ExecutionStatus, NodeResult, NodeRunStatus, SubmitOutcome,
};
pub use graph::{GraphSnapshot, GraphStore, PlaceholderChoice};
pub use history::{HistoryManager, HistoryState};
pub use layout::{HandleSide, LayeredLayout, LayoutAdapter, LayoutDirection, LayoutEngine};
pub use merge::{EdgeDescription, GraphDescription, MergeOutcome, NodeDescription};
pub use node::{ConfigMap, Node, NodeId, NodeKind, Position};
pub use orchestrator::{
    ExecutionError, ExecutionOrchestrator, ExecutionStateChanged, OrchestratorConfig, RunStatus,
    StopHandle,
};
pub use schema::{ConfigField, ConfigSchema, NodeType, NodeTypeRef, NodeTypeRegistry, StaticRegistry};
pub use service::{ExecutionService, ServiceError};
pub use store::{DocumentMeta, InMemoryWorkflowStore, StoreError, WorkflowDocument, WorkflowStore};
pub use validate::{configuration_status, is_node_configured, unconfigured_nodes, ConfigurationStatus};
