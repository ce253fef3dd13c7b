//! Workflow persistence contract.
//!
//! The editor treats persistence as a collaborator: plain node/edge
//! structures pass through [`WorkflowStore`]; serialization is the
//! implementation's concern. `load` returns `Ok(None)` on not-found so the
//! editor can initialize a blank canvas instead of handling an error.

use crate::graph::GraphSnapshot;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flowloom_core::WorkflowId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// Document metadata alongside the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMeta {
    /// Description of what the workflow does.
    pub description: Option<String>,
    /// Whether the workflow is enabled for triggering.
    pub enabled: bool,
    /// When the document was created.
    pub created_at: DateTime<Utc>,
    /// When the document was last saved.
    pub updated_at: DateTime<Utc>,
}

impl DocumentMeta {
    /// Creates metadata for a new document.
    #[must_use]
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            description: None,
            enabled: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl Default for DocumentMeta {
    fn default() -> Self {
        Self::new()
    }
}

/// A persisted workflow document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDocument {
    /// Unique identifier for this workflow.
    pub id: WorkflowId,
    /// Human-readable name.
    pub name: String,
    /// The graph at save time.
    pub graph: GraphSnapshot,
    /// Document metadata.
    pub meta: DocumentMeta,
}

/// Errors from the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store failed.
    Backend { message: String },
    /// The document could not be encoded or decoded.
    Serialization { message: String },
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Backend { message } => write!(f, "store backend error: {message}"),
            Self::Serialization { message } => write!(f, "serialization error: {message}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// The persistence collaborator.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Loads a document, returning `Ok(None)` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    async fn load(&self, id: WorkflowId) -> Result<Option<WorkflowDocument>, StoreError>;

    /// Saves a document, creating it when `id` is `None`.
    ///
    /// Returns the stored document, including the assigned identifier and
    /// refreshed timestamps.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    async fn save(
        &self,
        id: Option<WorkflowId>,
        name: &str,
        graph: &GraphSnapshot,
        meta: DocumentMeta,
    ) -> Result<WorkflowDocument, StoreError>;
}

/// An in-memory workflow store.
#[derive(Debug, Default)]
pub struct InMemoryWorkflowStore {
    documents: Mutex<HashMap<WorkflowId, WorkflowDocument>>,
}

impl InMemoryWorkflowStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.lock().expect("store lock").len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl WorkflowStore for InMemoryWorkflowStore {
    async fn load(&self, id: WorkflowId) -> Result<Option<WorkflowDocument>, StoreError> {
        let documents = self.documents.lock().expect("store lock");
        Ok(documents.get(&id).cloned())
    }

    async fn save(
        &self,
        id: Option<WorkflowId>,
        name: &str,
        graph: &GraphSnapshot,
        meta: DocumentMeta,
    ) -> Result<WorkflowDocument, StoreError> {
        let mut documents = self.documents.lock().expect("store lock");
        let id = id.unwrap_or_default();
        let created_at = documents
            .get(&id)
            .map_or(meta.created_at, |existing| existing.meta.created_at);

        let document = WorkflowDocument {
            id,
            name: name.to_string(),
            graph: graph.clone(),
            meta: DocumentMeta {
                created_at,
                updated_at: Utc::now(),
                ..meta
            },
        };
        documents.insert(id, document.clone());
        Ok(document)
    }
}
