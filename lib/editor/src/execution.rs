//! Client-side execution records.
//!
//! These types mirror what the execution backend reports about a run. The
//! orchestrator never mutates a record it received; it only decides whether
//! the record's status is allowed to advance its own state machine.

use crate::edge::Edge;
use crate::node::{Node, NodeId};
use chrono::{DateTime, Utc};
use flowloom_core::{ExecutionId, WorkflowId};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// The status of an execution as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Queued, waiting for a runner.
    Queued,
    /// Actively executing.
    Running,
    /// All nodes completed.
    Success,
    /// The run failed.
    Failed,
    /// Some nodes completed, some did not.
    Partial,
}

impl ExecutionStatus {
    /// Returns true if this is a terminal status.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::Partial)
    }

    /// Returns true if this terminal status represents a failure.
    ///
    /// `Partial` is failure-flavored but keeps its distinct label so
    /// per-node outcomes can be reported.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Partial)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Partial => "partial",
        };
        write!(f, "{label}")
    }
}

/// The outcome of a single node within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRunStatus {
    /// The node completed.
    Success,
    /// The node failed.
    Failed,
    /// The node was skipped (upstream failure or branch not taken).
    Skipped,
}

/// Per-node outcome within an execution record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeResult {
    /// The node that ran.
    pub node_id: NodeId,
    /// The node's outcome.
    pub status: NodeRunStatus,
    /// How long the node ran, in milliseconds.
    pub duration_ms: Option<i64>,
    /// Error message if the node failed.
    pub error: Option<String>,
}

/// The client-side view of one execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Backend-assigned execution identifier.
    pub id: ExecutionId,
    /// The workflow that was executed.
    pub workflow_id: WorkflowId,
    /// Current status.
    pub status: ExecutionStatus,
    /// When the execution was created. Discovery uses this to reject stale
    /// records.
    pub queued_at: DateTime<Utc>,
    /// When execution started.
    pub started_at: Option<DateTime<Utc>>,
    /// When execution reached a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
    /// Per-node outcomes, in execution order.
    #[serde(default)]
    pub node_results: Vec<NodeResult>,
    /// Run-level error message, if any.
    pub error: Option<String>,
}

impl ExecutionRecord {
    /// Creates a freshly queued record.
    #[must_use]
    pub fn queued(id: ExecutionId, workflow_id: WorkflowId) -> Self {
        Self {
            id,
            workflow_id,
            status: ExecutionStatus::Queued,
            queued_at: Utc::now(),
            started_at: None,
            completed_at: None,
            node_results: Vec::new(),
            error: None,
        }
    }

    /// Returns a copy with the given status.
    #[must_use]
    pub fn with_status(mut self, status: ExecutionStatus) -> Self {
        self.status = status;
        self
    }

    /// Returns true if the record's status is terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Returns the node results that failed.
    pub fn failed_nodes(&self) -> impl Iterator<Item = &NodeResult> {
        self.node_results
            .iter()
            .filter(|result| result.status == NodeRunStatus::Failed)
    }

    /// Returns the run duration, if it has started.
    #[must_use]
    pub fn duration(&self) -> Option<chrono::Duration> {
        let start = self.started_at?;
        let end = self.completed_at.unwrap_or_else(Utc::now);
        Some(end - start)
    }
}

/// A request to execute the current graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// The workflow being executed.
    pub workflow_id: WorkflowId,
    /// The nodes at submission time.
    pub nodes: Vec<Node>,
    /// The edges at submission time.
    pub edges: Vec<Edge>,
    /// Context for the trigger node.
    pub trigger_data: JsonValue,
}

/// The backend's immediate answer to a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Accepted asynchronously; the execution identifier is not yet known
    /// and must be discovered.
    Queued,
    /// The backend ran the workflow inline and returned the full result.
    Completed { record: ExecutionRecord },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(!ExecutionStatus::Queued.is_terminal());
        assert!(!ExecutionStatus::Running.is_terminal());
        assert!(ExecutionStatus::Success.is_terminal());
        assert!(ExecutionStatus::Failed.is_terminal());
        assert!(ExecutionStatus::Partial.is_terminal());
    }

    #[test]
    fn partial_is_failure_flavored() {
        assert!(ExecutionStatus::Partial.is_failure());
        assert!(ExecutionStatus::Failed.is_failure());
        assert!(!ExecutionStatus::Success.is_failure());
    }

    #[test]
    fn failed_nodes_filter() {
        let mut record = ExecutionRecord::queued(ExecutionId::new(), WorkflowId::new());
        record.node_results = vec![
            NodeResult {
                node_id: NodeId::new(),
                status: NodeRunStatus::Success,
                duration_ms: Some(12),
                error: None,
            },
            NodeResult {
                node_id: NodeId::new(),
                status: NodeRunStatus::Failed,
                duration_ms: Some(3),
                error: Some("connection refused".to_string()),
            },
            NodeResult {
                node_id: NodeId::new(),
                status: NodeRunStatus::Skipped,
                duration_ms: None,
                error: None,
            },
        ];

        assert_eq!(record.failed_nodes().count(), 1);
    }

    #[test]
    fn record_serde_roundtrip() {
        let record = ExecutionRecord::queued(ExecutionId::new(), WorkflowId::new())
            .with_status(ExecutionStatus::Running);
        let json = serde_json::to_string(&record).expect("serialize");
        let parsed: ExecutionRecord = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(record, parsed);
    }

    #[test]
    fn submit_outcome_tagging() {
        let json = serde_json::to_value(SubmitOutcome::Queued).expect("serialize");
        assert_eq!(json["outcome"], "queued");
    }
}
