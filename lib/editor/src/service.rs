//! The execution backend contract.
//!
//! The orchestrator drives execution through this trait; the real
//! implementation lives with the surrounding application. A `404`-style
//! "not visible yet" answer is modeled as `Ok(None)` so it is clearly
//! distinct from a transport failure.

use crate::execution::{ExecutionRecord, ExecutionRequest, SubmitOutcome};
use async_trait::async_trait;
use flowloom_core::{ExecutionId, WorkflowId};

/// Errors from the execution backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// A network-level failure; transient during polling.
    Transport { message: String },
    /// The backend refused the request.
    Rejected { message: String },
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport { message } => write!(f, "transport error: {message}"),
            Self::Rejected { message } => write!(f, "request rejected: {message}"),
        }
    }
}

impl std::error::Error for ServiceError {}

/// The external execution backend.
#[async_trait]
pub trait ExecutionService: Send + Sync {
    /// Submits the graph for execution.
    ///
    /// Returns either an asynchronous `Queued` acknowledgment (the
    /// execution identifier is assigned later) or, rarely, the full
    /// inline result.
    ///
    /// # Errors
    ///
    /// Any error aborts the submission attempt.
    async fn submit(&self, request: ExecutionRequest) -> Result<SubmitOutcome, ServiceError>;

    /// Returns the most recent execution for the workflow, if any.
    ///
    /// Used by the discovery phase to locate an asynchronously assigned
    /// execution identifier.
    ///
    /// # Errors
    ///
    /// Transport errors are treated as transient by the caller.
    async fn find_recent(
        &self,
        workflow_id: WorkflowId,
    ) -> Result<Option<ExecutionRecord>, ServiceError>;

    /// Returns the current record for an execution.
    ///
    /// `Ok(None)` means the execution is not visible yet and the caller
    /// should keep polling.
    ///
    /// # Errors
    ///
    /// Transport errors are treated as transient by the caller.
    async fn get_status(
        &self,
        execution_id: ExecutionId,
    ) -> Result<Option<ExecutionRecord>, ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_error_display() {
        let err = ServiceError::Transport {
            message: "connection reset".to_string(),
        };
        assert!(err.to_string().contains("transport error"));

        let err = ServiceError::Rejected {
            message: "workflow disabled".to_string(),
        };
        assert!(err.to_string().contains("rejected"));
    }
}
