//! Execution orchestration.
//!
//! The orchestrator drives one execution request to completion:
//!
//! 1. Validate locally — a graph with no nodes or with unconfigured nodes
//!    never reaches the network.
//! 2. Submit to the [`ExecutionService`]. The backend usually acknowledges
//!    asynchronously without an execution identifier.
//! 3. Discovery — poll `find_recent` on a fixed interval, bounded by an
//!    attempt ceiling, accepting only records created within a recency
//!    window. Exhausting the budget is a distinct failure from a workflow
//!    that genuinely failed server-side.
//! 4. Tracking — poll `get_status` until a terminal status latches. Not
//!    found and transport errors keep the loop alive; tracking has no
//!    ceiling because long runs are legitimate.
//!
//! Status transitions are monotonic. A late response for a superseded run
//! (stopped, or replaced by a newer `execute`) is discarded via a
//! generation counter. `stop` wakes any pending poll timer immediately;
//! it is a client-visibility cancellation only, not a server-side abort.

use crate::error::ValidationError;
use crate::execution::{ExecutionRecord, ExecutionRequest, ExecutionStatus, SubmitOutcome};
use crate::graph::GraphSnapshot;
use crate::schema::NodeTypeRegistry;
use crate::service::ExecutionService;
use crate::validate;
use chrono::Utc;
use flowloom_core::{ExecutionId, WorkflowId};
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Tuning knobs for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Spacing between discovery and tracking polls.
    pub poll_interval: Duration,
    /// Maximum discovery attempts before giving up.
    pub discovery_attempts: u32,
    /// How recent a discovered record must be to be accepted.
    pub discovery_window: chrono::Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            discovery_attempts: 10,
            discovery_window: chrono::Duration::seconds(30),
        }
    }
}

/// The orchestrator's observable status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Nothing is being tracked.
    Idle,
    /// Submitted, execution not yet running.
    Queued,
    /// The execution is running.
    Running,
    /// Terminal: all nodes completed.
    Success,
    /// Terminal: the run failed (or could not be tracked).
    Failed,
    /// Terminal: some nodes completed, some did not.
    Partial,
}

impl RunStatus {
    /// Returns true while an execution is being tracked.
    #[must_use]
    pub fn is_executing(&self) -> bool {
        matches!(self, Self::Queued | Self::Running)
    }

    /// Returns true for terminal statuses.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::Partial)
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Queued => 1,
            Self::Running => 2,
            Self::Success | Self::Failed | Self::Partial => 3,
        }
    }
}

impl From<ExecutionStatus> for RunStatus {
    fn from(status: ExecutionStatus) -> Self {
        match status {
            ExecutionStatus::Queued => Self::Queued,
            ExecutionStatus::Running => Self::Running,
            ExecutionStatus::Success => Self::Success,
            ExecutionStatus::Failed => Self::Failed,
            ExecutionStatus::Partial => Self::Partial,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Partial => "partial",
        };
        write!(f, "{label}")
    }
}

/// Computes the next status for an incoming report.
///
/// Returns `None` when the incoming status must be discarded: terminal
/// states latch, and a status never moves backwards.
fn advance(current: RunStatus, incoming: RunStatus) -> Option<RunStatus> {
    if current == incoming {
        return Some(current);
    }
    if current.is_terminal() || incoming.rank() < current.rank() {
        return None;
    }
    Some(incoming)
}

/// Emitted to observers on every state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionStateChanged {
    /// True while an execution is being tracked.
    pub is_executing: bool,
    /// The orchestrator's status after the transition.
    pub status: RunStatus,
    /// Whether the submitted graph had nodes.
    pub has_nodes: bool,
}

/// Errors from driving an execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// Local validation failed; nothing was submitted.
    Validation(ValidationError),
    /// Submission failed; the attempt was aborted.
    Submit { message: String },
    /// Discovery exhausted its attempt budget without locating the
    /// execution record.
    DiscoveryTimeout { attempts: u32 },
    /// The run was stopped or superseded by a newer execution.
    Cancelled,
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "validation failed: {err}"),
            Self::Submit { message } => write!(f, "submission failed: {message}"),
            Self::DiscoveryTimeout { attempts } => {
                write!(
                    f,
                    "could not track execution status after {attempts} attempts"
                )
            }
            Self::Cancelled => write!(f, "execution tracking cancelled"),
        }
    }
}

impl std::error::Error for ExecutionError {}

impl From<ValidationError> for ExecutionError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

type ExecutionObserver = Box<dyn Fn(ExecutionStateChanged) + Send + Sync>;

struct Tracker {
    status: RunStatus,
    generation: u64,
    has_nodes: bool,
    record: Option<ExecutionRecord>,
}

struct Shared {
    state: Mutex<Tracker>,
    observers: Mutex<Vec<ExecutionObserver>>,
    wake: Notify,
}

impl Shared {
    fn new() -> Self {
        Self {
            state: Mutex::new(Tracker {
                status: RunStatus::Idle,
                generation: 0,
                has_nodes: false,
                record: None,
            }),
            observers: Mutex::new(Vec::new()),
            wake: Notify::new(),
        }
    }

    fn emit(&self, change: ExecutionStateChanged) {
        let observers = self.observers.lock().expect("observer lock");
        for observer in observers.iter() {
            observer(change);
        }
    }

    /// Starts a new run, superseding any in-flight one.
    fn begin(&self, has_nodes: bool) -> u64 {
        let (generation, change) = {
            let mut state = self.state.lock().expect("orchestrator state lock");
            state.generation += 1;
            state.status = RunStatus::Queued;
            state.has_nodes = has_nodes;
            state.record = None;
            (
                state.generation,
                ExecutionStateChanged {
                    is_executing: true,
                    status: RunStatus::Queued,
                    has_nodes,
                },
            )
        };
        self.wake.notify_waiters();
        self.emit(change);
        generation
    }

    /// Fails if the run has been stopped or superseded.
    fn ensure_current(&self, generation: u64) -> Result<(), ExecutionError> {
        let state = self.state.lock().expect("orchestrator state lock");
        if state.generation == generation {
            Ok(())
        } else {
            Err(ExecutionError::Cancelled)
        }
    }

    /// Applies a reported status, enforcing monotonic transitions.
    fn apply_status(
        &self,
        generation: u64,
        incoming: ExecutionStatus,
        record: Option<ExecutionRecord>,
    ) -> Result<(), ExecutionError> {
        let change = {
            let mut state = self.state.lock().expect("orchestrator state lock");
            if state.generation != generation {
                return Err(ExecutionError::Cancelled);
            }
            let incoming = RunStatus::from(incoming);
            let Some(next) = advance(state.status, incoming) else {
                tracing::debug!(
                    current = %state.status,
                    incoming = %incoming,
                    "discarding out-of-order status report"
                );
                return Ok(());
            };
            if let Some(record) = record {
                state.record = Some(record);
            }
            if next == state.status {
                return Ok(());
            }
            state.status = next;
            ExecutionStateChanged {
                is_executing: next.is_executing(),
                status: next,
                has_nodes: state.has_nodes,
            }
        };
        self.emit(change);
        Ok(())
    }

    /// Returns the run to idle after a failed submission.
    fn reset_to_idle(&self, generation: u64) {
        let change = {
            let mut state = self.state.lock().expect("orchestrator state lock");
            if state.generation != generation || state.status == RunStatus::Idle {
                return;
            }
            state.status = RunStatus::Idle;
            ExecutionStateChanged {
                is_executing: false,
                status: RunStatus::Idle,
                has_nodes: state.has_nodes,
            }
        };
        self.emit(change);
    }

    /// Stops tracking and returns to idle from any non-idle state.
    fn stop(&self) {
        let change = {
            let mut state = self.state.lock().expect("orchestrator state lock");
            if state.status == RunStatus::Idle {
                None
            } else {
                state.status = RunStatus::Idle;
                state.generation += 1;
                state.record = None;
                Some(ExecutionStateChanged {
                    is_executing: false,
                    status: RunStatus::Idle,
                    has_nodes: state.has_nodes,
                })
            }
        };
        self.wake.notify_waiters();
        if let Some(change) = change {
            self.emit(change);
        }
    }
}

/// A handle for stopping the orchestrator from outside the polling task.
#[derive(Clone)]
pub struct StopHandle {
    shared: Arc<Shared>,
}

impl StopHandle {
    /// Stops tracking immediately and resets the orchestrator to idle.
    pub fn stop(&self) {
        self.shared.stop();
    }
}

/// Drives execution requests against the backend.
pub struct ExecutionOrchestrator<S: ExecutionService> {
    service: S,
    registry: Arc<dyn NodeTypeRegistry>,
    config: OrchestratorConfig,
    shared: Arc<Shared>,
}

impl<S: ExecutionService> ExecutionOrchestrator<S> {
    /// Creates a new orchestrator with default configuration.
    pub fn new(service: S, registry: Arc<dyn NodeTypeRegistry>) -> Self {
        Self {
            service,
            registry,
            config: OrchestratorConfig::default(),
            shared: Arc::new(Shared::new()),
        }
    }

    /// Overrides the configuration.
    #[must_use]
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers an observer called on every state transition.
    pub fn subscribe(&self, observer: impl Fn(ExecutionStateChanged) + Send + Sync + 'static) {
        self.shared
            .observers
            .lock()
            .expect("observer lock")
            .push(Box::new(observer));
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> RunStatus {
        self.shared
            .state
            .lock()
            .expect("orchestrator state lock")
            .status
    }

    /// Returns the most recent record for the tracked run, if any.
    #[must_use]
    pub fn last_record(&self) -> Option<ExecutionRecord> {
        self.shared
            .state
            .lock()
            .expect("orchestrator state lock")
            .record
            .clone()
    }

    /// Returns a handle that can stop tracking from another task.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Stops tracking immediately and resets to idle.
    pub fn stop(&self) {
        self.shared.stop();
    }

    /// Submits the snapshot and drives it to a terminal status.
    ///
    /// # Errors
    ///
    /// Returns a validation error without any network call when the graph
    /// is empty or has unconfigured nodes; a submit error when submission
    /// fails; a discovery timeout when the execution record cannot be
    /// located; or `Cancelled` when stopped or superseded.
    pub async fn execute(
        &self,
        workflow_id: WorkflowId,
        snapshot: GraphSnapshot,
        trigger_data: JsonValue,
    ) -> Result<ExecutionRecord, ExecutionError> {
        if snapshot.is_empty() {
            return Err(ValidationError::EmptyGraph.into());
        }
        let offenders = validate::unconfigured_nodes(&snapshot.nodes, self.registry.as_ref());
        if !offenders.is_empty() {
            let node_ids = offenders.iter().map(|node| node.id).collect();
            return Err(ValidationError::Unconfigured { node_ids }.into());
        }

        let generation = self.shared.begin(true);
        tracing::info!(
            workflow_id = %workflow_id,
            node_count = snapshot.nodes.len(),
            "submitting workflow execution"
        );

        let request = ExecutionRequest {
            workflow_id,
            nodes: snapshot.nodes,
            edges: snapshot.edges,
            trigger_data,
        };
        let outcome = match self.service.submit(request).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(workflow_id = %workflow_id, error = %err, "submission failed");
                self.shared.reset_to_idle(generation);
                return Err(ExecutionError::Submit {
                    message: err.to_string(),
                });
            }
        };
        self.shared.ensure_current(generation)?;

        let execution_id = match outcome {
            SubmitOutcome::Completed { record } => {
                let execution_id = record.id;
                self.shared
                    .apply_status(generation, record.status, Some(record.clone()))?;
                if record.is_terminal() {
                    tracing::info!(
                        workflow_id = %workflow_id,
                        execution_id = %execution_id,
                        status = %record.status,
                        "execution completed inline"
                    );
                    return Ok(record);
                }
                execution_id
            }
            SubmitOutcome::Queued => {
                let record = self.discover(generation, workflow_id).await?;
                let execution_id = record.id;
                self.shared
                    .apply_status(generation, record.status, Some(record.clone()))?;
                if record.is_terminal() {
                    return Ok(record);
                }
                execution_id
            }
        };

        self.track(generation, execution_id).await
    }

    /// Locates the backend-assigned execution record for this workflow.
    async fn discover(
        &self,
        generation: u64,
        workflow_id: WorkflowId,
    ) -> Result<ExecutionRecord, ExecutionError> {
        let attempts = self.config.discovery_attempts;
        for attempt in 1..=attempts {
            match self.service.find_recent(workflow_id).await {
                Ok(Some(record)) if self.is_recent(&record) => {
                    tracing::debug!(
                        workflow_id = %workflow_id,
                        execution_id = %record.id,
                        attempt,
                        "discovered execution record"
                    );
                    return Ok(record);
                }
                Ok(Some(record)) => {
                    tracing::debug!(
                        execution_id = %record.id,
                        queued_at = %record.queued_at,
                        "ignoring stale execution record"
                    );
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::debug!(
                        workflow_id = %workflow_id,
                        attempt,
                        error = %err,
                        "discovery poll failed; retrying"
                    );
                }
            }
            self.shared.ensure_current(generation)?;
            if attempt < attempts {
                self.pause(generation).await?;
            }
        }

        tracing::warn!(
            workflow_id = %workflow_id,
            attempts,
            "could not track execution status"
        );
        self.shared
            .apply_status(generation, ExecutionStatus::Failed, None)?;
        Err(ExecutionError::DiscoveryTimeout { attempts })
    }

    /// Polls the execution until it reaches a terminal status.
    async fn track(
        &self,
        generation: u64,
        execution_id: ExecutionId,
    ) -> Result<ExecutionRecord, ExecutionError> {
        loop {
            self.pause(generation).await?;
            match self.service.get_status(execution_id).await {
                Ok(Some(record)) => {
                    self.shared
                        .apply_status(generation, record.status, Some(record.clone()))?;
                    if record.is_terminal() {
                        tracing::info!(
                            execution_id = %execution_id,
                            status = %record.status,
                            "execution reached terminal status"
                        );
                        return Ok(record);
                    }
                }
                Ok(None) => {
                    tracing::debug!(
                        execution_id = %execution_id,
                        "execution not visible yet; continuing to poll"
                    );
                }
                Err(err) => {
                    tracing::debug!(
                        execution_id = %execution_id,
                        error = %err,
                        "status poll failed; retrying"
                    );
                }
            }
        }
    }

    /// Sleeps one poll interval, waking early on stop.
    async fn pause(&self, generation: u64) -> Result<(), ExecutionError> {
        tokio::select! {
            () = tokio::time::sleep(self.config.poll_interval) => {}
            () = self.shared.wake.notified() => {}
        }
        self.shared.ensure_current(generation)
    }

    fn is_recent(&self, record: &ExecutionRecord) -> bool {
        Utc::now().signed_duration_since(record.queued_at) <= self.config.discovery_window
    }
}
