// Injectable observability for workflow runs
//
// Every node execution and every attempt is reported to a `NodeObserver`
// handed to the workflow. Nothing is written to a fixed global sink.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use super::state::NodeKind;

/// One node execution
#[derive(Debug, Clone, Serialize)]
pub struct NodeEvent {
    /// Unique per attempt
    pub run_id: Uuid,
    /// 1-indexed attempt number
    pub attempt: u32,
    pub node: NodeKind,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    /// Characters sent to the model (system instruction + messages)
    pub input_chars: usize,
    /// Characters received (0 when the call failed)
    pub output_chars: usize,
    pub succeeded: bool,
}

/// How an attempt ended
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AttemptStatus {
    Completed { passed: bool, revisions: u32 },
    Failed { error: String },
}

/// One full run of the revision loop
#[derive(Debug, Clone, Serialize)]
pub struct AttemptEvent {
    pub run_id: Uuid,
    pub attempt: u32,
    pub max_attempts: u32,
    pub duration: Duration,
    pub status: AttemptStatus,
}

/// Receives workflow events. Must be cheap and non-blocking: it is called
/// inline on the run's task.
pub trait NodeObserver: Send + Sync {
    fn on_node(&self, event: &NodeEvent);

    fn on_attempt(&self, _event: &AttemptEvent) {}
}

/// Emits each event as a structured `tracing` record
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl NodeObserver for TracingObserver {
    fn on_node(&self, event: &NodeEvent) {
        tracing::info!(
            run_id = %event.run_id,
            attempt = event.attempt,
            node = %event.node,
            duration_ms = event.duration.as_millis() as u64,
            input_chars = event.input_chars,
            output_chars = event.output_chars,
            succeeded = event.succeeded,
            "Node finished"
        );
    }

    fn on_attempt(&self, event: &AttemptEvent) {
        match &event.status {
            AttemptStatus::Completed { passed, revisions } => tracing::info!(
                run_id = %event.run_id,
                attempt = event.attempt,
                passed = *passed,
                revisions = *revisions,
                duration_ms = event.duration.as_millis() as u64,
                "Attempt completed"
            ),
            AttemptStatus::Failed { error } => tracing::warn!(
                run_id = %event.run_id,
                attempt = event.attempt,
                max_attempts = event.max_attempts,
                error = %error,
                "Attempt failed"
            ),
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingObserver {
    nodes: Mutex<Vec<NodeEvent>>,
    attempts: Mutex<Vec<AttemptEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> Vec<NodeEvent> {
        self.nodes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn attempts(&self) -> Vec<AttemptEvent> {
        self.attempts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Node kinds in execution order
    pub fn node_sequence(&self) -> Vec<NodeKind> {
        self.nodes().iter().map(|e| e.node).collect()
    }

    /// Executions of one node kind
    pub fn count(&self, node: NodeKind) -> usize {
        self.nodes().iter().filter(|e| e.node == node).count()
    }
}

impl NodeObserver for RecordingObserver {
    fn on_node(&self, event: &NodeEvent) {
        self.nodes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
    }

    fn on_attempt(&self, event: &AttemptEvent) {
        self.attempts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
    }
}
