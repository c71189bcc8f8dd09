// Workflow error taxonomy

use std::time::Duration;
use thiserror::Error;

use super::state::NodeKind;

/// Everything that can end a workflow attempt (or the whole run).
///
/// Nodes and the revision loop never swallow these: they propagate to the
/// retry wrapper, which decides whether another attempt is made.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The model call behind a node failed (transport, quota, malformed response)
    #[error("model call failed during {node} step")]
    ModelInvocation {
        node: NodeKind,
        #[source]
        source: anyhow::Error,
    },

    /// A model call did not answer within the configured call timeout
    #[error("{node} step timed out after {after:?}")]
    Timeout { node: NodeKind, after: Duration },

    /// Strict judgment parsing could not read pass/fail from the evaluator
    #[error("evaluator response is not a valid judgment: {response:?}")]
    UnparseableJudgment { response: String },

    /// The node-execution ceiling was hit before the loop terminated
    #[error("step limit of {limit} node executions exceeded")]
    StepLimitExceeded { limit: u32 },

    /// The caller cancelled the run
    #[error("run cancelled")]
    Cancelled,

    /// Every attempt failed
    #[error("max retries reached after {attempts} attempts; unable to generate content")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last_error: Box<WorkflowError>,
    },
}

impl WorkflowError {
    /// Whether the retry wrapper should start a fresh attempt after this error.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            WorkflowError::Cancelled | WorkflowError::RetriesExhausted { .. }
        )
    }

    /// The error followed by every cause, joined with ": "
    pub fn describe(&self) -> String {
        let mut text = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            text.push_str(": ");
            text.push_str(&cause.to_string());
            source = cause.source();
        }
        text
    }
}
