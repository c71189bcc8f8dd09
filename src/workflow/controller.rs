// Revision loop: Draft -> Evaluate -> (Critique -> Revise -> Evaluate)* -> end

use serde::Serialize;

use super::error::WorkflowError;
use super::nodes::NodeRunner;
use super::state::{NodeKind, WorkflowState};
use crate::config::WorkflowSettings;

/// How a completed run ended.
///
/// Both variants carry the last evaluated draft; callers that only want the
/// text use [`Outcome::answer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum Outcome {
    /// The evaluator accepted the answer
    Passed { answer: String, revisions: u32 },
    /// The revision budget ran out before the evaluator accepted an answer
    Exhausted { answer: String, revisions: u32 },
}

impl Outcome {
    /// Read the outcome off a terminated state
    pub fn from_state(state: &WorkflowState) -> Self {
        let answer = state
            .final_answer
            .clone()
            .unwrap_or_else(|| state.draft.clone());
        let revisions = state.revision_count;
        if state.passed {
            Outcome::Passed { answer, revisions }
        } else {
            Outcome::Exhausted { answer, revisions }
        }
    }

    pub fn answer(&self) -> &str {
        match self {
            Outcome::Passed { answer, .. } | Outcome::Exhausted { answer, .. } => answer,
        }
    }

    pub fn into_answer(self) -> String {
        match self {
            Outcome::Passed { answer, .. } | Outcome::Exhausted { answer, .. } => answer,
        }
    }

    pub fn revisions(&self) -> u32 {
        match self {
            Outcome::Passed { revisions, .. } | Outcome::Exhausted { revisions, .. } => *revisions,
        }
    }

    pub fn passed(&self) -> bool {
        matches!(self, Outcome::Passed { .. })
    }
}

/// Drives one attempt through the node graph.
///
/// The loop ends after an Evaluate step that either passed or found the
/// revision budget spent. Independently of that, no more than `step_limit`
/// nodes run per attempt.
#[derive(Debug, Clone, Copy)]
pub struct RevisionLoop {
    max_revisions: u32,
    step_limit: u32,
}

impl RevisionLoop {
    pub fn new(max_revisions: u32, step_limit: u32) -> Self {
        Self {
            max_revisions,
            step_limit,
        }
    }

    pub fn from_settings(settings: &WorkflowSettings) -> Self {
        Self::new(settings.max_revisions, settings.step_limit)
    }

    pub fn max_revisions(&self) -> u32 {
        self.max_revisions
    }

    pub fn step_limit(&self) -> u32 {
        self.step_limit
    }

    /// Run the loop and report how it ended
    pub async fn run(&self, nodes: &NodeRunner, prompt: &str) -> Result<Outcome, WorkflowError> {
        let state = self.run_state(nodes, prompt).await?;
        Ok(Outcome::from_state(&state))
    }

    /// Run the loop and hand back the full terminal state
    pub async fn run_state(
        &self,
        nodes: &NodeRunner,
        prompt: &str,
    ) -> Result<WorkflowState, WorkflowError> {
        let mut state = WorkflowState::new(prompt);
        let mut next = Some(NodeKind::Draft);
        let mut executed = 0u32;

        while let Some(node) = next {
            if executed >= self.step_limit {
                tracing::warn!(
                    limit = self.step_limit,
                    revisions = state.revision_count,
                    "Step limit reached before the loop terminated"
                );
                return Err(WorkflowError::StepLimitExceeded {
                    limit: self.step_limit,
                });
            }

            let update = nodes.execute(node, &state).await?;
            state.apply(update);
            executed += 1;

            next = self.next_node(node, &state);
        }

        tracing::debug!(
            passed = state.passed,
            revisions = state.revision_count,
            steps = executed,
            worker_history_chars = state.worker_history.total_chars(),
            "Revision loop finished"
        );
        Ok(state)
    }

    /// Routing after the Evaluate step: `true` means another critique round
    pub fn should_revise(&self, state: &WorkflowState) -> bool {
        !state.passed && state.revision_count < self.max_revisions
    }

    fn next_node(&self, current: NodeKind, state: &WorkflowState) -> Option<NodeKind> {
        match current {
            NodeKind::Draft => Some(NodeKind::Evaluate),
            NodeKind::Evaluate if self.should_revise(state) => Some(NodeKind::Critique),
            NodeKind::Evaluate => None,
            NodeKind::Critique => Some(NodeKind::Revise),
            NodeKind::Revise => Some(NodeKind::Evaluate),
        }
    }
}

impl Default for RevisionLoop {
    fn default() -> Self {
        Self::from_settings(&WorkflowSettings::default())
    }
}
