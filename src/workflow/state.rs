// Per-attempt workflow state and the partial updates nodes return

use serde::{Deserialize, Serialize};
use std::fmt;

use super::history::ConversationHistory;
use crate::providers::Message;

/// The four steps of the revision loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Draft,
    Evaluate,
    Critique,
    Revise,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Draft => "draft",
            NodeKind::Evaluate => "evaluate",
            NodeKind::Critique => "critique",
            NodeKind::Revise => "revise",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable state of one attempt. Created fresh per attempt, owned by exactly
/// one run, never shared.
#[derive(Debug, Clone)]
pub struct WorkflowState {
    /// Original request, fixed at entry
    pub prompt: String,
    /// Every worker turn across all revisions
    pub worker_history: ConversationHistory,
    /// The most recent critique exchange (rebuilt per critique)
    pub editor_history: ConversationHistory,
    /// Current candidate answer
    pub draft: String,
    /// Most recent critique text
    pub feedback: String,
    /// Draft copied out by the last Evaluate step
    pub final_answer: Option<String>,
    /// Completed Revise steps
    pub revision_count: u32,
    /// Result of the most recent Evaluate step
    pub passed: bool,
}

impl WorkflowState {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            worker_history: ConversationHistory::new(),
            editor_history: ConversationHistory::new(),
            draft: String::new(),
            feedback: String::new(),
            final_answer: None,
            revision_count: 0,
            passed: false,
        }
    }

    /// Merge a node's partial update into the state.
    ///
    /// Worker turns are only ever appended; the revision counter only moves
    /// forward.
    pub fn apply(&mut self, update: StateUpdate) {
        self.worker_history.extend(update.worker_turns);
        if let Some(editor_history) = update.editor_history {
            self.editor_history = editor_history;
        }
        if let Some(draft) = update.draft {
            self.draft = draft;
        }
        if let Some(feedback) = update.feedback {
            self.feedback = feedback;
        }
        if let Some(final_answer) = update.final_answer {
            self.final_answer = Some(final_answer);
        }
        if update.completed_revision {
            self.revision_count += 1;
        }
        if let Some(passed) = update.passed {
            self.passed = passed;
        }

        debug_assert!(
            self.worker_history.is_empty()
                || self.worker_history.last_assistant() == Some(self.draft.as_str()),
            "draft must mirror the latest worker assistant turn"
        );
    }
}

/// What a node changed. Unset fields leave the state untouched.
#[derive(Debug, Clone, Default)]
pub struct StateUpdate {
    /// Turns to append to the worker history
    pub worker_turns: Vec<Message>,
    /// Replacement editor history
    pub editor_history: Option<ConversationHistory>,
    pub draft: Option<String>,
    pub feedback: Option<String>,
    pub final_answer: Option<String>,
    /// Increment the revision counter by one
    pub completed_revision: bool,
    pub passed: Option<bool>,
}
