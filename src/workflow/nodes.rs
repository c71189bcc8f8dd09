// The four workflow nodes: Draft, Evaluate, Critique, Revise
//
// Each node reads the current state, makes exactly one model call and
// returns a partial update. Nodes never catch model errors; those propagate
// to the retry wrapper.

use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::error::WorkflowError;
use super::history::ConversationHistory;
use super::judge::Judge;
use super::observer::{NodeEvent, NodeObserver, TracingObserver};
use super::prompts::{
    critique_request, evaluation_request, CRITIC_SYSTEM, EVALUATOR_SYSTEM, REVISE_SYSTEM,
    WORKER_SYSTEM,
};
use super::state::{NodeKind, StateUpdate, WorkflowState};
use crate::providers::{Message, ModelHandle, ProviderRequest};

/// Executes nodes for one attempt.
///
/// Draft and Revise use the worker model. Evaluate and Critique use the
/// evaluator model.
pub struct NodeRunner {
    worker: ModelHandle,
    evaluator: ModelHandle,
    judge: Judge,
    call_timeout: Option<Duration>,
    cancel: CancellationToken,
    observer: Arc<dyn NodeObserver>,
    run_id: Uuid,
    attempt: u32,
}

impl NodeRunner {
    pub fn new(worker: ModelHandle, evaluator: ModelHandle, judge: Judge) -> Self {
        Self {
            worker,
            evaluator,
            judge,
            call_timeout: None,
            cancel: CancellationToken::new(),
            observer: Arc::new(TracingObserver),
            run_id: Uuid::new_v4(),
            attempt: 1,
        }
    }

    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn NodeObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Tag emitted events with the attempt they belong to
    pub fn for_attempt(mut self, run_id: Uuid, attempt: u32) -> Self {
        self.run_id = run_id;
        self.attempt = attempt;
        self
    }

    /// Dispatch to the node named by `kind`
    pub async fn execute(
        &self,
        kind: NodeKind,
        state: &WorkflowState,
    ) -> Result<StateUpdate, WorkflowError> {
        match kind {
            NodeKind::Draft => self.draft(state).await,
            NodeKind::Evaluate => self.evaluate(state).await,
            NodeKind::Critique => self.critique(state).await,
            NodeKind::Revise => self.revise(state).await,
        }
    }

    /// Produce the first answer to the prompt
    pub async fn draft(&self, state: &WorkflowState) -> Result<StateUpdate, WorkflowError> {
        let turns = vec![
            Message::system(WORKER_SYSTEM),
            Message::user(state.prompt.clone()),
        ];
        let mut messages = state.worker_history.snapshot();
        messages.extend(turns.iter().cloned());

        let text = self
            .call(NodeKind::Draft, &self.worker, messages, None)
            .await?;

        let mut worker_turns = turns;
        worker_turns.push(Message::assistant(text.clone()));

        Ok(StateUpdate {
            worker_turns,
            draft: Some(text),
            ..Default::default()
        })
    }

    /// Judge the current draft against the prompt. The draft is copied to
    /// `final_answer` whatever the verdict.
    pub async fn evaluate(&self, state: &WorkflowState) -> Result<StateUpdate, WorkflowError> {
        let messages = vec![
            Message::system(EVALUATOR_SYSTEM),
            Message::user(evaluation_request(&state.prompt, &state.draft, &self.judge)),
        ];

        let response = self
            .call(NodeKind::Evaluate, &self.evaluator, messages, None)
            .await?;
        let passed = self.judge.parse(&response)?;

        tracing::debug!(
            run_id = %self.run_id,
            passed,
            response = %response.trim(),
            "Evaluator verdict"
        );

        Ok(StateUpdate {
            passed: Some(passed),
            final_answer: Some(state.draft.clone()),
            ..Default::default()
        })
    }

    /// Ask the editor for feedback on the current draft
    pub async fn critique(&self, state: &WorkflowState) -> Result<StateUpdate, WorkflowError> {
        let mut editor_history = ConversationHistory::new();
        editor_history.append(Message::system(CRITIC_SYSTEM));
        editor_history.append(Message::user(critique_request(&state.prompt, &state.draft)));

        let feedback = self
            .call(
                NodeKind::Critique,
                &self.evaluator,
                editor_history.snapshot(),
                None,
            )
            .await?;
        editor_history.append(Message::assistant(feedback.clone()));

        Ok(StateUpdate {
            editor_history: Some(editor_history),
            feedback: Some(feedback),
            ..Default::default()
        })
    }

    /// Rewrite the draft with the full worker history plus the latest feedback
    pub async fn revise(&self, state: &WorkflowState) -> Result<StateUpdate, WorkflowError> {
        let feedback_turn = Message::user(state.feedback.clone());
        let mut messages = state.worker_history.snapshot();
        messages.push(feedback_turn.clone());

        let text = self
            .call(NodeKind::Revise, &self.worker, messages, Some(REVISE_SYSTEM))
            .await?;

        Ok(StateUpdate {
            worker_turns: vec![feedback_turn, Message::assistant(text.clone())],
            draft: Some(text),
            completed_revision: true,
            ..Default::default()
        })
    }

    async fn call(
        &self,
        node: NodeKind,
        model: &ModelHandle,
        messages: Vec<Message>,
        system: Option<&str>,
    ) -> Result<String, WorkflowError> {
        let request = model.request(messages, system);
        let started_at = Utc::now();
        let started = Instant::now();

        let result = self.send_guarded(node, model, &request).await;

        self.observer.on_node(&NodeEvent {
            run_id: self.run_id,
            attempt: self.attempt,
            node,
            started_at,
            duration: started.elapsed(),
            input_chars: request.input_chars(),
            output_chars: result
                .as_ref()
                .map(|text| text.chars().count())
                .unwrap_or(0),
            succeeded: result.is_ok(),
        });

        result
    }

    /// One model call, bounded by the call timeout and the cancellation token
    async fn send_guarded(
        &self,
        node: NodeKind,
        model: &ModelHandle,
        request: &ProviderRequest,
    ) -> Result<String, WorkflowError> {
        let call = async {
            match self.call_timeout {
                Some(after) => match tokio::time::timeout(after, model.send(request)).await {
                    Ok(result) => {
                        result.map_err(|source| WorkflowError::ModelInvocation { node, source })
                    }
                    Err(_) => Err(WorkflowError::Timeout { node, after }),
                },
                None => model
                    .send(request)
                    .await
                    .map_err(|source| WorkflowError::ModelInvocation { node, source }),
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(WorkflowError::Cancelled),
            result = call => result,
        }
    }
}
