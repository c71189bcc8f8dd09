// Self-correcting content generation
//
// A worker model drafts an answer, an evaluator model judges it, and until
// the answer passes (or the revision budget runs out) the evaluator critiques
// and the worker revises. The whole loop is retried from scratch on failure.

mod controller;
mod error;
mod history;
mod judge;
mod nodes;
mod observer;
mod prompts;
mod retry;
mod state;

pub use controller::{Outcome, RevisionLoop};
pub use error::WorkflowError;
pub use history::ConversationHistory;
pub use judge::{Judge, JudgeMode, JudgeParsing};
pub use nodes::NodeRunner;
pub use observer::{
    AttemptEvent, AttemptStatus, NodeEvent, NodeObserver, RecordingObserver, TracingObserver,
};
pub use prompts::{CRITIC_SYSTEM, EVALUATOR_SYSTEM, REVISE_SYSTEM, WORKER_SYSTEM};
pub use retry::RetryWrapper;
pub use state::{NodeKind, StateUpdate, WorkflowState};

use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::{Config, WorkflowSettings};
use crate::providers::{create_model_handle, ModelHandle};

/// The configured workflow: two models plus loop, retry and judging settings.
///
/// A `Workflow` holds no per-run state, so one instance can serve any number
/// of concurrent `run` calls.
#[derive(Clone)]
pub struct Workflow {
    worker: ModelHandle,
    evaluator: ModelHandle,
    settings: WorkflowSettings,
    observer: Arc<dyn NodeObserver>,
    cancel: CancellationToken,
}

impl Workflow {
    pub fn new(worker: ModelHandle, evaluator: ModelHandle) -> Self {
        Self {
            worker,
            evaluator,
            settings: WorkflowSettings::default(),
            observer: Arc::new(TracingObserver),
            cancel: CancellationToken::new(),
        }
    }

    /// Build both model handles and take the workflow settings from `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let worker = create_model_handle(&config.worker)?;
        let evaluator = create_model_handle(&config.evaluator)?;
        Ok(Self::new(worker, evaluator).with_settings(config.workflow.clone()))
    }

    pub fn with_settings(mut self, settings: WorkflowSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn NodeObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Cancelling `cancel` aborts the in-flight model call and any pending
    /// retry, and the run returns `WorkflowError::Cancelled`.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    /// Generate an answer for `prompt`, retrying the whole loop on failure.
    pub async fn run(&self, prompt: &str) -> Result<Outcome, WorkflowError> {
        let judge = Judge::new(self.settings.judge_mode, self.settings.judge_parsing);
        let controller = RevisionLoop::from_settings(&self.settings);
        let retry = RetryWrapper::new(self.settings.max_retries)
            .with_base_delay(self.settings.retry_base_delay())
            .with_cancellation(self.cancel.clone());

        tracing::info!(
            worker = %self.worker.provider_name(),
            evaluator = %self.evaluator.provider_name(),
            max_revisions = controller.max_revisions(),
            max_retries = retry.max_retries(),
            "Starting content generation"
        );

        retry
            .run(|attempt| self.run_attempt(prompt, attempt, &controller, judge))
            .await
    }

    /// One attempt with fresh state
    async fn run_attempt(
        &self,
        prompt: &str,
        attempt: u32,
        controller: &RevisionLoop,
        judge: Judge,
    ) -> Result<Outcome, WorkflowError> {
        let run_id = Uuid::new_v4();
        let started = Instant::now();

        let nodes = NodeRunner::new(self.worker.clone(), self.evaluator.clone(), judge)
            .with_call_timeout(self.settings.call_timeout())
            .with_cancellation(self.cancel.clone())
            .with_observer(self.observer.clone())
            .for_attempt(run_id, attempt);

        let result = controller.run(&nodes, prompt).await;

        let status = match &result {
            Ok(outcome) => AttemptStatus::Completed {
                passed: outcome.passed(),
                revisions: outcome.revisions(),
            },
            Err(error) => AttemptStatus::Failed {
                error: error.describe(),
            },
        };
        self.observer.on_attempt(&AttemptEvent {
            run_id,
            attempt,
            max_attempts: self.settings.max_retries.max(1),
            duration: started.elapsed(),
            status,
        });

        result
    }
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("worker", &self.worker)
            .field("evaluator", &self.evaluator)
            .field("settings", &self.settings)
            .finish()
    }
}

/// Generate content for `prompt` and return only the final answer text.
///
/// Runs with default loop settings and `max_retries` attempts. Whether the
/// answer passed or the revision budget ran out is not reported; use
/// [`Workflow::run`] for that.
pub async fn generate_content(
    prompt: &str,
    worker: ModelHandle,
    evaluator: ModelHandle,
    max_retries: u32,
) -> Result<String, WorkflowError> {
    let settings = WorkflowSettings {
        max_retries,
        ..WorkflowSettings::default()
    };
    Workflow::new(worker, evaluator)
        .with_settings(settings)
        .run(prompt)
        .await
        .map(Outcome::into_answer)
}
