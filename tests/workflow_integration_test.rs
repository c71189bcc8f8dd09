// Integration tests for the full revision workflow
//
// Models are replaced with rule-driven providers so every scenario is
// deterministic and needs no network.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use redraft::config::WorkflowSettings;
use redraft::providers::{
    LlmProvider, Message, ModelConfig, ModelHandle, ProviderRequest, ProviderResponse, Role,
};
use redraft::workflow::{
    generate_content, AttemptStatus, Judge, JudgeMode, JudgeParsing, NodeKind, NodeRunner,
    Outcome, RecordingObserver, RevisionLoop, Workflow, WorkflowError, EVALUATOR_SYSTEM,
};

type Rule = dyn Fn(&ProviderRequest, u32) -> anyhow::Result<String> + Send + Sync;

/// Answers each request with `rule(request, call_number)`; call numbers start at 1
struct RuleProvider {
    rule: Box<Rule>,
    calls: AtomicU32,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl RuleProvider {
    fn new(
        rule: impl Fn(&ProviderRequest, u32) -> anyhow::Result<String> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            rule: Box::new(rule),
            calls: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for RuleProvider {
    async fn send_message(&self, request: &ProviderRequest) -> anyhow::Result<ProviderResponse> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().unwrap().push(request.clone());
        let text = (self.rule)(request, call)?;
        Ok(ProviderResponse {
            id: format!("call-{call}"),
            model: request.model.clone(),
            text,
            stop_reason: Some("stop".to_string()),
            provider: "rule".to_string(),
        })
    }

    fn name(&self) -> &str {
        "rule"
    }

    fn default_model(&self) -> &str {
        "rule-model"
    }
}

/// Never answers
struct StalledProvider;

#[async_trait]
impl LlmProvider for StalledProvider {
    async fn send_message(&self, _request: &ProviderRequest) -> anyhow::Result<ProviderResponse> {
        std::future::pending().await
    }

    fn name(&self) -> &str {
        "stalled"
    }

    fn default_model(&self) -> &str {
        "stalled-model"
    }
}

fn is_evaluation(request: &ProviderRequest) -> bool {
    request
        .messages
        .first()
        .map(|m| m.content == EVALUATOR_SYSTEM)
        .unwrap_or(false)
}

/// Worker whose n-th answer is "draft n"
fn numbered_worker() -> Arc<RuleProvider> {
    RuleProvider::new(|_, call| Ok(format!("draft {call}")))
}

/// Evaluator that gives `verdict(evaluation_number)` and constant feedback otherwise
fn evaluator(verdict: impl Fn(u32) -> String + Send + Sync + 'static) -> Arc<RuleProvider> {
    let evaluations = AtomicU32::new(0);
    RuleProvider::new(move |request, _| {
        if is_evaluation(request) {
            let n = evaluations.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(verdict(n))
        } else {
            Ok("Be more specific.".to_string())
        }
    })
}

fn handle(provider: Arc<dyn LlmProvider>, temperature: f32) -> ModelHandle {
    ModelHandle::new(provider, ModelConfig::new("mistral", temperature))
}

fn quick_settings() -> WorkflowSettings {
    WorkflowSettings {
        retry_base_delay_ms: 0,
        ..WorkflowSettings::default()
    }
}

fn workflow(
    worker: Arc<dyn LlmProvider>,
    evaluator: Arc<dyn LlmProvider>,
    settings: WorkflowSettings,
) -> (Workflow, Arc<RecordingObserver>) {
    let observer = Arc::new(RecordingObserver::new());
    let workflow = Workflow::new(handle(worker, 0.6), handle(evaluator, 0.1))
        .with_settings(settings)
        .with_observer(observer.clone());
    (workflow, observer)
}

#[tokio::test]
async fn test_scenario_a_passes_first_time() {
    let worker = RuleProvider::new(|_, _| Ok("Hello.".to_string()));
    let evaluator = evaluator(|_| "Yes, this fully satisfies the prompt.".to_string());
    let (workflow, observer) = workflow(worker.clone(), evaluator, quick_settings());

    let outcome = workflow.run("Say hello.").await.unwrap();

    assert_eq!(
        outcome,
        Outcome::Passed {
            answer: "Hello.".to_string(),
            revisions: 0
        }
    );
    assert_eq!(
        observer.node_sequence(),
        vec![NodeKind::Draft, NodeKind::Evaluate]
    );
    assert_eq!(observer.count(NodeKind::Revise), 0);
    assert_eq!(worker.calls(), 1);
}

#[tokio::test]
async fn test_scenario_b_exhausts_revision_budget() {
    let worker = numbered_worker();
    let evaluator = evaluator(|_| "No.".to_string());
    let (workflow, observer) = workflow(worker.clone(), evaluator, quick_settings());

    let outcome = workflow.run("Write a haiku.").await.unwrap();

    assert_eq!(
        outcome,
        Outcome::Exhausted {
            answer: "draft 11".to_string(),
            revisions: 10
        }
    );
    assert_eq!(observer.count(NodeKind::Draft), 1);
    assert_eq!(observer.count(NodeKind::Critique), 10);
    assert_eq!(observer.count(NodeKind::Revise), 10);
    assert_eq!(observer.count(NodeKind::Evaluate), 11);
    assert_eq!(observer.node_sequence().last(), Some(&NodeKind::Evaluate));
    assert_eq!(worker.calls(), 11);
}

#[tokio::test]
async fn test_scenario_c_scale_score_below_four_triggers_critique() {
    let evaluator = evaluator(|n| {
        if n == 1 {
            "I'd rate this a 3.".to_string()
        } else {
            "5".to_string()
        }
    });
    let settings = WorkflowSettings {
        judge_mode: JudgeMode::Scale,
        ..quick_settings()
    };
    let (workflow, observer) = workflow(numbered_worker(), evaluator.clone(), settings);

    let outcome = workflow.run("Explain ownership.").await.unwrap();

    assert!(outcome.passed());
    assert_eq!(outcome.revisions(), 1);
    assert_eq!(outcome.answer(), "draft 2");
    assert_eq!(
        observer.node_sequence(),
        vec![
            NodeKind::Draft,
            NodeKind::Evaluate,
            NodeKind::Critique,
            NodeKind::Revise,
            NodeKind::Evaluate
        ]
    );

    let first_evaluation = &evaluator.requests()[0];
    assert!(first_evaluation.messages[1].content.contains("On a scale of 1 to 5"));
}

#[tokio::test]
async fn test_scenario_d_recovers_on_third_attempt() {
    let worker = RuleProvider::new(|_, call| {
        if call < 3 {
            anyhow::bail!("upstream unavailable (call {call})")
        }
        Ok("Recovered.".to_string())
    });
    let evaluator = evaluator(|_| "yes".to_string());
    let (workflow, observer) = workflow(worker.clone(), evaluator, quick_settings());

    let outcome = workflow.run("Say something.").await.unwrap();

    assert_eq!(outcome.answer(), "Recovered.");
    let attempts = observer.attempts();
    assert_eq!(attempts.len(), 3);
    assert!(matches!(attempts[0].status, AttemptStatus::Failed { .. }));
    assert!(matches!(attempts[1].status, AttemptStatus::Failed { .. }));
    assert!(matches!(
        attempts[2].status,
        AttemptStatus::Completed {
            passed: true,
            revisions: 0
        }
    ));
    assert_eq!(
        attempts.iter().map(|a| a.attempt).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert_ne!(attempts[0].run_id, attempts[2].run_id);
    assert_eq!(worker.calls(), 3);
}

#[tokio::test]
async fn test_retries_exhausted_after_max_attempts() {
    let worker = RuleProvider::new(|_, _| anyhow::bail!("connection refused"));
    let evaluator = evaluator(|_| "yes".to_string());
    let (workflow, observer) = workflow(worker.clone(), evaluator.clone(), quick_settings());

    let err = workflow.run("Say hello.").await.unwrap_err();

    match &err {
        WorkflowError::RetriesExhausted {
            attempts,
            last_error,
        } => {
            assert_eq!(*attempts, 3);
            assert!(matches!(
                **last_error,
                WorkflowError::ModelInvocation {
                    node: NodeKind::Draft,
                    ..
                }
            ));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.describe().ends_with("connection refused"));
    assert_eq!(worker.calls(), 3);
    assert_eq!(evaluator.calls(), 0);
    assert_eq!(observer.attempts().len(), 3);
}

#[tokio::test]
async fn test_each_attempt_starts_from_fresh_state() {
    // Evaluator fails on its first call only, after the first draft landed
    let evaluator = RuleProvider::new(|_, call| {
        if call == 1 {
            anyhow::bail!("timeout")
        }
        Ok("yes".to_string())
    });
    let worker = numbered_worker();
    let (workflow, _) = workflow(worker.clone(), evaluator, quick_settings());

    let outcome = workflow.run("Say hello.").await.unwrap();

    assert_eq!(outcome.answer(), "draft 2");
    let requests = worker.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].messages, requests[1].messages);
    assert_eq!(requests[1].messages.len(), 2);
}

#[tokio::test]
async fn test_step_limit_is_an_attempt_failure() {
    let evaluator = evaluator(|_| "No.".to_string());
    let settings = WorkflowSettings {
        step_limit: 4,
        max_retries: 1,
        ..quick_settings()
    };
    let (workflow, observer) = workflow(numbered_worker(), evaluator, settings);

    let err = workflow.run("Write a haiku.").await.unwrap_err();

    match err {
        WorkflowError::RetriesExhausted {
            attempts: 1,
            last_error,
        } => assert!(matches!(
            *last_error,
            WorkflowError::StepLimitExceeded { limit: 4 }
        )),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(observer.nodes().len(), 4);
}

#[tokio::test]
async fn test_strict_judge_rejects_free_text_verdict() {
    let evaluator = evaluator(|_| "It is mostly fine, I would say yes.".to_string());
    let settings = WorkflowSettings {
        judge_parsing: JudgeParsing::Strict,
        max_retries: 2,
        ..quick_settings()
    };
    let (workflow, observer) = workflow(numbered_worker(), evaluator, settings);

    let err = workflow.run("Say hello.").await.unwrap_err();

    match err {
        WorkflowError::RetriesExhausted {
            attempts: 2,
            last_error,
        } => assert!(matches!(
            *last_error,
            WorkflowError::UnparseableJudgment { .. }
        )),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(observer.count(NodeKind::Critique), 0);
}

#[tokio::test]
async fn test_lenient_judge_accepts_the_same_verdict() {
    let evaluator = evaluator(|_| "It is mostly fine, I would say yes.".to_string());
    let (workflow, _) = workflow(numbered_worker(), evaluator, quick_settings());

    let outcome = workflow.run("Say hello.").await.unwrap();
    assert!(outcome.passed());
}

#[tokio::test]
async fn test_worker_history_grows_two_turns_per_revision() {
    let worker = numbered_worker();
    let evaluator = evaluator(|n| (if n <= 3 { "no" } else { "yes" }).to_string());
    let nodes = NodeRunner::new(
        handle(worker.clone(), 0.6),
        handle(evaluator, 0.1),
        Judge::default(),
    );

    let state = RevisionLoop::new(10, 100)
        .run_state(&nodes, "Describe a cat.")
        .await
        .unwrap();

    assert!(state.passed);
    assert_eq!(state.revision_count, 3);
    assert_eq!(state.worker_history.len(), 3 + 2 * 3);
    assert_eq!(state.worker_history.last_assistant(), Some(state.draft.as_str()));
    assert_eq!(state.final_answer.as_deref(), Some("draft 4"));
    assert_eq!(state.feedback, "Be more specific.");

    // Every revise call replays the whole worker history so far
    let sizes: Vec<usize> = worker.requests().iter().map(|r| r.messages.len()).collect();
    assert_eq!(sizes, vec![2, 4, 6, 8]);
    let last = worker.requests().pop().unwrap();
    assert_eq!(last.messages[0].role, Role::System);
    assert_eq!(last.messages.last(), Some(&Message::user("Be more specific.")));
}

#[tokio::test]
async fn test_revision_count_never_exceeds_budget() {
    for budget in [0, 1, 3] {
        let evaluator = evaluator(|_| "no".to_string());
        let settings = WorkflowSettings {
            max_revisions: budget,
            ..quick_settings()
        };
        let (workflow, observer) = workflow(numbered_worker(), evaluator, settings);

        let outcome = workflow.run("prompt").await.unwrap();

        assert!(!outcome.passed());
        assert_eq!(outcome.revisions(), budget);
        assert_eq!(observer.count(NodeKind::Revise), budget as usize);
        assert_eq!(observer.count(NodeKind::Evaluate), budget as usize + 1);
    }
}

#[tokio::test]
async fn test_evaluate_and_critique_use_evaluator_model() {
    let worker = numbered_worker();
    let evaluator = evaluator(|n| (if n == 1 { "no" } else { "yes" }).to_string());
    let observer = Arc::new(RecordingObserver::new());
    let workflow = Workflow::new(
        ModelHandle::new(worker.clone(), ModelConfig::new("writer", 0.6)),
        ModelHandle::new(evaluator.clone(), ModelConfig::new("judge", 0.1)),
    )
    .with_observer(observer);

    workflow.run("prompt").await.unwrap();

    assert!(worker.requests().iter().all(|r| r.model == "writer"));
    assert!(worker.requests().iter().all(|r| r.temperature == Some(0.6)));
    assert!(evaluator.requests().iter().all(|r| r.model == "judge"));
    assert_eq!(evaluator.calls(), 3);
}

#[tokio::test]
async fn test_generate_content_returns_bare_answer() {
    let worker = RuleProvider::new(|_, _| Ok("Hello.".to_string()));
    let evaluator = evaluator(|_| "Yes".to_string());

    let answer = generate_content(
        "Say hello.",
        handle(worker, 0.6),
        handle(evaluator, 0.1),
        3,
    )
    .await
    .unwrap();

    assert_eq!(answer, "Hello.");
}

#[tokio::test]
async fn test_concurrent_runs_share_a_workflow() {
    let worker = RuleProvider::new(|request, _| {
        let prompt = request
            .messages
            .iter()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(format!("answer to {prompt}"))
    });
    let evaluator = evaluator(|_| "yes".to_string());
    let (workflow, _) = workflow(worker, evaluator, quick_settings());

    let (first, second) = tokio::join!(workflow.run("one"), workflow.run("two"));

    assert_eq!(first.unwrap().answer(), "answer to one");
    assert_eq!(second.unwrap().answer(), "answer to two");
}

#[tokio::test(start_paused = true)]
async fn test_call_timeout_counts_as_attempt_failure() {
    let settings = WorkflowSettings {
        call_timeout_secs: 5,
        max_retries: 2,
        ..quick_settings()
    };
    let (workflow, observer) = workflow(
        Arc::new(StalledProvider),
        Arc::new(StalledProvider),
        settings,
    );

    let err = workflow.run("prompt").await.unwrap_err();

    match err {
        WorkflowError::RetriesExhausted {
            attempts: 2,
            last_error,
        } => assert!(matches!(
            *last_error,
            WorkflowError::Timeout {
                node: NodeKind::Draft,
                ..
            }
        )),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(observer.attempts().len(), 2);
}

#[tokio::test]
async fn test_cancellation_stops_the_run() {
    let cancel = CancellationToken::new();
    let (workflow, observer) = workflow(
        Arc::new(StalledProvider),
        Arc::new(StalledProvider),
        quick_settings(),
    );
    let workflow = workflow.with_cancellation(cancel.clone());

    let run = tokio::spawn(async move { workflow.run("prompt").await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    cancel.cancel();

    let err = run.await.unwrap().unwrap_err();
    assert!(matches!(err, WorkflowError::Cancelled));
    assert_eq!(observer.attempts().len(), 1);
}

#[test]
fn test_config_rejects_revision_budget_beyond_step_limit() {
    let mut config = redraft::config::Config::default();
    config.workflow.max_revisions = 40;

    let err = config.validate().unwrap_err();
    assert!(format!("{err:#}").contains("step_limit"));

    config.workflow.step_limit = 122;
    assert!(config.validate().is_ok());
}

#[tokio::test]
async fn test_largest_budget_under_step_limit_ends_exhausted() {
    let settings = WorkflowSettings {
        max_revisions: 32,
        ..quick_settings()
    };
    assert!(settings.validate().is_ok());
    let worker = numbered_worker();
    let evaluator = evaluator(|_| "No.".to_string());
    let (workflow, observer) = workflow(worker.clone(), evaluator, settings);

    let outcome = workflow.run("Write a haiku.").await.unwrap();

    assert_eq!(
        outcome,
        Outcome::Exhausted {
            answer: "draft 33".to_string(),
            revisions: 32
        }
    );
    assert_eq!(observer.nodes().len(), 98);
    assert_eq!(observer.attempts().len(), 1);
    assert_eq!(worker.calls(), 33);
}
