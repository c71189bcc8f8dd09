// Configuration structs

use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::constants::*;
use super::provider::ProviderEntry;
use crate::providers::ModelConfig;
use crate::workflow::{JudgeMode, JudgeParsing};

/// One model role: which backend, which model, how to sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub provider: ProviderEntry,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// HTTP timeout for this provider's client
    pub request_timeout_secs: u64,
}

impl ModelEntry {
    fn with_temperature(temperature: f32) -> Self {
        Self {
            provider: ProviderEntry::default(),
            model: DEFAULT_MODEL.to_string(),
            temperature,
            max_tokens: DEFAULT_MAX_TOKENS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }

    /// Defaults for the generation role
    pub fn worker_default() -> Self {
        Self::with_temperature(DEFAULT_WORKER_TEMPERATURE)
    }

    /// Defaults for the judge/critic role
    pub fn evaluator_default() -> Self {
        Self::with_temperature(DEFAULT_EVALUATOR_TEMPERATURE)
    }

    pub fn model_config(&self) -> ModelConfig {
        ModelConfig::new(self.model.clone(), self.temperature).with_max_tokens(self.max_tokens)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn validate(&self, role: &str) -> anyhow::Result<()> {
        if self.model.trim().is_empty() {
            bail!("{role}.model must not be empty");
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            bail!(
                "{role}.temperature ({}) must be between 0.0 and 2.0",
                self.temperature
            );
        }
        if self.max_tokens == 0 {
            bail!("{role}.max_tokens must be greater than 0");
        }
        if self.request_timeout_secs == 0 {
            bail!("{role}.request_timeout_secs must be greater than 0");
        }
        if let Some(key) = self.provider.api_key() {
            if key.trim().is_empty() {
                bail!(
                    "{role}.provider: API key for '{}' is empty\n\n\
                     Set api_key in ~/{}",
                    self.provider.provider_type(),
                    CONFIG_RELATIVE_PATH
                );
            }
        }
        Ok(())
    }
}

/// Revision loop and retry behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowSettings {
    /// Maximum Revise executions per attempt
    pub max_revisions: u32,
    /// Maximum node executions per attempt (guards against a misbehaving predicate)
    pub step_limit: u32,
    /// Attempts before the run fails with `RetriesExhausted`
    pub max_retries: u32,
    /// Ask the evaluator for yes/no or for a 1-5 score
    pub judge_mode: JudgeMode,
    /// How the evaluator's answer is turned into pass/fail
    pub judge_parsing: JudgeParsing,
    /// Per model call timeout (0 disables)
    pub call_timeout_secs: u64,
    /// Backoff base between failed attempts (0 disables)
    pub retry_base_delay_ms: u64,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            max_revisions: DEFAULT_MAX_REVISIONS,
            step_limit: DEFAULT_STEP_LIMIT,
            max_retries: DEFAULT_MAX_RETRIES,
            judge_mode: JudgeMode::Binary,
            judge_parsing: JudgeParsing::Lenient,
            call_timeout_secs: DEFAULT_CALL_TIMEOUT_SECS,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
        }
    }
}

impl WorkflowSettings {
    pub fn call_timeout(&self) -> Option<Duration> {
        (self.call_timeout_secs > 0).then(|| Duration::from_secs(self.call_timeout_secs))
    }

    /// Node executions in an attempt that spends the whole revision budget:
    /// Draft and the first Evaluate, then Critique, Revise and Evaluate per round
    pub fn steps_for_full_run(&self) -> u64 {
        2 + 3 * u64::from(self.max_revisions)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    /// Validate configuration and return helpful errors
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_retries == 0 {
            bail!("workflow.max_retries must be at least 1");
        }
        if self.step_limit == 0 {
            bail!("workflow.step_limit must be greater than 0");
        }
        let needed = self.steps_for_full_run();
        if u64::from(self.step_limit) < needed {
            bail!(
                "workflow.step_limit ({}) is too small for max_revisions = {}: \
                 a run that uses every revision executes {} nodes",
                self.step_limit,
                self.max_revisions,
                needed
            );
        }
        Ok(())
    }
}

/// Full application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub worker: ModelEntry,
    pub evaluator: ModelEntry,
    pub workflow: WorkflowSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worker: ModelEntry::worker_default(),
            evaluator: ModelEntry::evaluator_default(),
            workflow: WorkflowSettings::default(),
        }
    }
}

impl Config {
    /// Validate configuration and return helpful errors
    pub fn validate(&self) -> anyhow::Result<()> {
        self.worker.validate("worker")?;
        self.evaluator.validate("evaluator")?;
        self.workflow.validate()
    }
}
