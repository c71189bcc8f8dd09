// Project-wide constants
//
// Centralised here so defaults have one source of truth. Import via
// `use crate::config::constants::*;`.

/// Default Ollama endpoint (the daemon's own default port).
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Default model for both roles when nothing is configured.
pub const DEFAULT_MODEL: &str = "mistral";

/// Worker (generation) temperature. Warm enough to rewrite freely.
pub const DEFAULT_WORKER_TEMPERATURE: f32 = 0.6;

/// Evaluator (judge + critic) temperature. Near-deterministic.
pub const DEFAULT_EVALUATOR_TEMPERATURE: f32 = 0.1;

/// Default maximum tokens per model call.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// HTTP request timeout for provider clients.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Maximum Revise executions per run.
pub const DEFAULT_MAX_REVISIONS: u32 = 10;

/// Maximum node executions per run, independent of the revision count.
pub const DEFAULT_STEP_LIMIT: u32 = 100;

/// Attempts the retry wrapper makes before giving up.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Per model call timeout enforced by the workflow.
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 120;

/// Base delay between failed attempts (doubles each attempt; 0 disables).
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 1000;

/// Config file location relative to the home directory.
pub const CONFIG_RELATIVE_PATH: &str = ".redraft/config.toml";
