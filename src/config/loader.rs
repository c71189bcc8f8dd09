// Configuration loader
// Loads settings from ~/.redraft/config.toml, then applies environment overrides

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::constants::CONFIG_RELATIVE_PATH;
use super::provider::ProviderEntry;
use super::settings::{Config, ModelEntry, WorkflowSettings};

/// Load configuration from the default config file (if present) and the
/// environment.
pub fn load_config() -> Result<Config> {
    load_config_from(None)
}

/// Load configuration from `path`, or from the default location when `None`.
///
/// An explicitly given path must exist. A missing default file simply means
/// "use built-in defaults".
pub fn load_config_from(path: Option<&Path>) -> Result<Config> {
    load_with(path, |key| std::env::var(key).ok())
}

fn load_with(path: Option<&Path>, env: impl Fn(&str) -> Option<String>) -> Result<Config> {
    let mut config = match path {
        Some(path) => {
            if !path.exists() {
                bail!("Configuration file not found: {}", path.display());
            }
            parse_config_file(path)?
        }
        None => match default_config_path() {
            Some(path) if path.exists() => parse_config_file(&path)?,
            _ => {
                tracing::debug!("No config file found, using defaults");
                Config::default()
            }
        },
    };

    apply_env_overrides(&mut config, env);

    config
        .validate()
        .context("Configuration validation failed")?;

    Ok(config)
}

fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_RELATIVE_PATH))
}

// Model tables accept partial entries; missing fields fall back to the
// role's own defaults (the worker and evaluator differ in temperature).
#[derive(Debug, Default, Deserialize)]
struct TomlModelEntry {
    provider: Option<ProviderEntry>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    request_timeout_secs: Option<u64>,
}

impl TomlModelEntry {
    fn merge_into(self, mut entry: ModelEntry) -> ModelEntry {
        if let Some(provider) = self.provider {
            entry.provider = provider;
        }
        if let Some(model) = self.model {
            entry.model = model;
        }
        if let Some(temperature) = self.temperature {
            entry.temperature = temperature;
        }
        if let Some(max_tokens) = self.max_tokens {
            entry.max_tokens = max_tokens;
        }
        if let Some(secs) = self.request_timeout_secs {
            entry.request_timeout_secs = secs;
        }
        entry
    }
}

#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    #[serde(default)]
    worker: Option<TomlModelEntry>,
    #[serde(default)]
    evaluator: Option<TomlModelEntry>,
    #[serde(default)]
    workflow: WorkflowSettings,
}

fn parse_config_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

fn parse_config_str(contents: &str) -> Result<Config> {
    let toml_config: TomlConfig = toml::from_str(contents)?;

    Ok(Config {
        worker: toml_config
            .worker
            .unwrap_or_default()
            .merge_into(ModelEntry::worker_default()),
        evaluator: toml_config
            .evaluator
            .unwrap_or_default()
            .merge_into(ModelEntry::evaluator_default()),
        workflow: toml_config.workflow,
    })
}

fn apply_env_overrides(config: &mut Config, env: impl Fn(&str) -> Option<String>) {
    if let Some(url) = env("OLLAMA_BASE_URL").filter(|v| !v.is_empty()) {
        for entry in [&mut config.worker, &mut config.evaluator] {
            if let ProviderEntry::Ollama { base_url } = &mut entry.provider {
                *base_url = Some(url.clone());
            }
        }
    }
    if let Some(model) = env("REDRAFT_WORKER_MODEL").filter(|v| !v.is_empty()) {
        config.worker.model = model;
    }
    if let Some(model) = env("REDRAFT_EVALUATOR_MODEL").filter(|v| !v.is_empty()) {
        config.evaluator.model = model;
    }
}
