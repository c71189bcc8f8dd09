// Provider entry: which backend serves a model role

use serde::{Deserialize, Serialize};

/// A single provider entry, serialized with a `type` tag, e.g.:
/// ```toml
/// [worker.provider]
/// type = "ollama"
/// base_url = "http://localhost:11434"
///
/// [evaluator.provider]
/// type = "claude"
/// api_key = "sk-ant-..."
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderEntry {
    Ollama {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        base_url: Option<String>,
    },
    Openai {
        api_key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        base_url: Option<String>,
    },
    Mistral {
        api_key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        base_url: Option<String>,
    },
    Groq {
        api_key: String,
    },
    Claude {
        api_key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        base_url: Option<String>,
    },
}

impl Default for ProviderEntry {
    fn default() -> Self {
        Self::Ollama { base_url: None }
    }
}

impl ProviderEntry {
    /// Short provider-type tag (e.g. "ollama", "claude").
    pub fn provider_type(&self) -> &'static str {
        match self {
            Self::Ollama { .. } => "ollama",
            Self::Openai { .. } => "openai",
            Self::Mistral { .. } => "mistral",
            Self::Groq { .. } => "groq",
            Self::Claude { .. } => "claude",
        }
    }

    /// API key, for the providers that take one.
    pub fn api_key(&self) -> Option<&str> {
        match self {
            Self::Ollama { .. } => None,
            Self::Openai { api_key, .. }
            | Self::Mistral { api_key, .. }
            | Self::Groq { api_key }
            | Self::Claude { api_key, .. } => Some(api_key),
        }
    }
}
