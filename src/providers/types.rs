// Unified request/response types for model providers
//
// These types abstract over provider-specific formats (OpenAI-compatible chat
// completions, Anthropic messages) so the workflow can talk to any of them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Who authored a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single role-tagged conversation turn. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Unified request format for all providers
///
/// Each provider transforms this into its own wire format.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderRequest {
    /// Conversation messages, oldest first
    pub messages: Vec<Message>,

    /// Model name (empty = provider default)
    pub model: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Extra system instruction for this call only (sent as a leading
    /// `system` message for OpenAI-compatible providers, merged into the
    /// top-level `system` field for Claude)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl ProviderRequest {
    /// Create a new request from messages
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            model: String::new(),
            max_tokens: 4096,
            system: None,
            temperature: None,
        }
    }

    /// Set the model name
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the per-call system instruction
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Total characters across the system instruction and all messages.
    ///
    /// Used as the "input size" reported to workflow observers.
    pub fn input_chars(&self) -> usize {
        let system = self
            .system
            .as_deref()
            .map(|s| s.chars().count())
            .unwrap_or(0);
        system
            + self
                .messages
                .iter()
                .map(|m| m.content.chars().count())
                .sum::<usize>()
    }
}

/// Unified response format for all providers
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    /// Response id as reported by the provider
    pub id: String,

    /// Model that actually produced the response
    pub model: String,

    /// Concatenated text of the completion
    pub text: String,

    /// Why generation stopped, if reported
    pub stop_reason: Option<String>,

    /// Which provider produced this response (e.g. "ollama", "claude")
    pub provider: String,
}
