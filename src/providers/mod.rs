// Model provider support
//
// This module is the seam between the revision workflow and the language
// models behind it. Every backend (Ollama, OpenAI-compatible APIs, Claude)
// implements `LlmProvider`, and the workflow only ever sees that trait.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub mod types;

// Provider implementations
pub mod claude;
pub mod openai;

// Provider factory
pub mod factory;

pub use claude::ClaudeProvider;
pub use factory::{create_model_handle, create_provider};
pub use openai::OpenAIProvider;
pub use types::{Message, ProviderRequest, ProviderResponse, Role};

/// Trait for model providers
///
/// Implementations must tolerate concurrent, independent calls: one provider
/// instance is shared by every run in flight.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a message and get a complete response
    async fn send_message(&self, request: &ProviderRequest) -> Result<ProviderResponse>;

    /// Get the provider name (e.g., "ollama", "openai", "claude")
    fn name(&self) -> &str;

    /// Get the default model for this provider
    fn default_model(&self) -> &str;
}

/// Sampling settings for one model role
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    /// Model name (empty = provider default)
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ModelConfig {
    pub fn new(model: impl Into<String>, temperature: f32) -> Self {
        Self {
            model: model.into(),
            temperature,
            max_tokens: crate::config::constants::DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// A provider paired with the sampling settings it should be called with.
///
/// The workflow holds two of these: one for the worker (generation) role and
/// one for the evaluator (judgment and critique) role. They may share the same
/// underlying provider.
#[derive(Clone)]
pub struct ModelHandle {
    provider: Arc<dyn LlmProvider>,
    config: ModelConfig,
}

impl ModelHandle {
    pub fn new(provider: Arc<dyn LlmProvider>, config: ModelConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Build the request this handle would send for `messages`.
    pub fn request(&self, messages: Vec<Message>, system: Option<&str>) -> ProviderRequest {
        let mut request = ProviderRequest::new(messages)
            .with_model(self.config.model.clone())
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);
        if let Some(system) = system {
            request = request.with_system(system);
        }
        request
    }

    /// Send a prepared request and return the completion text.
    pub async fn send(&self, request: &ProviderRequest) -> Result<String> {
        let response = self.provider.send_message(request).await?;
        tracing::debug!(
            provider = %response.provider,
            model = %response.model,
            chars = response.text.chars().count(),
            "Model responded"
        );
        Ok(response.text)
    }

    /// Invoke the model with a message sequence and optional extra system
    /// instruction, returning the completion text.
    ///
    /// Standalone entry point for library callers. The workflow nodes call
    /// [`request`](Self::request) and [`send`](Self::send) separately so the
    /// request size can be reported to observers.
    pub async fn invoke(&self, messages: Vec<Message>, system: Option<&str>) -> Result<String> {
        let request = self.request(messages, system);
        self.send(&request).await
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("provider", &self.provider.name())
            .field("config", &self.config)
            .finish()
    }
}
