// Provider factory - creates providers from configuration

use anyhow::Result;
use std::sync::Arc;

use super::{ClaudeProvider, LlmProvider, ModelHandle, OpenAIProvider};
use crate::config::{ModelEntry, ProviderEntry};

/// Create a provider from a single config entry
pub fn create_provider(entry: &ModelEntry) -> Result<Arc<dyn LlmProvider>> {
    let timeout = entry.request_timeout();

    let provider: Arc<dyn LlmProvider> = match &entry.provider {
        ProviderEntry::Ollama { base_url } => {
            let mut provider = OpenAIProvider::new_ollama()?;
            if let Some(url) = base_url {
                provider = provider.with_base_url(url.clone());
            }
            Arc::new(provider.with_model(entry.model.clone()).with_timeout(timeout)?)
        }
        ProviderEntry::Openai { api_key, base_url } => {
            let mut provider = OpenAIProvider::new_openai(api_key.clone())?;
            if let Some(url) = base_url {
                provider = provider.with_base_url(url.clone());
            }
            Arc::new(provider.with_model(entry.model.clone()).with_timeout(timeout)?)
        }
        ProviderEntry::Mistral { api_key, base_url } => {
            let mut provider = OpenAIProvider::new_mistral(api_key.clone())?;
            if let Some(url) = base_url {
                provider = provider.with_base_url(url.clone());
            }
            Arc::new(provider.with_model(entry.model.clone()).with_timeout(timeout)?)
        }
        ProviderEntry::Groq { api_key } => Arc::new(
            OpenAIProvider::new_groq(api_key.clone())?
                .with_model(entry.model.clone())
                .with_timeout(timeout)?,
        ),
        ProviderEntry::Claude { api_key, base_url } => {
            let mut provider = ClaudeProvider::new(api_key.clone())?;
            if let Some(url) = base_url {
                provider = provider.with_base_url(url.clone());
            }
            Arc::new(provider.with_model(entry.model.clone()).with_timeout(timeout)?)
        }
    };

    tracing::debug!(
        provider = provider.name(),
        model = %entry.model,
        "Created provider"
    );

    Ok(provider)
}

/// Create a provider and pair it with the entry's sampling settings
pub fn create_model_handle(entry: &ModelEntry) -> Result<ModelHandle> {
    Ok(ModelHandle::new(create_provider(entry)?, entry.model_config()))
}
