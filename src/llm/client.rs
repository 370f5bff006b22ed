use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use async_openai::config::OpenAIConfig;

use super::backend::CompletionBackend;
use super::error::CompletionError;
use super::response::{list_models, request_single_text_response};
use super::secrets::{API_KEY_ENV, KeySource, KeyStore, prompt_for_api_key, resolve_api_key};
use crate::config::TutorConfig;

/// Completion backend speaking the OpenAI Responses API to any compatible
/// endpoint. Every call is a single HTTP request; retrying is left to the
/// caller.
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    http: reqwest::Client,
    openai_config: OpenAIConfig,
    model: String,
    request_timeout: Duration,
}

impl OpenAiBackend {
    pub fn new(api_key: &str, config: &TutorConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            openai_config: openai_config(api_key, config),
            model: config.model.clone(),
            request_timeout: config.request_timeout,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Lists the endpoint's models once to check the key is accepted.
    pub async fn healthcheck(&self) -> Result<(), CompletionError> {
        let request = list_models(&self.http, &self.openai_config);
        match tokio::time::timeout(self.request_timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(CompletionError::Timeout(self.request_timeout)),
        }
    }
}

impl CompletionBackend for OpenAiBackend {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let request =
            request_single_text_response(&self.http, &self.openai_config, &self.model, prompt);
        match tokio::time::timeout(self.request_timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(CompletionError::Timeout(self.request_timeout)),
        }
    }
}

/// Builds a backend from the configured key, asking for one (and storing it)
/// when none is set.
pub fn ensure_backend(config: &TutorConfig) -> Result<OpenAiBackend> {
    let store = KeyStore::open()?;
    let key = match resolve_api_key(config, &store)? {
        Some(resolved) => resolved.key,
        None => {
            let api_key = prompt_for_api_key(config.endpoint())?;
            if api_key.is_empty() {
                bail!(
                    "No API key provided. Set {} or run `syntax-tutor llm --set <KEY>`.",
                    API_KEY_ENV
                );
            }
            store.set(config.endpoint(), &api_key)?;
            api_key
        }
    };

    tracing::debug!(model = %config.model, endpoint = config.endpoint(), "LLM client initialized");
    Ok(OpenAiBackend::new(&key, config))
}

pub async fn test_configured_api_key(config: &TutorConfig) -> Result<KeySource> {
    let store = KeyStore::open()?;
    let Some(resolved) = resolve_api_key(config, &store)? else {
        return Err(anyhow!(
            "No API key configured for {}. Set {} or run `syntax-tutor llm --set <KEY>`.",
            config.endpoint(),
            API_KEY_ENV
        ));
    };
    let backend = OpenAiBackend::new(&resolved.key, config);
    backend
        .healthcheck()
        .await
        .context("Failed to validate API key with the LLM endpoint")?;
    Ok(resolved.source)
}

fn openai_config(api_key: &str, config: &TutorConfig) -> OpenAIConfig {
    OpenAIConfig::new()
        .with_api_key(api_key)
        .with_api_base(config.endpoint())
}
