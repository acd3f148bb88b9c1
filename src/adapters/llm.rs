use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use rig::{
    OneOrMany,
    client::CompletionClient as _,
    completion::{CompletionModel, Usage, message::AssistantContent},
    providers::{anthropic, gemini, openai, xai},
};

use crate::cli::LlmProvider;
use crate::core::error::Error as CoreError;
use crate::core::{
    Completion, CompletionRequest, ContentSegment, TokenUsage, ports::CompletionClient,
};

/// Concrete [`CompletionClient`] backed by `rig` provider clients.
#[derive(Clone)]
pub struct RigCompletionClient {
    inner: Arc<RigCompletionClientInner>,
}

struct RigCompletionClientInner {
    provider: LlmProvider,
    api_key: String,
    http_client: reqwest::Client,
}

impl RigCompletionClient {
    pub fn new(provider: LlmProvider, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(anyhow!("API key may not be empty"));
        }

        let http_client = build_http_client()?;
        Ok(Self {
            inner: Arc::new(RigCompletionClientInner {
                provider,
                api_key,
                http_client,
            }),
        })
    }

    pub fn provider(&self) -> LlmProvider {
        self.inner.provider
    }
}

impl std::fmt::Debug for RigCompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RigCompletionClient")
            .field("provider", &self.inner.provider)
            .finish()
    }
}

#[async_trait]
impl CompletionClient for RigCompletionClient {
    async fn complete(&self, request: &CompletionRequest) -> crate::core::Result<Completion> {
        self.complete_once(request)
            .await
            .map_err(|err| CoreError::LlmProvider {
                provider: self.inner.provider.as_str().to_string(),
                details: format!("{err:#}"),
            })
    }
}

impl RigCompletionClient {
    async fn complete_once(&self, request: &CompletionRequest) -> Result<Completion> {
        let inner = &self.inner;
        match inner.provider {
            LlmProvider::Anthropic => {
                let client: anthropic::Client<reqwest::Client> =
                    anthropic::Client::<reqwest::Client>::builder()
                        .api_key(&inner.api_key)
                        .http_client(inner.http_client.clone())
                        .build()
                        .map_err(|err| anyhow!("Failed to create Anthropic client: {err}"))?;
                send(client.completion_model(&request.model), request).await
            }
            LlmProvider::Openai => {
                let client: openai::Client<reqwest::Client> =
                    openai::Client::<reqwest::Client>::builder()
                        .api_key(&inner.api_key)
                        .http_client(inner.http_client.clone())
                        .build()
                        .map_err(|err| anyhow!("Failed to create OpenAI client: {err}"))?;
                send(client.completion_model(&request.model), request).await
            }
            LlmProvider::Gemini => {
                let client: gemini::Client<reqwest::Client> =
                    gemini::Client::<reqwest::Client>::builder()
                        .api_key(&inner.api_key)
                        .http_client(inner.http_client.clone())
                        .build()
                        .map_err(|err| anyhow!("Failed to create Gemini client: {err}"))?;
                send(client.completion_model(&request.model), request).await
            }
            LlmProvider::Grok => {
                let client: xai::Client<reqwest::Client> =
                    xai::Client::<reqwest::Client>::builder()
                        .api_key(&inner.api_key)
                        .http_client(inner.http_client.clone())
                        .build()
                        .map_err(|err| anyhow!("Failed to create xAI client: {err}"))?;
                send(client.completion_model(&request.model), request).await
            }
        }
    }
}

/// Sends the prompt as a single user message and keeps content order and usage.
async fn send<M: CompletionModel>(model: M, request: &CompletionRequest) -> Result<Completion> {
    let response = model
        .completion_request(request.prompt.clone())
        .max_tokens(request.max_tokens)
        .temperature(request.temperature)
        .send()
        .await
        .map_err(|err| anyhow!("Completion request failed: {err}"))?;

    Ok(to_completion(response.choice, response.usage))
}

/// Keeps every segment in provider order; only text carries its payload.
fn to_completion(choice: OneOrMany<AssistantContent>, usage: Usage) -> Completion {
    let content = choice
        .into_iter()
        .map(|segment| match segment {
            AssistantContent::Text(text) => ContentSegment::Text(text.text),
            _ => ContentSegment::Other,
        })
        .collect();

    Completion {
        content,
        usage: TokenUsage {
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
        },
    }
}

fn build_http_client() -> Result<reqwest::Client> {
    // `reqwest::Client::default()` consults OS-level proxy settings, which can panic in
    // sandboxed environments on macOS. Opt back in with `CONTEXTSWEEP_ENABLE_SYSTEM_PROXY=1`.
    let mut builder = reqwest::Client::builder();
    if std::env::var_os("CONTEXTSWEEP_ENABLE_SYSTEM_PROXY").is_none() {
        builder = builder.no_proxy();
    }
    builder
        .build()
        .map_err(|err| anyhow!("Failed to build HTTP client: {err}"))
}
