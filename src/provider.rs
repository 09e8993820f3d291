//! Model Provider Abstraction
//!
//! Unified interface over the LLM providers used for drafting (OpenAI-compatible
//! chat completions and Google Gemini). Every provider offers a batch completion
//! and a streaming completion; failures are mapped onto [`ApiError`] variants so
//! the retry policy can tell transient from final errors.

use crate::error::ApiError;
use async_trait::async_trait;
use futures::Stream;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

pub mod gemini;
pub mod openai;
pub mod profile;
mod stream;

pub use gemini::GeminiClient;
pub use openai::OpenAIClient;
pub use profile::{ProviderConfig, ProviderType};

/// Model provider selection with resolved credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ModelProvider {
    OpenAI {
        model: String,
        api_key: String,
        base_url: Option<String>, // OpenAI-compatible endpoints (Azure, local servers)
    },
    Gemini {
        model: String,
        api_key: String,
        base_url: Option<String>,
    },
}

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Completion options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,  // 0.0-2.0, default: 1.0
    pub max_tokens: Option<u32>,   // Maximum tokens to generate
    pub top_p: Option<f32>,        // Nucleus sampling
    pub stop: Option<Vec<String>>, // Stop sequences
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: Some(1.0),
            max_tokens: None,
            top_p: None,
            stop: None,
        }
    }
}

/// Token usage information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Completion response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    pub model: String,
    pub usage: TokenUsage,
    pub finish_reason: Option<String>,
}

/// Streaming completion type
pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<String, ApiError>> + Send>>;

/// Model provider client trait
#[async_trait]
pub trait ModelProviderClient: Send + Sync {
    /// Generate a completion from a list of messages
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, ApiError>;

    /// Generate a streaming completion
    async fn stream(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionStream, ApiError>;

    /// Get the provider name
    fn provider_name(&self) -> &str;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Map an HTTP status and body onto the error taxonomy.
pub(crate) fn map_status(status: u16, body: &str) -> ApiError {
    match status {
        400 => ApiError::PromptRejected(format!("Request rejected: {}", body)),
        401 | 403 => ApiError::ProviderAuthFailed(format!("Authentication failed: {}", body)),
        404 => ApiError::ProviderModelNotFound(format!("Model not found: {}", body)),
        408 => ApiError::ProviderTimeout(format!("Upstream timeout: {}", body)),
        429 => ApiError::ProviderRateLimit(format!("Rate limit exceeded: {}", body)),
        500..=599 => {
            ApiError::ProviderUnavailable(format!("Upstream status {}: {}", status, body))
        }
        _ => ApiError::ProviderError(format!("Request failed with status {}: {}", status, body)),
    }
}

// Helper function to map HTTP errors to ApiError
pub(crate) fn map_http_error(error: reqwest::Error) -> ApiError {
    if let Some(status) = error.status() {
        map_status(status.as_u16(), &error.to_string())
    } else if error.is_timeout() {
        ApiError::ProviderTimeout(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        ApiError::ProviderUnavailable(format!("Connection error: {}", error))
    } else if error.is_body() || error.is_decode() {
        ApiError::ProviderStreamInterrupted(format!("Response body error: {}", error))
    } else {
        ApiError::ProviderError(format!("HTTP error: {}", error))
    }
}

/// Send a provider request. A plain call is bounded end to end by `timeout`. A
/// streaming call is bounded only until its response headers arrive; the body
/// is then bounded per read by `sse_data_events`.
pub(crate) async fn send_request(
    request: RequestBuilder,
    timeout: Duration,
    stream: bool,
) -> Result<Response, ApiError> {
    let sent = if stream {
        tokio::time::timeout(timeout, request.send())
            .await
            .map_err(|_| {
                ApiError::ProviderTimeout(format!("No response within {}s", timeout.as_secs()))
            })?
    } else {
        request.timeout(timeout).send().await
    };
    let response = sent.map_err(map_http_error)?;

    if !response.status().is_success() {
        return Err(error_for_response(response).await);
    }
    Ok(response)
}

/// Turn a non-success response into an error, reading the body for context.
pub(crate) async fn error_for_response(response: reqwest::Response) -> ApiError {
    let status = response.status().as_u16();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    map_status(status, &error_text)
}

const PROVIDER_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

fn build_provider_http_client() -> Result<Client, ApiError> {
    Client::builder()
        .connect_timeout(PROVIDER_HTTP_CONNECT_TIMEOUT)
        .build()
        .map_err(|e| ApiError::ProviderError(format!("Failed to create HTTP client: {}", e)))
}

/// Builds provider clients from resolved provider selections.
pub struct ProviderFactory;

impl ProviderFactory {
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

    pub fn create_client(
        provider: &ModelProvider,
    ) -> Result<Arc<dyn ModelProviderClient>, ApiError> {
        Self::create_client_with_timeout(provider, Self::DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn create_client_with_timeout(
        provider: &ModelProvider,
        request_timeout: Duration,
    ) -> Result<Arc<dyn ModelProviderClient>, ApiError> {
        let http = build_provider_http_client()?;
        let client: Arc<dyn ModelProviderClient> = match provider {
            ModelProvider::OpenAI {
                model,
                api_key,
                base_url,
            } => Arc::new(
                OpenAIClient::new(http, model.clone(), api_key.clone(), base_url.clone())
                    .with_timeout(request_timeout),
            ),
            ModelProvider::Gemini {
                model,
                api_key,
                base_url,
            } => Arc::new(
                GeminiClient::new(http, model.clone(), api_key.clone(), base_url.clone())
                    .with_timeout(request_timeout),
            ),
        };
        Ok(client)
    }
}

/// Scripted in-memory provider for adapter tests.
#[cfg(test)]
pub struct MockProvider {
    completions: parking_lot::Mutex<std::collections::VecDeque<Result<String, ApiError>>>,
    streams: parking_lot::Mutex<std::collections::VecDeque<Result<Vec<String>, ApiError>>>,
    pub requests: parking_lot::Mutex<Vec<Vec<ChatMessage>>>,
}

#[cfg(test)]
impl MockProvider {
    pub fn new() -> Self {
        Self {
            completions: parking_lot::Mutex::new(Default::default()),
            streams: parking_lot::Mutex::new(Default::default()),
            requests: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub fn with_completion(self, outcome: Result<&str, ApiError>) -> Self {
        self.completions
            .lock()
            .push_back(outcome.map(str::to_string));
        self
    }

    pub fn with_stream(self, outcome: Result<Vec<&str>, ApiError>) -> Self {
        self.streams
            .lock()
            .push_back(outcome.map(|chunks| chunks.into_iter().map(str::to_string).collect()));
        self
    }
}

#[cfg(test)]
#[async_trait]
impl ModelProviderClient for MockProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        _options: CompletionOptions,
    ) -> Result<CompletionResponse, ApiError> {
        self.requests.lock().push(messages);
        let content = self
            .completions
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::ProviderError("No scripted completion".into())))?;
        Ok(CompletionResponse {
            content,
            model: "mock-model".to_string(),
            usage: TokenUsage::default(),
            finish_reason: Some("stop".to_string()),
        })
    }

    async fn stream(
        &self,
        messages: Vec<ChatMessage>,
        _options: CompletionOptions,
    ) -> Result<CompletionStream, ApiError> {
        self.requests.lock().push(messages);
        let chunks = self
            .streams
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::ProviderError("No scripted stream".into())))?;
        Ok(Box::pin(futures::stream::iter(chunks.into_iter().map(Ok))))
    }

    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}
