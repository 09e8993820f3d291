//! Google Gemini `generateContent` client.

use super::stream::sse_data_events;
use super::{
    send_request, ChatMessage, CompletionOptions, CompletionResponse, CompletionStream,
    MessageRole, ModelProviderClient, ProviderFactory, TokenUsage,
};
use crate::error::ApiError;
use async_trait::async_trait;
use futures::{future, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiClient {
    client: Client,
    model: String,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(client: Client, model: String, api_key: String, base_url: Option<String>) -> Self {
        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        Self {
            client,
            model,
            api_key,
            base_url,
            timeout: ProviderFactory::DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Bound on a plain call, and on the wait for a stream's first response.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn send(
        &self,
        url: &str,
        request: &GenerateContentRequest,
        stream: bool,
    ) -> Result<reqwest::Response, ApiError> {
        let builder = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(request);
        send_request(builder, self.timeout, stream).await
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
    model_version: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Content,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

impl GenerateContentResponse {
    fn rejection(&self) -> Option<ApiError> {
        self.prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_ref())
            .map(|reason| ApiError::PromptRejected(format!("Prompt blocked: {}", reason)))
            .or_else(|| {
                self.candidates
                    .first()
                    .and_then(|c| c.finish_reason.as_deref())
                    .filter(|reason| {
                        matches!(*reason, "SAFETY" | "PROHIBITED_CONTENT" | "BLOCKLIST")
                    })
                    .map(|reason| ApiError::PromptRejected(format!("Output blocked: {}", reason)))
            })
    }

    fn text(&self) -> String {
        self.candidates
            .first()
            .map(|c| c.content.parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default()
    }
}

fn build_request(messages: Vec<ChatMessage>, options: CompletionOptions) -> GenerateContentRequest {
    let mut system = Vec::new();
    let mut contents = Vec::new();
    for message in messages {
        match message.role {
            MessageRole::System => system.push(Part {
                text: message.content,
            }),
            MessageRole::User | MessageRole::Assistant => contents.push(Content {
                role: Some(
                    if message.role == MessageRole::User {
                        "user"
                    } else {
                        "model"
                    }
                    .to_string(),
                ),
                parts: vec![Part {
                    text: message.content,
                }],
            }),
        }
    }
    GenerateContentRequest {
        contents,
        system_instruction: (!system.is_empty()).then(|| Content {
            role: None,
            parts: system,
        }),
        generation_config: GenerationConfig {
            temperature: options.temperature,
            max_output_tokens: options.max_tokens,
            top_p: options.top_p,
            stop_sequences: options.stop,
        },
    }
}

fn parse_stream_event(data: &str) -> Result<Option<String>, ApiError> {
    let response: GenerateContentResponse = serde_json::from_str(data).map_err(|e| {
        ApiError::ProviderStreamInterrupted(format!("Unreadable stream chunk: {}", e))
    })?;
    if let Some(err) = response.rejection() {
        return Err(err);
    }
    let text = response.text();
    Ok((!text.is_empty()).then_some(text))
}

#[async_trait]
impl ModelProviderClient for GeminiClient {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, ApiError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let response = self
            .send(&url, &build_request(messages, options), false)
            .await?;

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ApiError::ProviderError(format!("Failed to parse response: {}", e)))?;
        if let Some(err) = body.rejection() {
            return Err(err);
        }
        if body.candidates.is_empty() {
            return Err(ApiError::ProviderError("No candidates in response".to_string()));
        }

        let usage = body.usage_metadata.as_ref().map_or_else(TokenUsage::default, |u| TokenUsage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count,
            total_tokens: u.total_token_count,
        });
        Ok(CompletionResponse {
            content: body.text(),
            model: body.model_version.clone().unwrap_or_else(|| self.model.clone()),
            usage,
            finish_reason: body.candidates.first().and_then(|c| c.finish_reason.clone()),
        })
    }

    async fn stream(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionStream, ApiError> {
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        );
        let response = self
            .send(&url, &build_request(messages, options), true)
            .await?;

        let events = sse_data_events(Box::pin(response.bytes_stream()), self.timeout);
        let texts = events.filter_map(|event| {
            future::ready(match event {
                Ok(data) => parse_stream_event(&data).transpose(),
                Err(e) => Some(Err(e)),
            })
        });
        Ok(Box::pin(texts))
    }

    fn provider_name(&self) -> &str {
        "gemini"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
