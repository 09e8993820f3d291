//! `DocumentModel` backed by an LLM provider client.

use super::prompts::{
    clean_title, outline_messages, parse_string_array, rewrite_messages, section_messages,
    suggestion_messages, title_messages, TITLE_SENTINEL,
};
use super::{DocumentModel, RewriteRequest, SectionRequest};
use crate::error::ApiError;
use crate::job::{Document, PlanResult};
use crate::provider::{
    CompletionOptions, CompletionStream, ModelProviderClient, ProviderConfig, ProviderFactory,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub struct ProviderDocumentModel {
    client: Arc<dyn ModelProviderClient>,
    options: CompletionOptions,
}

impl ProviderDocumentModel {
    pub fn new(client: Arc<dyn ModelProviderClient>, options: CompletionOptions) -> Self {
        Self { client, options }
    }

    /// Resolve credentials and build the HTTP client for a configured provider.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ApiError> {
        let provider = config.to_model_provider()?;
        let client =
            ProviderFactory::create_client_with_timeout(&provider, config.request_timeout())?;
        Ok(Self::new(client, config.default_options.clone()))
    }

    async fn title(&self, prompt: &str) -> Result<String, ApiError> {
        let response = self
            .client
            .complete(title_messages(prompt), self.options.clone())
            .await?;
        let title = clean_title(&response.content);
        if title.is_empty() || title.to_lowercase().contains(TITLE_SENTINEL) {
            return Err(ApiError::PromptRejected(
                "The request does not describe a contract".to_string(),
            ));
        }
        Ok(title)
    }
}

#[async_trait]
impl DocumentModel for ProviderDocumentModel {
    async fn plan(&self, prompt: &str) -> Result<PlanResult, ApiError> {
        let title = self.title(prompt).await?;
        let response = self
            .client
            .complete(outline_messages(prompt, &title), self.options.clone())
            .await?;
        let headings = parse_string_array(&response.content).map_err(ApiError::MalformedPlan)?;
        debug!(
            provider = self.client.provider_name(),
            sections = headings.len(),
            "Outline received"
        );
        let plan = PlanResult::new(title, headings);
        plan.validate()?;
        Ok(plan)
    }

    async fn write_section(&self, request: &SectionRequest) -> Result<CompletionStream, ApiError> {
        self.client
            .stream(section_messages(request), self.options.clone())
            .await
    }

    async fn rewrite(&self, request: &RewriteRequest) -> Result<CompletionStream, ApiError> {
        self.client
            .stream(rewrite_messages(request), self.options.clone())
            .await
    }

    async fn suggest_edits(&self, document: &Document) -> Result<Vec<String>, ApiError> {
        let response = self
            .client
            .complete(suggestion_messages(document), self.options.clone())
            .await?;
        parse_string_array(&response.content).map_err(ApiError::ProviderError)
    }
}
