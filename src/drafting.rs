//! Document Model
//!
//! The capability the pipeline drafts with: plan a document, stream one section,
//! stream a rewrite of a whole document, and propose edit instructions. The
//! provider-backed implementation turns these into LLM prompts; the scripted one
//! replays canned outcomes for tests.

use crate::error::ApiError;
use crate::job::{Document, PlanResult};
use crate::provider::CompletionStream;
use async_trait::async_trait;

pub mod prompts;
pub mod provider_model;
pub mod scripted;

pub use provider_model::ProviderDocumentModel;
pub use scripted::{ModelCall, ScriptedModel, SectionStep};

/// Everything a section prompt needs to stay consistent with the rest of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionRequest {
    pub prompt: String,
    pub title: String,
    pub headings: Vec<String>,
    pub index: usize,
    pub heading: String,
    pub prior_summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteRequest {
    pub title: String,
    pub content: String,
    pub instruction: String,
}

#[async_trait]
pub trait DocumentModel: Send + Sync {
    /// Title and ordered section headings for a prompt.
    async fn plan(&self, prompt: &str) -> Result<PlanResult, ApiError>;

    /// Raw text of one section. May fail before or during the stream.
    async fn write_section(&self, request: &SectionRequest) -> Result<CompletionStream, ApiError>;

    /// Raw text of the complete rewritten document.
    async fn rewrite(&self, request: &RewriteRequest) -> Result<CompletionStream, ApiError>;

    async fn suggest_edits(&self, document: &Document) -> Result<Vec<String>, ApiError>;
}
