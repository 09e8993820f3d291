//! Edit orchestrator: rewrites a finished document into a new one.
//!
//! The source document is never touched. The edit runs as its own job with a
//! fixed single-section plan, so planning is skipped and the rewrite call goes
//! through the same section writer, retry policy and checkpoints.

use super::runtime::{JobContext, JobRuntime};
use super::section::{SectionCall, SectionWriter};
use super::sink::JobHandle;
use crate::drafting::RewriteRequest;
use crate::error::ApiError;
use crate::job::{Document, Job, JobId, JobKind, JobStage, OutputEvent, PlanResult};
use tracing::{info_span, warn, Instrument};

/// Heading of the one section an edit job writes.
pub const EDIT_SECTION_HEADING: &str = "Edited document";

pub const MAX_SUGGESTIONS: usize = 5;

pub const FALLBACK_SUGGESTIONS: [&str; 3] = [
    "Add termination clause",
    "Clarify payment terms",
    "Include dispute resolution",
];

#[derive(Clone)]
pub struct EditOrchestrator {
    runtime: JobRuntime,
}

impl EditOrchestrator {
    pub fn new(runtime: JobRuntime) -> Self {
        Self { runtime }
    }

    /// Start an edit job. The finished document gets the new job's id and
    /// records `source.id` as its origin.
    pub async fn start(&self, source: &Document, instruction: &str) -> Result<JobHandle, ApiError> {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(ApiError::InvalidRequest(
                "Edit instruction cannot be empty".to_string(),
            ));
        }
        if source.content.trim().is_empty() {
            return Err(ApiError::InvalidRequest(
                "Document to edit has no content".to_string(),
            ));
        }

        let mut job = Job::new(JobKind::Edit, instruction).with_source(source.id);
        job.set_plan(PlanResult::new(
            source.title.clone(),
            vec![EDIT_SECTION_HEADING.to_string()],
        ))?;
        let request = RewriteRequest {
            title: source.title.clone(),
            content: source.content.clone(),
            instruction: instruction.to_string(),
        };

        let (ctx, handle) = self.runtime.open(&job).await?;
        let runtime = self.runtime.clone();
        let span = info_span!("edit", job_id = %job.id, source_id = %source.id);
        tokio::spawn(
            async move {
                let outcome = rewrite(&runtime, &ctx, &mut job, request).await;
                runtime.finish(ctx, &mut job, outcome).await;
            }
            .instrument(span),
        );
        Ok(handle)
    }

    pub async fn cancel(&self, job_id: &JobId) -> bool {
        self.runtime.registry().cancel(job_id).await
    }

    /// Short edit instructions for `document`. Never fails: model trouble
    /// yields a fixed set of common suggestions.
    pub async fn suggest_edits(&self, document: &Document) -> Vec<String> {
        let suggestions = match self.runtime.model().suggest_edits(document).await {
            Ok(suggestions) => suggestions
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .take(MAX_SUGGESTIONS)
                .collect(),
            Err(err) => {
                warn!(error = %err, "Edit suggestions unavailable, using defaults");
                Vec::new()
            }
        };
        if suggestions.is_empty() {
            FALLBACK_SUGGESTIONS.iter().map(|s| s.to_string()).collect()
        } else {
            suggestions
        }
    }
}

async fn rewrite(
    runtime: &JobRuntime,
    ctx: &JobContext,
    job: &mut Job,
    request: RewriteRequest,
) -> Result<Document, ApiError> {
    ctx.checkpoint()?;
    job.transition(JobStage::Writing(0))?;
    ctx.emit(OutputEvent::SectionStarted {
        index: 0,
        heading: EDIT_SECTION_HEADING.to_string(),
    })
    .await?;
    SectionWriter::new(runtime, ctx)
        .write(job, 0, &SectionCall::Rewrite(request))
        .await?;
    ctx.emit(OutputEvent::SectionBoundary { index: 0 }).await?;
    Ok(job.to_document())
}
