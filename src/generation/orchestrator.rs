//! Generation orchestrator: plan once, then write each planned section in order.

use super::runtime::{JobContext, JobRuntime};
use super::section::{SectionCall, SectionWriter};
use super::sink::JobHandle;
use crate::drafting::SectionRequest;
use crate::error::ApiError;
use crate::job::{Document, Job, JobId, JobKind, JobStage, OutputEvent};
use tracing::{debug, info_span, Instrument};

#[derive(Clone)]
pub struct GenerationOrchestrator {
    runtime: JobRuntime,
}

impl GenerationOrchestrator {
    pub fn new(runtime: JobRuntime) -> Self {
        Self { runtime }
    }

    /// Start a job for `prompt`. The returned handle already holds `JobStarted`.
    pub async fn start(&self, prompt: &str) -> Result<JobHandle, ApiError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ApiError::InvalidRequest("Prompt cannot be empty".to_string()));
        }

        let mut job = Job::new(JobKind::Generation, prompt);
        let (ctx, handle) = self.runtime.open(&job).await?;
        let runtime = self.runtime.clone();
        let span = info_span!("generation", job_id = %job.id);
        tokio::spawn(
            async move {
                let outcome = generate(&runtime, &ctx, &mut job).await;
                runtime.finish(ctx, &mut job, outcome).await;
            }
            .instrument(span),
        );
        Ok(handle)
    }

    /// Request cooperative cancellation. `false` when the job is unknown or finished.
    pub async fn cancel(&self, job_id: &JobId) -> bool {
        self.runtime.registry().cancel(job_id).await
    }
}

async fn generate(
    runtime: &JobRuntime,
    ctx: &JobContext,
    job: &mut Job,
) -> Result<Document, ApiError> {
    ctx.checkpoint()?;
    let model = runtime.model();
    let prompt = job.input.clone();
    let plan = runtime
        .retry()
        .run("plan", ctx.token(), |attempt| {
            let prompt = &prompt;
            async move {
                ctx.checkpoint()?;
                debug!(attempt, "Planning document");
                model.plan(prompt).await
            }
        })
        .await?;
    job.set_plan(plan.clone())?;

    ctx.checkpoint()?;
    ctx.emit(OutputEvent::Planned {
        title: plan.title.clone(),
        headings: plan.headings.clone(),
    })
    .await?;

    let writer = SectionWriter::new(runtime, ctx);
    for (index, heading) in plan.headings.iter().enumerate() {
        ctx.checkpoint()?;
        job.transition(JobStage::Writing(index))?;
        ctx.emit(OutputEvent::SectionStarted {
            index,
            heading: heading.clone(),
        })
        .await?;

        let call = SectionCall::Draft(SectionRequest {
            prompt: prompt.clone(),
            title: plan.title.clone(),
            headings: plan.headings.clone(),
            index,
            heading: heading.clone(),
            prior_summary: job.prior_summary(runtime.config().summary_chars),
        });
        writer.write(job, index, &call).await?;
        ctx.emit(OutputEvent::SectionBoundary { index }).await?;
    }

    Ok(job.to_document())
}
