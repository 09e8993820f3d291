//! Section writer: drives one retried model call for one section and relays its
//! output as chunk events, checking for cancellation before every piece.

use super::chunking::{LineChunker, Piece};
use super::runtime::{JobContext, JobRuntime};
use crate::drafting::{RewriteRequest, SectionRequest};
use crate::error::ApiError;
use crate::job::{Job, OutputEvent};
use crate::retry::RetryPolicy;
use futures::StreamExt;
use tracing::{debug, warn};

/// The model call that produces a section's text.
#[derive(Debug, Clone)]
pub enum SectionCall {
    Draft(SectionRequest),
    Rewrite(RewriteRequest),
}

pub struct SectionWriter<'a> {
    runtime: &'a JobRuntime,
    ctx: &'a JobContext,
}

impl<'a> SectionWriter<'a> {
    pub fn new(runtime: &'a JobRuntime, ctx: &'a JobContext) -> Self {
        Self { runtime, ctx }
    }

    /// Write section `index` of `job`. A retry re-issues the whole call; text
    /// already relayed from a failed attempt stays in the job and the stream.
    pub async fn write(
        &self,
        job: &mut Job,
        index: usize,
        call: &SectionCall,
    ) -> Result<(), ApiError> {
        self.ctx.checkpoint()?;
        job.begin_section(index)?;

        let policy = self.runtime.retry();
        let mut delays = policy.delays();
        let mut attempt = 1;
        loop {
            self.ctx.checkpoint()?;
            let err = match self.attempt(job, call).await {
                Ok(()) => {
                    job.complete_section();
                    debug!(job_id = %job.id, section = index, attempt, "Section written");
                    return Ok(());
                }
                Err(err) => err,
            };
            let Some(delay) = policy.backoff(&mut delays, &err) else {
                return Err(policy.exhausted(attempt, err));
            };
            warn!(
                job_id = %job.id,
                section = index,
                attempt,
                max_attempts = policy.max_attempts(),
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Retrying section"
            );
            RetryPolicy::wait(delay, self.ctx.token()).await?;
            attempt += 1;
        }
    }

    async fn attempt(&self, job: &mut Job, call: &SectionCall) -> Result<(), ApiError> {
        let model = self.runtime.model();
        let mut stream = match call {
            SectionCall::Draft(request) => model.write_section(request).await?,
            SectionCall::Rewrite(request) => model.rewrite(request).await?,
        };

        let mut chunker = LineChunker::new();
        while let Some(raw) = stream.next().await {
            for piece in chunker.push(&raw?) {
                self.ctx.checkpoint()?;
                match piece {
                    Piece::Text(text) => {
                        job.append_text(&text);
                        self.ctx.emit(OutputEvent::ContentChunk { text }).await?;
                    }
                    Piece::Break => {
                        job.append_text("\n");
                        self.ctx.emit(OutputEvent::LineBreak).await?;
                    }
                }
            }
        }
        Ok(())
    }
}
