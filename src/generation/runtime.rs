//! Shared machinery for running one job as an independent task: token
//! registration, the event sink, cancellation checkpoints and terminal cleanup.

use super::sink::{event_channel, EventSink, JobHandle};
use crate::cancellation::CancellationRegistry;
use crate::drafting::DocumentModel;
use crate::error::{ApiError, ErrorClass};
use crate::job::{Document, Job, JobId, JobStage, OutputEvent};
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Job settings as they appear in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfig {
    /// Events buffered between a job and its caller.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// How long a job waits on a caller that stopped reading.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// Characters of each finished section passed on to later section prompts.
    #[serde(default = "default_summary_chars")]
    pub summary_chars: usize,
}

fn default_channel_capacity() -> usize {
    64
}

fn default_idle_timeout_secs() -> u64 {
    300
}

fn default_summary_chars() -> usize {
    400
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            idle_timeout_secs: default_idle_timeout_secs(),
            summary_chars: default_summary_chars(),
        }
    }
}

impl JobConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.channel_capacity == 0 {
            return Err("channel_capacity must be at least 1".to_string());
        }
        if self.idle_timeout_secs == 0 {
            return Err("idle_timeout_secs must be positive".to_string());
        }
        Ok(())
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

/// Per-job view of the runtime held by the task driving that job.
pub struct JobContext {
    job_id: JobId,
    token: CancellationToken,
    sink: EventSink,
}

impl JobContext {
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Cancellation checkpoint.
    pub fn checkpoint(&self) -> Result<(), ApiError> {
        if self.token.is_cancelled() {
            Err(ApiError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub async fn emit(&self, event: OutputEvent) -> Result<(), ApiError> {
        self.sink.emit(event).await
    }
}

#[derive(Clone)]
pub struct JobRuntime {
    model: Arc<dyn DocumentModel>,
    registry: Arc<dyn CancellationRegistry>,
    retry: RetryPolicy,
    config: JobConfig,
}

impl JobRuntime {
    pub fn new(
        model: Arc<dyn DocumentModel>,
        registry: Arc<dyn CancellationRegistry>,
        retry: RetryPolicy,
        config: JobConfig,
    ) -> Self {
        Self {
            model,
            registry,
            retry,
            config,
        }
    }

    pub fn model(&self) -> &Arc<dyn DocumentModel> {
        &self.model
    }

    pub fn registry(&self) -> &Arc<dyn CancellationRegistry> {
        &self.registry
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// Register the job's token and enqueue `JobStarted` ahead of any other event.
    pub async fn open(&self, job: &Job) -> Result<(JobContext, JobHandle), ApiError> {
        let token = self.registry.register(job.id).await;
        let (sink, handle) = event_channel(
            job.id,
            self.config.channel_capacity,
            self.config.idle_timeout(),
        );
        if let Err(err) = sink.try_emit(OutputEvent::JobStarted {
            job_id: job.id,
            kind: job.kind,
        }) {
            self.registry.release(&job.id).await;
            return Err(err);
        }
        info!(job_id = %job.id, kind = ?job.kind, "Job started");
        Ok((
            JobContext {
                job_id: job.id,
                token,
                sink,
            },
            handle,
        ))
    }

    /// Emit the one terminal event for `outcome` and release the job's token.
    pub async fn finish(
        &self,
        ctx: JobContext,
        job: &mut Job,
        outcome: Result<Document, ApiError>,
    ) {
        let (stage, event) = match outcome {
            Ok(document) => (JobStage::Completed, Some(OutputEvent::Completed { document })),
            Err(ApiError::CallerDisconnected) => (JobStage::Cancelled, None),
            Err(err) if err.class() == ErrorClass::Cancellation || ctx.is_cancelled() => {
                (JobStage::Cancelled, Some(OutputEvent::Cancelled))
            }
            Err(err) => {
                warn!(job_id = %job.id, error = %err, "Job failed");
                (
                    JobStage::Failed,
                    Some(OutputEvent::Failed {
                        reason: err.to_string(),
                    }),
                )
            }
        };

        if let Err(err) = job.transition(stage) {
            warn!(job_id = %job.id, error = %err, "Unexpected terminal transition");
        }
        match event {
            Some(event) => {
                if ctx.emit(event).await.is_err() {
                    debug!(job_id = %job.id, "Caller gone before the terminal event");
                }
            }
            None => info!(job_id = %job.id, "Caller disconnected, job abandoned"),
        }
        self.registry.release(&job.id).await;
        info!(
            job_id = %job.id,
            stage = ?job.stage(),
            sections = job.sections().len(),
            "Job finished"
        );
    }
}
