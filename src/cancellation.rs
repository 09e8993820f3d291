//! Cancellation registry: the one piece of state shared across jobs.
//!
//! Each live job owns a one-shot token keyed by its id. Any caller holding the
//! id may set it; the job reads it at its checkpoints. The trait is the seam
//! for swapping the in-process map for a shared external store.

use crate::job::JobId;
use async_trait::async_trait;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[async_trait]
pub trait CancellationRegistry: Send + Sync {
    /// Create the token for a new job. Registering a live id returns its existing token.
    async fn register(&self, job_id: JobId) -> CancellationToken;

    /// Set the job's token. `false` when the id is unknown or already released.
    async fn cancel(&self, job_id: &JobId) -> bool;

    async fn is_cancelled(&self, job_id: &JobId) -> bool;

    /// Drop the job's entry. Idempotent.
    async fn release(&self, job_id: &JobId);

    async fn live_jobs(&self) -> usize;
}

/// Process-local registry. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryCancellationRegistry {
    tokens: DashMap<JobId, CancellationToken>,
}

impl InMemoryCancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CancellationRegistry for InMemoryCancellationRegistry {
    async fn register(&self, job_id: JobId) -> CancellationToken {
        self.tokens.entry(job_id).or_default().clone()
    }

    async fn cancel(&self, job_id: &JobId) -> bool {
        match self.tokens.get(job_id) {
            Some(token) => {
                token.cancel();
                debug!(job_id = %job_id, "Cancellation requested");
                true
            }
            None => false,
        }
    }

    async fn is_cancelled(&self, job_id: &JobId) -> bool {
        self.tokens
            .get(job_id)
            .map(|token| token.is_cancelled())
            .unwrap_or(false)
    }

    async fn release(&self, job_id: &JobId) {
        self.tokens.remove(job_id);
    }

    async fn live_jobs(&self) -> usize {
        self.tokens.len()
    }
}
