//! Backpressured event delivery from a job task to its caller.

use crate::error::ApiError;
use crate::job::{JobId, OutputEvent};
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::warn;

/// Sending half. Each send waits at most `idle_timeout` for room in the channel.
#[derive(Debug, Clone)]
pub struct EventSink {
    job_id: JobId,
    tx: mpsc::Sender<OutputEvent>,
    idle_timeout: Duration,
}

impl EventSink {
    pub async fn emit(&self, event: OutputEvent) -> Result<(), ApiError> {
        match tokio::time::timeout(self.idle_timeout, self.tx.send(event)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(ApiError::CallerDisconnected),
            Err(_) => {
                warn!(
                    job_id = %self.job_id,
                    idle_timeout_secs = self.idle_timeout.as_secs(),
                    "Caller stopped reading events"
                );
                Err(ApiError::CallerDisconnected)
            }
        }
    }

    /// Enqueue without waiting. Only valid while the channel is known to have room.
    pub fn try_emit(&self, event: OutputEvent) -> Result<(), ApiError> {
        self.tx
            .try_send(event)
            .map_err(|_| ApiError::CallerDisconnected)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Caller side of a running job: its id and the ordered stream of its events.
#[derive(Debug)]
pub struct JobHandle {
    pub job_id: JobId,
    pub events: ReceiverStream<OutputEvent>,
}

impl JobHandle {
    pub async fn next_event(&mut self) -> Option<OutputEvent> {
        futures::StreamExt::next(&mut self.events).await
    }
}

impl Stream for JobHandle {
    type Item = OutputEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.events).poll_next(cx)
    }
}

pub fn event_channel(
    job_id: JobId,
    capacity: usize,
    idle_timeout: Duration,
) -> (EventSink, JobHandle) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        EventSink {
            job_id,
            tx,
            idle_timeout,
        },
        JobHandle {
            job_id,
            events: ReceiverStream::new(rx),
        },
    )
}
