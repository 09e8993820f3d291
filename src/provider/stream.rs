//! Server-sent-event decoding for provider streaming responses.

use crate::error::ApiError;
use futures::{Stream, StreamExt};
use std::collections::VecDeque;
use std::fmt::Display;
use std::time::Duration;

struct SseState<S> {
    inner: S,
    buffer: Vec<u8>,
    data: Vec<String>,
    ready: VecDeque<String>,
    finished: bool,
}

impl<S> SseState<S> {
    fn drain_lines(&mut self) {
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);
            if line.is_empty() {
                self.flush_event();
            } else if let Some(value) = line.strip_prefix("data:") {
                self.data
                    .push(value.strip_prefix(' ').unwrap_or(value).to_string());
            }
            // event:, id:, retry: and comment lines carry nothing we use
        }
    }

    fn flush_event(&mut self) {
        if !self.data.is_empty() {
            self.ready.push_back(self.data.join("\n"));
            self.data.clear();
        }
    }
}

/// Decode a byte stream into the `data` payloads of its SSE events. A read that
/// yields nothing for `idle` ends the stream with `ProviderTimeout`.
pub(crate) fn sse_data_events<S, B, E>(
    inner: S,
    idle: Duration,
) -> impl Stream<Item = Result<String, ApiError>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = SseState {
        inner,
        buffer: Vec::new(),
        data: Vec::new(),
        ready: VecDeque::new(),
        finished: false,
    };
    futures::stream::unfold(state, move |mut state| async move {
        loop {
            if let Some(event) = state.ready.pop_front() {
                return Some((Ok(event), state));
            }
            if state.finished {
                return None;
            }
            let Ok(next) = tokio::time::timeout(idle, state.inner.next()).await else {
                state.finished = true;
                return Some((
                    Err(ApiError::ProviderTimeout(format!(
                        "Stream stalled for {}s",
                        idle.as_secs()
                    ))),
                    state,
                ));
            };
            match next {
                Some(Ok(bytes)) => {
                    state.buffer.extend_from_slice(bytes.as_ref());
                    state.drain_lines();
                }
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((
                        Err(ApiError::ProviderStreamInterrupted(e.to_string())),
                        state,
                    ));
                }
                None => {
                    state.finished = true;
                    if !state.buffer.is_empty() {
                        state.buffer.push(b'\n');
                        state.drain_lines();
                    }
                    state.flush_event();
                }
            }
        }
    })
}
