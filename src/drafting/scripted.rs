//! Scripted `DocumentModel` for exercising the pipeline without a provider.
//!
//! Outcomes are queued per call site. When a queue holds one entry it is
//! replayed for every further call, so a single failure can stand for
//! "fails on every attempt".

use super::{DocumentModel, RewriteRequest, SectionRequest};
use crate::error::ApiError;
use crate::job::{Document, PlanResult};
use crate::provider::CompletionStream;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Notify;

/// One step of a scripted stream.
#[derive(Debug, Clone)]
pub enum SectionStep {
    Chunk(String),
    /// Fails the call. As the first step, the call fails before any stream exists.
    Fail(ApiError),
    /// Parks the stream until the gate is notified.
    WaitFor(Arc<Notify>),
}

impl SectionStep {
    pub fn chunk(text: impl Into<String>) -> Self {
        SectionStep::Chunk(text.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelCall {
    Plan { prompt: String },
    Section { heading: String, prior_summary: String },
    Rewrite { instruction: String },
    Suggest { title: String },
}

#[derive(Default)]
pub struct ScriptedModel {
    plans: Mutex<VecDeque<Result<PlanResult, ApiError>>>,
    plan_gate: Mutex<Option<Arc<Notify>>>,
    sections: Mutex<HashMap<String, VecDeque<Vec<SectionStep>>>>,
    rewrites: Mutex<VecDeque<Vec<SectionStep>>>,
    suggestions: Mutex<VecDeque<Result<Vec<String>, ApiError>>>,
    calls: Mutex<Vec<ModelCall>>,
}

fn next_outcome<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

fn play(steps: Vec<SectionStep>) -> Result<CompletionStream, ApiError> {
    if let Some(SectionStep::Fail(err)) = steps.first() {
        return Err(err.clone());
    }
    let stream = futures::stream::unfold(steps.into_iter(), |mut steps| async move {
        loop {
            match steps.next()? {
                SectionStep::Chunk(text) => return Some((Ok(text), steps)),
                SectionStep::Fail(err) => return Some((Err(err), steps)),
                SectionStep::WaitFor(gate) => gate.notified().await,
            }
        }
    });
    Ok(Box::pin(stream))
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plan(self, title: &str, headings: &[&str]) -> Self {
        self.with_plan_outcome(Ok(PlanResult::new(
            title,
            headings.iter().map(|h| h.to_string()).collect(),
        )))
    }

    pub fn with_plan_outcome(self, outcome: Result<PlanResult, ApiError>) -> Self {
        self.plans.lock().push_back(outcome);
        self
    }

    /// Hold every plan call until `gate` is notified.
    pub fn with_plan_gate(self, gate: Arc<Notify>) -> Self {
        *self.plan_gate.lock() = Some(gate);
        self
    }

    /// Queue one successful attempt for `heading`.
    pub fn with_section(self, heading: &str, chunks: &[&str]) -> Self {
        self.with_section_attempt(heading, chunks.iter().map(|c| SectionStep::chunk(*c)).collect())
    }

    pub fn with_section_attempt(self, heading: &str, steps: Vec<SectionStep>) -> Self {
        self.sections
            .lock()
            .entry(heading.to_string())
            .or_default()
            .push_back(steps);
        self
    }

    pub fn with_rewrite(self, steps: Vec<SectionStep>) -> Self {
        self.rewrites.lock().push_back(steps);
        self
    }

    pub fn with_suggestions(self, outcome: Result<Vec<String>, ApiError>) -> Self {
        self.suggestions.lock().push_back(outcome);
        self
    }

    pub fn calls(&self) -> Vec<ModelCall> {
        self.calls.lock().clone()
    }

    pub fn plan_calls(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, ModelCall::Plan { .. }))
            .count()
    }

    pub fn section_calls(&self, heading: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, ModelCall::Section { heading: h, .. } if h == heading))
            .count()
    }
}

#[async_trait]
impl DocumentModel for ScriptedModel {
    async fn plan(&self, prompt: &str) -> Result<PlanResult, ApiError> {
        self.calls.lock().push(ModelCall::Plan {
            prompt: prompt.to_string(),
        });
        let gate = self.plan_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let outcome = next_outcome(&mut *self.plans.lock());
        outcome.unwrap_or_else(|| Err(ApiError::ProviderError("No scripted plan".to_string())))
    }

    async fn write_section(&self, request: &SectionRequest) -> Result<CompletionStream, ApiError> {
        self.calls.lock().push(ModelCall::Section {
            heading: request.heading.clone(),
            prior_summary: request.prior_summary.clone(),
        });
        let steps = self
            .sections
            .lock()
            .get_mut(&request.heading)
            .and_then(next_outcome)
            .unwrap_or_else(|| vec![SectionStep::chunk(format!("{} text.", request.heading))]);
        play(steps)
    }

    async fn rewrite(&self, request: &RewriteRequest) -> Result<CompletionStream, ApiError> {
        self.calls.lock().push(ModelCall::Rewrite {
            instruction: request.instruction.clone(),
        });
        let steps = next_outcome(&mut *self.rewrites.lock())
            .unwrap_or_else(|| vec![SectionStep::Chunk(request.content.clone())]);
        play(steps)
    }

    async fn suggest_edits(&self, document: &Document) -> Result<Vec<String>, ApiError> {
        self.calls.lock().push(ModelCall::Suggest {
            title: document.title.clone(),
        });
        next_outcome(&mut *self.suggestions.lock()).unwrap_or_else(|| Ok(Vec::new()))
    }
}
