//! Job data model: identity, stage machine, plan, per-section results, and the
//! events a job emits to its caller.

use crate::error::ApiError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque job identifier. Also the identifier of the document a job produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for JobId {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| ApiError::InvalidRequest(format!("Invalid job id '{}': {}", s, e)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Generation,
    Edit,
}

/// Stage machine: `Planning -> Writing(0..N-1) -> Completed`, with `Cancelled`
/// and `Failed` reachable from any non-terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Planning,
    Writing(usize),
    Completed,
    Cancelled,
    Failed,
}

impl JobStage {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStage::Completed | JobStage::Cancelled | JobStage::Failed
        )
    }

    pub fn can_transition_to(&self, next: &JobStage) -> bool {
        match (self, next) {
            (JobStage::Planning, JobStage::Writing(0)) => true,
            (JobStage::Writing(i), JobStage::Writing(j)) => *j == i + 1,
            (current, next) => !current.is_terminal() && next.is_terminal(),
        }
    }
}

/// Title plus ordered section headings. Produced once per job, immutable after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanResult {
    pub title: String,
    pub headings: Vec<String>,
}

impl PlanResult {
    pub fn new(title: impl Into<String>, headings: Vec<String>) -> Self {
        Self {
            title: title.into(),
            headings,
        }
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.headings.is_empty() {
            return Err(ApiError::MalformedPlan(
                "Plan contains no sections".to_string(),
            ));
        }
        if let Some(position) = self.headings.iter().position(|h| h.trim().is_empty()) {
            return Err(ApiError::MalformedPlan(format!(
                "Section heading {} is blank",
                position
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionResult {
    pub index: usize,
    pub heading: String,
    pub text: String,
    pub complete: bool,
}

/// A finished document. `id` is the job that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: JobId,
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derived_from: Option<JobId>,
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Wrap caller-supplied text as a source document for an edit job.
    pub fn from_text(
        id: Option<JobId>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.unwrap_or_default(),
            title: title.into(),
            content: content.into(),
            derived_from: None,
            created_at: Utc::now(),
        }
    }
}

/// Externally observed unit of a job's progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputEvent {
    JobStarted { job_id: JobId, kind: JobKind },
    Planned { title: String, headings: Vec<String> },
    SectionStarted { index: usize, heading: String },
    ContentChunk { text: String },
    /// Stands where a line break was removed from raw model output.
    LineBreak,
    SectionBoundary { index: usize },
    Completed { document: Document },
    Cancelled,
    Failed { reason: String },
}

impl OutputEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OutputEvent::Completed { .. } | OutputEvent::Cancelled | OutputEvent::Failed { .. }
        )
    }
}

/// One generation or edit run. Owned and mutated only by the task driving it.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub kind: JobKind,
    pub input: String,
    stage: JobStage,
    plan: Option<PlanResult>,
    sections: Vec<SectionResult>,
    derived_from: Option<JobId>,
}

impl Job {
    pub fn new(kind: JobKind, input: impl Into<String>) -> Self {
        Self {
            id: JobId::new(),
            kind,
            input: input.into(),
            stage: JobStage::Planning,
            plan: None,
            sections: Vec::new(),
            derived_from: None,
        }
    }

    pub fn with_source(mut self, source: JobId) -> Self {
        self.derived_from = Some(source);
        self
    }

    pub fn stage(&self) -> JobStage {
        self.stage
    }

    pub fn plan(&self) -> Option<&PlanResult> {
        self.plan.as_ref()
    }

    pub fn sections(&self) -> &[SectionResult] {
        &self.sections
    }

    pub fn set_plan(&mut self, plan: PlanResult) -> Result<(), ApiError> {
        if self.plan.is_some() {
            return Err(ApiError::MalformedPlan(format!(
                "Job {} already has a plan",
                self.id
            )));
        }
        plan.validate()?;
        self.plan = Some(plan);
        Ok(())
    }

    pub fn transition(&mut self, next: JobStage) -> Result<(), ApiError> {
        if !self.stage.can_transition_to(&next) {
            return Err(ApiError::InvalidRequest(format!(
                "Job {} cannot move from {:?} to {:?}",
                self.id, self.stage, next
            )));
        }
        self.stage = next;
        Ok(())
    }

    /// Open the next section. Sections are appended strictly in plan order.
    pub fn begin_section(&mut self, index: usize) -> Result<&SectionResult, ApiError> {
        let plan = self.plan.as_ref().ok_or_else(|| {
            ApiError::MalformedPlan(format!("Job {} has no plan yet", self.id))
        })?;
        if index != self.sections.len() || index >= plan.headings.len() {
            return Err(ApiError::InvalidRequest(format!(
                "Section {} cannot follow {} written sections of {}",
                index,
                self.sections.len(),
                plan.headings.len()
            )));
        }
        self.sections.push(SectionResult {
            index,
            heading: plan.headings[index].clone(),
            text: String::new(),
            complete: false,
        });
        Ok(&self.sections[index])
    }

    pub fn append_text(&mut self, text: &str) {
        if let Some(section) = self.sections.last_mut() {
            section.text.push_str(text);
        }
    }

    pub fn complete_section(&mut self) {
        if let Some(section) = self.sections.last_mut() {
            section.complete = true;
        }
    }

    /// Short digest of the sections written so far, fed to later section prompts.
    pub fn prior_summary(&self, max_chars_per_section: usize) -> String {
        self.sections
            .iter()
            .filter(|s| s.complete)
            .map(|s| {
                let excerpt: String = s.text.trim().chars().take(max_chars_per_section).collect();
                if excerpt.chars().count() < s.text.trim().chars().count() {
                    format!("{}: {}...", s.heading, excerpt)
                } else {
                    format!("{}: {}", s.heading, excerpt)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn to_document(&self) -> Document {
        let title = self
            .plan
            .as_ref()
            .map(|p| p.title.clone())
            .unwrap_or_default();
        let content = match self.kind {
            JobKind::Generation => self
                .sections
                .iter()
                .map(|s| format!("{}\n\n{}", s.heading, s.text.trim_end()))
                .collect::<Vec<_>>()
                .join("\n\n"),
            JobKind::Edit => self
                .sections
                .iter()
                .map(|s| s.text.as_str())
                .collect::<String>(),
        };
        Document {
            id: self.id,
            title,
            content,
            derived_from: self.derived_from,
            created_at: Utc::now(),
        }
    }
}
