//! Shared test utilities for integration tests
//!
//! Scripted job runtimes, event inspection helpers, and isolated XDG
//! directories for config tests.

use clausecraft::cancellation::InMemoryCancellationRegistry;
use clausecraft::drafting::{ScriptedModel, SectionStep};
use clausecraft::generation::{
    EditOrchestrator, GenerationOrchestrator, JobConfig, JobHandle, JobRuntime,
};
use clausecraft::job::OutputEvent;
use clausecraft::retry::RetryPolicy;
use futures::StreamExt;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Global mutex to serialize XDG environment variable access across all tests
static XDG_ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Everything a pipeline test needs to drive and inspect jobs.
pub struct Pipeline {
    pub model: Arc<ScriptedModel>,
    pub registry: Arc<InMemoryCancellationRegistry>,
    pub generation: GenerationOrchestrator,
    pub edits: EditOrchestrator,
}

pub fn pipeline(model: ScriptedModel, max_attempts: u32) -> Pipeline {
    pipeline_with_retry(model, RetryPolicy::immediate(max_attempts))
}

pub fn pipeline_with_retry(model: ScriptedModel, retry: RetryPolicy) -> Pipeline {
    let model = Arc::new(model);
    let registry = Arc::new(InMemoryCancellationRegistry::new());
    let runtime = JobRuntime::new(model.clone(), registry.clone(), retry, JobConfig::default());
    Pipeline {
        model,
        registry,
        generation: GenerationOrchestrator::new(runtime.clone()),
        edits: EditOrchestrator::new(runtime),
    }
}

const NDA_SECTIONS: [(&str, &[&str]); 3] = [
    (
        "Definitions",
        &["\"Confidential Information\" means ", "any non-public data."],
    ),
    (
        "Confidentiality",
        &["Each party shall keep\n", "the other's information secret."],
    ),
    ("Term", &["This agreement lasts two years."]),
];

/// The example contract: three sections with a line break in the middle one.
pub fn nda_model() -> ScriptedModel {
    nda_model_with("", Vec::new())
}

/// The example contract with `heading` scripted by `attempts` instead.
pub fn nda_model_with(heading: &str, attempts: Vec<Vec<SectionStep>>) -> ScriptedModel {
    let mut model = ScriptedModel::new().with_plan(
        "Mutual NDA",
        &NDA_SECTIONS.map(|(h, _)| h),
    );
    for (section, chunks) in NDA_SECTIONS {
        if section != heading {
            model = model.with_section(section, chunks);
        }
    }
    for steps in attempts {
        model = model.with_section_attempt(heading, steps);
    }
    model
}

pub async fn collect(handle: JobHandle) -> Vec<OutputEvent> {
    handle.collect().await
}

pub fn is_terminal(event: &OutputEvent) -> bool {
    matches!(
        event,
        OutputEvent::Completed { .. } | OutputEvent::Cancelled | OutputEvent::Failed { .. }
    )
}

/// Text the caller saw, with line breaks restored.
pub fn streamed_text(events: &[OutputEvent]) -> String {
    events
        .iter()
        .filter_map(|event| match event {
            OutputEvent::ContentChunk { text } => Some(text.as_str()),
            OutputEvent::LineBreak => Some("\n"),
            _ => None,
        })
        .collect()
}

/// Events between `SectionStarted{index}` and the matching boundary.
pub fn section_events(events: &[OutputEvent], index: usize) -> Vec<OutputEvent> {
    events
        .iter()
        .skip_while(|e| !matches!(e, OutputEvent::SectionStarted { index: i, .. } if *i == index))
        .skip(1)
        .take_while(|e| !matches!(e, OutputEvent::SectionBoundary { .. }) && !is_terminal(e))
        .cloned()
        .collect()
}

/// Events with per-run identity (job ids, document ids, timestamps) removed.
pub fn without_identity(events: &[OutputEvent]) -> Vec<OutputEvent> {
    events
        .iter()
        .filter(|e| !matches!(e, OutputEvent::JobStarted { .. } | OutputEvent::Completed { .. }))
        .cloned()
        .collect()
}

/// Environment variable state to restore after test
struct EnvState {
    vars: Vec<(&'static str, Option<String>)>,
}

const ISOLATED_VARS: [&str; 4] = [
    "HOME",
    "XDG_CONFIG_HOME",
    "CLAUSECRAFT_ENV",
    "CLAUSECRAFT__PROVIDER__MODEL",
];

impl EnvState {
    fn capture() -> Self {
        Self {
            vars: ISOLATED_VARS
                .iter()
                .map(|name| (*name, std::env::var(name).ok()))
                .collect(),
        }
    }

    fn restore(self) {
        for (name, value) in self.vars {
            match value {
                Some(orig) => std::env::set_var(name, orig),
                None => std::env::remove_var(name),
            }
        }
    }
}

/// Run `f` with XDG_CONFIG_HOME pointing at `test_dir` and HOME at `test_dir/home`.
///
/// CLAUSECRAFT_ENV and config overrides from the outer environment are cleared
/// for the duration of the call.
pub fn with_xdg_env<F, R>(test_dir: &TempDir, f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = XDG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let env_state = EnvState::capture();

    let test_home = test_dir.path().join("home");
    std::fs::create_dir_all(&test_home).unwrap();

    std::env::set_var("HOME", test_home.to_str().unwrap());
    std::env::set_var("XDG_CONFIG_HOME", test_dir.path().to_str().unwrap());
    std::env::remove_var("CLAUSECRAFT_ENV");
    std::env::remove_var("CLAUSECRAFT__PROVIDER__MODEL");

    let result = f();

    env_state.restore();

    result
}
