//! CLI output: error mapping and terminal rendering of job events.

use crate::error::ApiError;
use crate::job::{JobKind, OutputEvent};
use owo_colors::OwoColorize;

/// Map domain/service errors to a string for CLI output.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::ProviderNotConfigured(msg) => {
            format!(
                "{}\nConfigure [provider] in config/config.toml or set the API key variable.",
                msg
            )
        }
        other => other.to_string(),
    }
}

/// Renders job events as readable terminal text. Edit jobs print the
/// rewritten text only.
#[derive(Debug, Clone, Copy)]
pub struct TextRenderer {
    kind: JobKind,
    color: bool,
}

impl TextRenderer {
    pub fn new(kind: JobKind, color: bool) -> Self {
        Self { kind, color }
    }

    /// Text to print for `event`, if any. Terminal events render nothing;
    /// the caller reports the outcome.
    pub fn render(&self, event: &OutputEvent) -> Option<String> {
        match event {
            OutputEvent::Planned { title, .. } => Some(if self.color {
                format!("{}\n", title.bold().underline())
            } else {
                format!("{}\n", title)
            }),
            OutputEvent::SectionStarted { .. } if self.kind == JobKind::Edit => None,
            OutputEvent::SectionStarted { heading, .. } => Some(if self.color {
                format!("\n{}\n\n", heading.bold())
            } else {
                format!("\n{}\n\n", heading)
            }),
            OutputEvent::ContentChunk { text } => Some(text.clone()),
            OutputEvent::LineBreak | OutputEvent::SectionBoundary { .. } => Some("\n".to_string()),
            OutputEvent::JobStarted { .. }
            | OutputEvent::Completed { .. }
            | OutputEvent::Cancelled
            | OutputEvent::Failed { .. } => None,
        }
    }
}

pub fn format_suggestions(suggestions: &[String]) -> String {
    suggestions
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {}", i + 1, s))
        .collect::<Vec<_>>()
        .join("\n")
}
