//! Server-sent-event framing of job events.
//!
//! The first frame carries the job id as JSON under `contract_id` (edits:
//! `new_contract_id`). Generation jobs wrap their text in lightweight HTML
//! markup; edit jobs stream the rewritten text only. Terminal events use the
//! `done`, `cancelled` and `error` event names.

use crate::generation::chunking::is_line_break;
use crate::job::{JobKind, OutputEvent};
use std::borrow::Cow;

pub const CANCELLED_MESSAGE: &str = "Generation cancelled by user";

/// Frame `data` as one SSE message, one `data:` line per line of input.
pub fn sse_format(data: &str, event: Option<&str>) -> String {
    let mut frame = String::new();
    if let Some(event) = event {
        frame.push_str("event: ");
        frame.push_str(event);
        frame.push('\n');
    }
    let normalised = data.replace("\r\n", "\n");
    let mut lines: Vec<&str> = normalised.split(is_line_break).collect();
    if lines.len() > 1 && lines.last() == Some(&"") {
        lines.pop();
    }
    for line in lines {
        frame.push_str("data: ");
        frame.push_str(line);
        frame.push('\n');
    }
    frame.push('\n');
    frame
}

/// Entity-escape text bound for the HTML-ish stream, quotes included.
pub fn escape_html(text: &str) -> Cow<'_, str> {
    html_escape::encode_quoted_attribute(text)
}

/// Stateful per-job encoder: remembers whether the document body is open.
#[derive(Debug)]
pub struct SseEncoder {
    kind: JobKind,
    body_open: bool,
}

impl SseEncoder {
    pub fn new(kind: JobKind) -> Self {
        Self {
            kind,
            body_open: false,
        }
    }

    fn markup(&self) -> bool {
        self.kind == JobKind::Generation
    }

    pub fn encode(&mut self, event: &OutputEvent) -> Vec<String> {
        match event {
            OutputEvent::JobStarted { job_id, kind } => {
                let key = match kind {
                    JobKind::Generation => "contract_id",
                    JobKind::Edit => "new_contract_id",
                };
                let payload = serde_json::json!({ key: job_id.to_string() });
                vec![sse_format(&payload.to_string(), Some(key))]
            }
            OutputEvent::Planned { title, .. } if self.markup() => {
                self.body_open = true;
                vec![
                    sse_format(&format!("<h1>{}</h1>", escape_html(title)), None),
                    sse_format("<div class='contract-body'>", None),
                ]
            }
            OutputEvent::SectionStarted { heading, .. } if self.markup() => vec![
                sse_format(&format!("<h2>{}</h2>", escape_html(heading)), None),
                sse_format("<p>", None),
            ],
            OutputEvent::SectionBoundary { .. } if self.markup() => vec![sse_format("</p>", None)],
            OutputEvent::Planned { .. }
            | OutputEvent::SectionStarted { .. }
            | OutputEvent::SectionBoundary { .. } => Vec::new(),
            OutputEvent::ContentChunk { text } => vec![sse_format(&escape_html(text), None)],
            OutputEvent::LineBreak => vec![sse_format("<br/>", None)],
            OutputEvent::Completed { document } => {
                let mut frames = Vec::new();
                if self.body_open {
                    self.body_open = false;
                    frames.push(sse_format("</div>", None));
                }
                frames.push(sse_format(
                    &format!("<p><strong>Contract {} completed.</strong></p>", document.id),
                    Some("done"),
                ));
                frames
            }
            OutputEvent::Cancelled => vec![sse_format(CANCELLED_MESSAGE, Some("cancelled"))],
            OutputEvent::Failed { reason } => {
                vec![sse_format(&escape_html(reason), Some("error"))]
            }
        }
    }
}
