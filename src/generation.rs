//! Job execution: orchestrators, the section writer, line chunking and event sinks.

pub mod chunking;
pub mod edit;
pub mod orchestrator;
pub mod runtime;
pub mod section;
pub mod sink;

pub use chunking::{chunk_text, LineChunker, Piece};
pub use edit::{EditOrchestrator, EDIT_SECTION_HEADING, FALLBACK_SUGGESTIONS, MAX_SUGGESTIONS};
pub use orchestrator::GenerationOrchestrator;
pub use runtime::{JobConfig, JobContext, JobRuntime};
pub use section::{SectionCall, SectionWriter};
pub use sink::{event_channel, EventSink, JobHandle};
