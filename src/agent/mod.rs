//! Tool-using answer generation.
//!
//! [`ResponseOrchestrator`] runs the bounded model/tool loop over a
//! [`ToolRegistry`]. The course tools wrap [`crate::index::RetrievalIndex`]
//! and report their citations through [`ToolOutput`], so nothing is shared
//! between concurrent questions.

mod outline;
mod runner;
mod search;
mod tools;

pub use outline::{render_outline, CourseOutlineTool, OUTLINE_TOOL_NAME};
pub use runner::{
    Answer, ResponseOrchestrator, ToolCallRecord, DEFAULT_MAX_ROUNDS, DEFAULT_SYSTEM_PROMPT,
};
pub use search::{CourseSearchTool, SEARCH_TOOL_NAME};
pub use tools::{parse_input, Tool, ToolOutput, ToolRegistry};
