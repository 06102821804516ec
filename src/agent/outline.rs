//! `get_course_outline`: course metadata and lesson list.

use super::tools::{parse_input, Tool, ToolOutput};
use crate::backend::ToolDefinition;
use crate::error::Result;
use crate::index::RetrievalIndex;
use crate::vector_store::CourseRecord;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{instrument, warn};

pub const OUTLINE_TOOL_NAME: &str = "get_course_outline";

#[derive(Debug, Deserialize)]
struct OutlineArgs {
    course_title: String,
}

pub struct CourseOutlineTool {
    index: Arc<RetrievalIndex>,
}

impl CourseOutlineTool {
    pub fn new(index: Arc<RetrievalIndex>) -> Self {
        Self { index }
    }
}

/// Render a course as title, instructor, link and one line per lesson.
pub fn render_outline(course: &CourseRecord) -> String {
    let mut lines = vec![
        format!("Course: {}", course.title),
        format!(
            "Instructor: {}",
            course.instructor.as_deref().unwrap_or("Unknown")
        ),
        format!(
            "Course Link: {}",
            course.link.as_deref().unwrap_or("No link available")
        ),
        String::new(),
    ];

    if course.lessons.is_empty() {
        lines.push("No lesson information available.".to_string());
    } else {
        lines.push("Lessons:".to_string());
        lines.extend(
            course
                .lessons
                .iter()
                .map(|l| format!("  Lesson {}: {}", l.number, l.title)),
        );
    }

    lines.join("\n")
}

#[async_trait]
impl Tool for CourseOutlineTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            OUTLINE_TOOL_NAME,
            "Get the complete outline of a course including title, link, and all lessons with numbers and titles",
        )
        .param(
            "course_title",
            "string",
            "Full or partial course title (e.g., 'MCP', 'Introduction to RAG')",
            true,
        )
    }

    #[instrument(skip(self, input))]
    async fn execute(&self, input: &Value) -> Result<ToolOutput> {
        let args: OutlineArgs = parse_input(OUTLINE_TOOL_NAME, input)?;

        let Some(title) = self.index.resolve_course_name(&args.course_title).await else {
            return Ok(ToolOutput::text(format!(
                "No course found matching '{}'",
                args.course_title
            )));
        };

        let text = match self.index.get_course(&title).await {
            Ok(Some(course)) => render_outline(&course),
            Ok(None) => format!("Course metadata not found for '{}'", title),
            Err(e) => {
                warn!("Outline lookup for '{}' failed: {}", title, e);
                format!("Error retrieving course outline: {}", e)
            }
        };
        Ok(ToolOutput::text(text))
    }
}
