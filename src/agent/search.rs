//! `search_course_content`: semantic search over course passages.

use super::tools::{parse_input, Tool, ToolOutput};
use crate::backend::ToolDefinition;
use crate::error::Result;
use crate::index::{RetrievalIndex, SearchHit};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

pub const SEARCH_TOOL_NAME: &str = "search_course_content";

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    course_name: Option<String>,
    #[serde(default)]
    lesson_number: Option<u32>,
}

/// Searches passage content, optionally narrowed to a course and lesson.
pub struct CourseSearchTool {
    index: Arc<RetrievalIndex>,
}

impl CourseSearchTool {
    pub fn new(index: Arc<RetrievalIndex>) -> Self {
        Self { index }
    }

    async fn render(&self, hits: &[SearchHit]) -> ToolOutput {
        let mut entries = Vec::with_capacity(hits.len());
        let mut sources = Vec::with_capacity(hits.len());

        for hit in hits {
            let label = display_label(&hit.metadata.course_title, hit.metadata.lesson_number);
            entries.push(format!("[{}]\n{}", label, hit.content));
            sources.push(self.cite(&hit.metadata.course_title, hit.metadata.lesson_number, label).await);
        }

        ToolOutput::with_sources(entries.join("\n\n"), sources)
    }

    /// Prefer the lesson link, then a link to the course under the course
    /// title, then the bare label.
    async fn cite(&self, course_title: &str, lesson_number: Option<u32>, label: String) -> String {
        if let Some(n) = lesson_number {
            if let Some(href) = self.index.get_lesson_link(course_title, n).await {
                return anchor(&href, &label);
            }
        }
        match self.index.get_course_link(course_title).await {
            Some(href) => anchor(&href, course_title),
            None => label,
        }
    }
}

fn display_label(course_title: &str, lesson_number: Option<u32>) -> String {
    match lesson_number {
        Some(n) => format!("{} - Lesson {}", course_title, n),
        None => course_title.to_string(),
    }
}

fn anchor(href: &str, text: &str) -> String {
    format!(
        r#"<a href="{}" target="_blank" rel="noopener noreferrer">{}</a>"#,
        href, text
    )
}

fn no_results_message(course_name: Option<&str>, lesson_number: Option<u32>) -> String {
    let mut message = String::from("No relevant content found");
    if let Some(course) = course_name {
        message.push_str(&format!(" in course '{}'", course));
    }
    if let Some(lesson) = lesson_number {
        message.push_str(&format!(" in lesson {}", lesson));
    }
    message.push('.');
    message
}

#[async_trait]
impl Tool for CourseSearchTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            SEARCH_TOOL_NAME,
            "Search course materials with smart course name matching and lesson filtering",
        )
        .param(
            "query",
            "string",
            "What to search for in the course content",
            true,
        )
        .param(
            "course_name",
            "string",
            "Course title (partial matches work, e.g. 'MCP', 'Introduction')",
            false,
        )
        .param(
            "lesson_number",
            "integer",
            "Specific lesson number to search within (e.g. 1, 2, 3)",
            false,
        )
    }

    #[instrument(skip(self, input))]
    async fn execute(&self, input: &Value) -> Result<ToolOutput> {
        let args: SearchArgs = parse_input(SEARCH_TOOL_NAME, input)?;

        let results = self
            .index
            .search(
                &args.query,
                args.course_name.as_deref(),
                args.lesson_number,
                None,
            )
            .await;

        if let Some(error) = results.error() {
            return Ok(ToolOutput::text(error));
        }
        if results.is_empty() {
            return Ok(ToolOutput::text(no_results_message(
                args.course_name.as_deref(),
                args.lesson_number,
            )));
        }

        debug!("Rendering {} passages", results.len());
        Ok(self.render(results.hits()).await)
    }
}
