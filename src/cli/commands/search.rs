//! Search command implementation.

use crate::agent::{CourseSearchTool, Tool};
use crate::assistant::open_index;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;
use serde_json::json;

/// Run the search command through the same tool the model uses.
pub async fn run_search(
    query: &str,
    course: Option<&str>,
    lesson: Option<u32>,
    settings: Settings,
) -> Result<()> {
    preflight::check(Operation::Embed, &settings)?;

    let tool = CourseSearchTool::new(open_index(&settings)?);

    let spinner = Output::spinner("Searching...");
    let output = tool
        .execute(&json!({
            "query": query,
            "course_name": course,
            "lesson_number": lesson,
        }))
        .await;
    spinner.finish_and_clear();

    let output = output?;
    println!("{}", output.content);

    if !output.sources.is_empty() {
        Output::header("Sources");
        for source in &output.sources {
            Output::source(source);
        }
    }

    Ok(())
}
