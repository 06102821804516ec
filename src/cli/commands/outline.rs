//! Outline command implementation.

use crate::agent::{CourseOutlineTool, Tool};
use crate::assistant::open_index;
use crate::cli::preflight::{self, Operation};
use crate::config::Settings;
use anyhow::Result;
use serde_json::json;

/// Run the outline command.
pub async fn run_outline(course: &str, settings: Settings) -> Result<()> {
    preflight::check(Operation::Embed, &settings)?;

    let tool = CourseOutlineTool::new(open_index(&settings)?);

    let output = tool.execute(&json!({ "course_title": course })).await?;
    println!("{}", output.content);

    Ok(())
}
