//! Import command implementation.

use crate::assistant::{import_course, open_index, CourseImport};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use anyhow::{Context, Result};

/// Run the import command.
pub async fn run_import(file: &str, clear: bool, settings: Settings) -> Result<()> {
    preflight::check(Operation::Embed, &settings)?;

    let content =
        std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file))?;
    let import: CourseImport =
        serde_json::from_str(&content).with_context(|| format!("Invalid course file {}", file))?;

    let index = open_index(&settings)?;
    if clear {
        index.clear().await?;
        Output::info("Removed existing courses");
    }

    let spinner = Output::spinner(&format!(
        "Embedding {} chunks for '{}'...",
        import.chunks.len(),
        import.course.title
    ));
    let result = import_course(&index, &import.course, &import.chunks).await;
    spinner.finish_and_clear();

    let indexed = result?;
    Output::success(&format!(
        "Imported '{}' ({} lessons, {} chunks)",
        import.course.title,
        import.course.lessons.len(),
        indexed
    ));

    Ok(())
}
