//! Courses command implementation.

use crate::assistant::{open_store, CourseAnalytics};
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the courses command.
///
/// Reads the store directly, so no API keys are needed.
pub async fn run_courses(settings: Settings) -> Result<()> {
    let analytics = CourseAnalytics::collect(open_store(&settings)?.as_ref()).await?;

    if analytics.total_courses == 0 {
        Output::warning("No courses indexed yet.");
        Output::info("Add one with 'coursewise import <file.json>'.");
        return Ok(());
    }

    Output::header(&format!("Indexed courses ({})", analytics.total_courses));
    for title in &analytics.course_titles {
        Output::list_item(title);
    }

    Ok(())
}
