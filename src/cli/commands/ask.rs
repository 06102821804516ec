//! Ask command implementation.

use crate::assistant::Assistant;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    history: Option<&str>,
    no_tools: bool,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let assistant = Assistant::from_settings(&settings)?;
    let provider = settings.backend.provider;

    let spinner = Output::spinner("Thinking...");
    let result = if no_tools {
        assistant.ask_without_tools(question, history).await
    } else {
        assistant.ask(question, history).await
    };
    spinner.finish_and_clear();

    match result {
        Ok(answer) => {
            println!("\n{}\n", answer.text);

            if !answer.sources.is_empty() {
                Output::header("Sources");
                for source in &answer.sources {
                    Output::source(source);
                }
            }

            if !answer.tool_calls.is_empty() {
                Output::header("Tool calls");
                for call in &answer.tool_calls {
                    Output::tool_call(&call.to_string(), call.is_error);
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to generate answer: {}", e));
            if e.is_backend_failure() {
                Output::info(&format!(
                    "Check the {} backend settings with 'coursewise config show'.",
                    provider
                ));
            }
            return Err(e.into());
        }
    }

    Ok(())
}
