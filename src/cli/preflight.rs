//! Pre-flight checks before commands that call external APIs.
//!
//! Catches missing credentials up front instead of failing on the first
//! embedding or model request.

use crate::config::{BackendProvider, Settings};
use crate::error::{CoursewiseError, Result};

const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";

/// What a command needs from its environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Answering questions embeds queries and calls the model backend.
    Ask,
    /// Searching, outlining and importing only embed.
    Embed,
    /// Catalog listing reads the store.
    Catalog,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Ask => {
            check_key(OPENAI_KEY_ENV)?;
            check_key(backend_key_env(settings))?;
        }
        Operation::Embed => check_key(OPENAI_KEY_ENV)?,
        Operation::Catalog => {}
    }
    Ok(())
}

/// Environment variable holding the model backend's API key.
fn backend_key_env(settings: &Settings) -> &str {
    match settings.backend.provider {
        BackendProvider::Anthropic => &settings.backend.api_key_env,
        BackendProvider::OpenAI => OPENAI_KEY_ENV,
    }
}

fn check_key(var: &str) -> Result<()> {
    check_value(var, std::env::var(var).ok())
}

fn check_value(var: &str, value: Option<String>) -> Result<()> {
    match value {
        Some(key) if !key.trim().is_empty() => Ok(()),
        Some(_) => Err(CoursewiseError::Config(format!(
            "{} is empty. Set it with: export {}='...'",
            var, var
        ))),
        None => Err(CoursewiseError::Config(format!(
            "{} not set. Set it with: export {}='...'",
            var, var
        ))),
    }
}
