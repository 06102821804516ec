//! Tool contract and registry.

use crate::backend::ToolDefinition;
use crate::error::{CoursewiseError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Text handed back to the model, plus the citations it produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput {
    pub content: String,
    pub sources: Vec<String>,
}

impl ToolOutput {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sources: Vec::new(),
        }
    }

    pub fn with_sources(content: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            content: content.into(),
            sources,
        }
    }
}

/// A capability the model can invoke.
///
/// Failures a tool can describe to the model should be returned as text in
/// [`ToolOutput`]; an `Err` is reserved for faults the tool cannot handle,
/// and is turned into an error-flagged result by the caller.
#[async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    async fn execute(&self, input: &Value) -> Result<ToolOutput>;
}

/// Deserialize a tool's JSON input into its argument struct.
pub fn parse_input<T: DeserializeOwned>(tool: &str, input: &Value) -> Result<T> {
    serde_json::from_value(input.clone()).map_err(|e| {
        CoursewiseError::InvalidInput(format!("Invalid arguments for {}: {}", tool, e))
    })
}

/// Tools keyed by name, kept in registration order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its declared name.
    ///
    /// Re-registering a name replaces the earlier tool in place.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        let name = tool.definition().name;
        if name.trim().is_empty() {
            return Err(CoursewiseError::Config(
                "Tool definition must have a name".to_string(),
            ));
        }

        match self.by_name.get(&name).copied() {
            Some(slot) => self.tools[slot] = Box::new(tool),
            None => {
                self.by_name.insert(name.clone(), self.tools.len());
                self.tools.push(Box::new(tool));
            }
        }
        debug!("Registered tool: {}", name);
        Ok(())
    }

    /// Definitions in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.definition().name).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Run the named tool. An unknown name is answered with text, not an error.
    pub async fn execute(&self, name: &str, input: &Value) -> Result<ToolOutput> {
        match self.by_name.get(name) {
            Some(&slot) => self.tools[slot].execute(input).await,
            None => Ok(ToolOutput::text(format!("Tool '{}' not found", name))),
        }
    }
}
