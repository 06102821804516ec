//! Model backend contract.
//!
//! Conversations are sequences of [`ConversationMessage`]s whose content is a
//! list of [`ContentItem`]s: plain text, tool invocations requested by the
//! model, or tool results sent back to it. Providers translate this shape to
//! and from their own wire formats.

mod anthropic;
mod openai;

pub use anthropic::AnthropicBackend;
pub use openai::OpenAIBackend;

use crate::config::{BackendProvider, BackendSettings};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Provider-assigned ID used to pair the result.
    pub id: String,
    /// Name of the tool to run.
    pub name: String,
    /// Arguments, as a JSON object.
    pub input: Value,
}

/// Outcome of one tool invocation, sent back to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// ID of the invocation this answers.
    pub invocation_id: String,
    pub content: String,
    pub is_error: bool,
}

/// One item of message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    Text { text: String },
    ToolInvocation(ToolInvocation),
    ToolResult(ToolResult),
}

impl ContentItem {
    pub fn text(text: impl Into<String>) -> Self {
        ContentItem::Text { text: text.into() }
    }
}

/// A message in the conversation sent to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: Vec<ContentItem>,
}

impl ConversationMessage {
    /// User message holding a single text item.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentItem::text(text)],
        }
    }

    /// Assistant message carrying optional text followed by tool invocations.
    pub fn assistant_tool_use(text: &str, invocations: &[ToolInvocation]) -> Self {
        let mut content = Vec::with_capacity(invocations.len() + 1);
        if !text.is_empty() {
            content.push(ContentItem::text(text));
        }
        content.extend(invocations.iter().cloned().map(ContentItem::ToolInvocation));
        Self {
            role: Role::Assistant,
            content,
        }
    }

    /// User message bundling tool results, in invocation order.
    pub fn tool_results(results: Vec<ToolResult>) -> Self {
        Self {
            role: Role::User,
            content: results.into_iter().map(ContentItem::ToolResult).collect(),
        }
    }

    /// Invocation IDs in this message, in order.
    pub fn invocation_ids(&self) -> Vec<&str> {
        self.content
            .iter()
            .filter_map(|item| match item {
                ContentItem::ToolInvocation(inv) => Some(inv.id.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Result IDs in this message, in order.
    pub fn result_ids(&self) -> Vec<&str> {
        self.content
            .iter()
            .filter_map(|item| match item {
                ContentItem::ToolResult(res) => Some(res.invocation_id.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// One parameter of a tool's input schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolParameter {
    pub name: String,
    /// JSON Schema type name, e.g. `string` or `integer`.
    pub kind: String,
    pub description: String,
    pub required: bool,
}

/// Definition of a tool as advertised to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ToolParameter>,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    /// Add a parameter.
    pub fn param(mut self, name: &str, kind: &str, description: &str, required: bool) -> Self {
        self.parameters.push(ToolParameter {
            name: name.to_string(),
            kind: kind.to_string(),
            description: description.to_string(),
            required,
        });
        self
    }

    /// JSON Schema object describing the parameters.
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    json!({ "type": p.kind, "description": p.description }),
                )
            })
            .collect();
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// How the model may use the tools it is offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolChoice {
    Auto,
}

/// A single call to the model backend.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub system_prompt: String,
    pub messages: Vec<ConversationMessage>,
    pub tools: Option<Vec<ToolDefinition>>,
    /// `Some` exactly when `tools` is.
    pub tool_choice: Option<ToolChoice>,
}

impl ModelRequest {
    /// Offer tools to the model with automatic tool choice.
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = Some(tools);
        self.tool_choice = Some(ToolChoice::Auto);
        self
    }
}

/// Content returned by the model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelResponse {
    pub content: Vec<ContentItem>,
}

impl ModelResponse {
    /// The first text item, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|item| match item {
            ContentItem::Text { text } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Tool invocations, in the order the model produced them.
    pub fn tool_invocations(&self) -> Vec<ToolInvocation> {
        self.content
            .iter()
            .filter_map(|item| match item {
                ContentItem::ToolInvocation(inv) => Some(inv.clone()),
                _ => None,
            })
            .collect()
    }
}

/// A language-model provider.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Perform one model call. Failures are not retried.
    async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse>;
}

/// Build the backend selected in the settings.
pub fn create_backend(settings: &BackendSettings) -> Result<Arc<dyn ModelBackend>> {
    match settings.provider {
        BackendProvider::Anthropic => Ok(Arc::new(AnthropicBackend::from_settings(settings)?)),
        BackendProvider::OpenAI => Ok(Arc::new(OpenAIBackend::from_settings(settings)?)),
    }
}
