//! Anthropic Messages API backend.

use super::{
    ContentItem, ConversationMessage, ModelBackend, ModelRequest, ModelResponse, Role,
    ToolChoice, ToolDefinition, ToolInvocation,
};
use crate::config::BackendSettings;
use crate::error::{CoursewiseError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    system: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<WireToolChoice>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: Role,
    content: Vec<WireBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        is_error: bool,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Serialize)]
struct WireTool {
    name: String,
    description: String,
    input_schema: Value,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WireToolChoice {
    Auto,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    content: Vec<WireBlock>,
}

impl From<&ContentItem> for WireBlock {
    fn from(item: &ContentItem) -> Self {
        match item {
            ContentItem::Text { text } => WireBlock::Text { text: text.clone() },
            ContentItem::ToolInvocation(inv) => WireBlock::ToolUse {
                id: inv.id.clone(),
                name: inv.name.clone(),
                input: inv.input.clone(),
            },
            ContentItem::ToolResult(res) => WireBlock::ToolResult {
                tool_use_id: res.invocation_id.clone(),
                content: res.content.clone(),
                is_error: res.is_error,
            },
        }
    }
}

impl From<&ConversationMessage> for WireMessage {
    fn from(message: &ConversationMessage) -> Self {
        Self {
            role: message.role,
            content: message.content.iter().map(WireBlock::from).collect(),
        }
    }
}

impl From<&ToolDefinition> for WireTool {
    fn from(def: &ToolDefinition) -> Self {
        Self {
            name: def.name.clone(),
            description: def.description.clone(),
            input_schema: def.input_schema(),
        }
    }
}

fn to_wire(request: &ModelRequest) -> WireRequest {
    WireRequest {
        model: request.model.clone(),
        max_tokens: request.max_output_tokens,
        temperature: request.temperature,
        system: request.system_prompt.clone(),
        messages: request.messages.iter().map(WireMessage::from).collect(),
        tools: request
            .tools
            .as_ref()
            .map(|tools| tools.iter().map(WireTool::from).collect()),
        tool_choice: request.tool_choice.map(|choice| match choice {
            ToolChoice::Auto => WireToolChoice::Auto,
        }),
    }
}

fn from_wire(response: WireResponse) -> ModelResponse {
    let content = response
        .content
        .into_iter()
        .filter_map(|block| match block {
            WireBlock::Text { text } => Some(ContentItem::Text { text }),
            WireBlock::ToolUse { id, name, input } => {
                Some(ContentItem::ToolInvocation(ToolInvocation { id, name, input }))
            }
            WireBlock::ToolResult { .. } | WireBlock::Other => None,
        })
        .collect();
    ModelResponse { content }
}

/// Backend calling the Anthropic Messages API over HTTP.
pub struct AnthropicBackend {
    client: Client,
    api_key: String,
    base_url: String,
}

impl AnthropicBackend {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create a backend reading the API key from `settings.api_key_env`.
    pub fn from_settings(settings: &BackendSettings) -> Result<Self> {
        let api_key = std::env::var(&settings.api_key_env).map_err(|_| {
            CoursewiseError::Config(format!(
                "Environment variable {} is not set",
                settings.api_key_env
            ))
        })?;
        Ok(Self::new(api_key, settings.base_url.clone()))
    }
}

#[async_trait]
impl ModelBackend for AnthropicBackend {
    fn name(&self) -> &str {
        "anthropic"
    }

    #[instrument(skip(self, request), fields(model = %request.model, messages = request.messages.len()))]
    async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse> {
        let body = to_wire(request);

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(CoursewiseError::Backend(format!(
                "Anthropic API returned {}: {}",
                status, text
            )));
        }

        let wire: WireResponse = response.json().await?;
        debug!("Received {} content blocks", wire.content.len());
        Ok(from_wire(wire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ToolResult;
    use serde_json::json;

    fn request(tools: Option<Vec<ToolDefinition>>) -> ModelRequest {
        let base = ModelRequest {
            model: "claude-test".to_string(),
            temperature: 0.0,
            max_output_tokens: 800,
            system_prompt: "system".to_string(),
            messages: vec![
                ConversationMessage::user_text("What is RAG?"),
                ConversationMessage::assistant_tool_use(
                    "",
                    &[ToolInvocation {
                        id: "toolu_1".to_string(),
                        name: "search_course_content".to_string(),
                        input: json!({"query": "rag"}),
                    }],
                ),
                ConversationMessage::tool_results(vec![ToolResult {
                    invocation_id: "toolu_1".to_string(),
                    content: "[Intro]\ntext".to_string(),
                    is_error: false,
                }]),
            ],
            tools: None,
            tool_choice: None,
        };
        match tools {
            Some(t) => base.with_tools(t),
            None => base,
        }
    }

    #[test]
    fn test_wire_request_with_tools() {
        let def = ToolDefinition::new("search_course_content", "Search").param(
            "query",
            "string",
            "q",
            true,
        );
        let wire = serde_json::to_value(to_wire(&request(Some(vec![def])))).unwrap();

        assert_eq!(wire["max_tokens"], 800);
        assert_eq!(wire["system"], "system");
        assert_eq!(wire["tool_choice"], json!({"type": "auto"}));
        assert_eq!(wire["tools"][0]["name"], "search_course_content");
        assert_eq!(wire["tools"][0]["input_schema"]["required"], json!(["query"]));
        assert_eq!(wire["messages"][1]["role"], "assistant");
        assert_eq!(
            wire["messages"][1]["content"][0],
            json!({"type": "tool_use", "id": "toolu_1", "name": "search_course_content", "input": {"query": "rag"}})
        );
        assert_eq!(
            wire["messages"][2]["content"][0],
            json!({"type": "tool_result", "tool_use_id": "toolu_1", "content": "[Intro]\ntext", "is_error": false})
        );
    }

    #[test]
    fn test_wire_request_without_tools_omits_fields() {
        let wire = serde_json::to_value(to_wire(&request(None))).unwrap();
        assert!(wire.get("tools").is_none());
        assert!(wire.get("tool_choice").is_none());
    }

    #[test]
    fn test_parse_response_blocks() {
        let wire: WireResponse = serde_json::from_value(json!({
            "id": "msg_1",
            "stop_reason": "tool_use",
            "content": [
                {"type": "thinking", "thinking": "hmm"},
                {"type": "text", "text": "Searching."},
                {"type": "tool_use", "id": "toolu_9", "name": "get_course_outline", "input": {"course_title": "MCP"}}
            ]
        }))
        .unwrap();

        let response = from_wire(wire);
        assert_eq!(response.content.len(), 2);
        assert_eq!(response.first_text(), Some("Searching."));
        let invocations = response.tool_invocations();
        assert_eq!(invocations[0].id, "toolu_9");
        assert_eq!(invocations[0].input["course_title"], "MCP");
    }
}
