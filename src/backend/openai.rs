//! OpenAI chat-completions backend.
//!
//! Tool results travel as one `tool` message each, in the same order as the
//! invocations of the preceding assistant message.

use super::{
    ContentItem, ConversationMessage, ModelBackend, ModelRequest, ModelResponse, Role,
    ToolChoice, ToolDefinition, ToolInvocation,
};
use crate::config::BackendSettings;
use crate::error::{CoursewiseError, Result};
use crate::openai::create_client_with_timeout;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionTool, ChatCompletionToolChoiceOption, ChatCompletionToolType,
    CreateChatCompletionRequestArgs, FunctionCall, FunctionObject,
};
use async_trait::async_trait;
use std::time::Duration;
use serde_json::Value;
use tracing::{debug, instrument, warn};

fn build_err(e: impl std::fmt::Display) -> CoursewiseError {
    CoursewiseError::Backend(format!("Failed to build chat request: {}", e))
}

fn text_of(message: &ConversationMessage) -> String {
    message
        .content
        .iter()
        .filter_map(|item| match item {
            ContentItem::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Translate the system prompt and conversation into chat messages.
fn to_chat_messages(
    system_prompt: &str,
    messages: &[ConversationMessage],
) -> Result<Vec<ChatCompletionRequestMessage>> {
    let mut out: Vec<ChatCompletionRequestMessage> = vec![
        ChatCompletionRequestSystemMessageArgs::default()
            .content(system_prompt.to_string())
            .build()
            .map_err(build_err)?
            .into(),
    ];

    for message in messages {
        match message.role {
            Role::Assistant => {
                let tool_calls: Vec<ChatCompletionMessageToolCall> = message
                    .content
                    .iter()
                    .filter_map(|item| match item {
                        ContentItem::ToolInvocation(inv) => Some(ChatCompletionMessageToolCall {
                            id: inv.id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: FunctionCall {
                                name: inv.name.clone(),
                                arguments: arguments_of(&inv.input),
                            },
                        }),
                        _ => None,
                    })
                    .collect();

                let mut args = ChatCompletionRequestAssistantMessageArgs::default();
                let text = text_of(message);
                if !text.is_empty() {
                    args.content(text);
                }
                if !tool_calls.is_empty() {
                    args.tool_calls(tool_calls);
                }
                out.push(args.build().map_err(build_err)?.into());
            }
            Role::User => {
                let text = text_of(message);
                if !text.is_empty() {
                    out.push(
                        ChatCompletionRequestUserMessageArgs::default()
                            .content(text)
                            .build()
                            .map_err(build_err)?
                            .into(),
                    );
                }
                for item in &message.content {
                    if let ContentItem::ToolResult(result) = item {
                        out.push(
                            ChatCompletionRequestToolMessageArgs::default()
                                .tool_call_id(result.invocation_id.clone())
                                .content(result.content.clone())
                                .build()
                                .map_err(build_err)?
                                .into(),
                        );
                    }
                }
            }
        }
    }

    Ok(out)
}

fn to_chat_tool(def: &ToolDefinition) -> ChatCompletionTool {
    ChatCompletionTool {
        r#type: ChatCompletionToolType::Function,
        function: FunctionObject {
            name: def.name.clone(),
            description: Some(def.description.clone()),
            parameters: Some(def.input_schema()),
            strict: None,
        },
    }
}

/// Arguments text for a recorded invocation. Unparseable arguments were kept
/// as a raw string and go back verbatim.
fn arguments_of(input: &Value) -> String {
    match input {
        Value::String(raw) => raw.clone(),
        other => other.to_string(),
    }
}

/// Translate an assistant reply back into content items.
///
/// Arguments that are not valid JSON stay on the invocation as a raw string,
/// so the tool rejects them and the model sees an error result.
fn from_chat_reply(
    content: Option<String>,
    tool_calls: Option<Vec<ChatCompletionMessageToolCall>>,
) -> ModelResponse {
    let mut items = Vec::new();
    if let Some(text) = content.filter(|t| !t.is_empty()) {
        items.push(ContentItem::Text { text });
    }
    for call in tool_calls.unwrap_or_default() {
        let input = match serde_json::from_str(&call.function.arguments) {
            Ok(input) => input,
            Err(e) => {
                warn!("Unparseable arguments for tool call {}: {}", call.id, e);
                Value::String(call.function.arguments)
            }
        };
        items.push(ContentItem::ToolInvocation(ToolInvocation {
            id: call.id,
            name: call.function.name,
            input,
        }));
    }
    ModelResponse { content: items }
}

/// Backend calling OpenAI chat completions.
pub struct OpenAIBackend {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
}

impl OpenAIBackend {
    pub fn from_settings(settings: &BackendSettings) -> Result<Self> {
        Ok(Self {
            client: create_client_with_timeout(Duration::from_secs(settings.timeout_secs))?,
        })
    }
}

#[async_trait]
impl ModelBackend for OpenAIBackend {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(skip(self, request), fields(model = %request.model, messages = request.messages.len()))]
    async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&request.model)
            .messages(to_chat_messages(&request.system_prompt, &request.messages)?)
            .temperature(request.temperature)
            .max_completion_tokens(request.max_output_tokens);

        if let Some(tools) = &request.tools {
            args.tools(tools.iter().map(to_chat_tool).collect::<Vec<_>>());
        }
        if let Some(ToolChoice::Auto) = request.tool_choice {
            args.tool_choice(ChatCompletionToolChoiceOption::Auto);
        }

        let chat_request = args.build().map_err(build_err)?;

        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(|e| CoursewiseError::OpenAI(format!("Chat API error: {}", e)))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CoursewiseError::Backend("No response from model".to_string()))?;

        debug!("Finish reason: {:?}", choice.finish_reason);
        Ok(from_chat_reply(choice.message.content, choice.message.tool_calls))
    }
}
