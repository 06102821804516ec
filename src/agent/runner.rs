//! Bounded tool-calling loop.

use super::tools::ToolRegistry;
use crate::backend::{
    ConversationMessage, ModelBackend, ModelRequest, ModelResponse, ToolDefinition,
    ToolInvocation, ToolResult,
};
use crate::config::BackendSettings;
use crate::error::{CoursewiseError, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Rounds of tool use allowed before the forced tool-free answer.
pub const DEFAULT_MAX_ROUNDS: usize = 2;

const DEFAULT_TEMPERATURE: f32 = 0.0;
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 800;
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

/// Default system prompt for course questions.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an assistant for course materials and educational content, with tools for looking up course information.

Available tools:
1. search_course_content: search course materials by semantic similarity
   - Use for questions about specific content (topics, concepts, explanations)
   - Can be filtered by course and lesson
2. get_course_outline: get a course's structure and lesson list
   - Use for outline questions ("what lessons", "course structure")
   - Returns the course title, link, instructor and every lesson with its number and title

You may use tools for up to 2 rounds. Use the results of the first round to decide on further lookups or to answer.
If a tool fails, you may try a different query or filter in the next round.

Guidelines:
- Answer general knowledge questions without tools
- Base answers about course content on tool results
- If the tools return nothing relevant, say so plainly
- Give the answer directly, without describing your reasoning or the tools you used

Keep answers brief, accurate and clear, with an example when it helps understanding."#;

/// Heading placed before conversation history in the system prompt.
const HISTORY_HEADING: &str = "Previous conversation:";

/// Answer produced by [`ResponseOrchestrator::generate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    /// Citations gathered from tool runs, in order, without duplicates.
    pub sources: Vec<String>,
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of backend calls made.
    pub model_calls: usize,
}

/// Record of a tool call made while answering.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRecord {
    /// Name of the tool called.
    pub name: String,
    /// JSON arguments passed to the tool.
    pub arguments: String,
    /// Text handed back to the model.
    pub result: String,
    pub is_error: bool,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}

enum Phase {
    AwaitingModel,
    ToolsPending(Vec<ToolInvocation>),
    Terminal(String),
}

#[derive(Default)]
struct Trace {
    model_calls: usize,
    tool_calls: Vec<ToolCallRecord>,
    sources: Vec<String>,
}

impl Trace {
    fn add_sources(&mut self, sources: Vec<String>) {
        for source in sources {
            if !self.sources.contains(&source) {
                self.sources.push(source);
            }
        }
    }

    fn finish(self, text: String) -> Answer {
        Answer {
            text,
            sources: self.sources,
            tool_calls: self.tool_calls,
            model_calls: self.model_calls,
        }
    }
}

/// Drives model calls and tool execution for one question at a time.
pub struct ResponseOrchestrator {
    backend: Arc<dyn ModelBackend>,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
    max_rounds: usize,
    call_timeout: Duration,
    system_prompt: String,
}

impl ResponseOrchestrator {
    pub fn new(backend: Arc<dyn ModelBackend>, model: &str) -> Self {
        Self {
            backend,
            model: model.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            max_rounds: DEFAULT_MAX_ROUNDS,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    pub fn from_settings(backend: Arc<dyn ModelBackend>, settings: &BackendSettings) -> Self {
        let orchestrator = Self::new(backend, &settings.model)
            .with_temperature(settings.temperature)
            .with_max_output_tokens(settings.max_output_tokens)
            .with_max_rounds(settings.max_tool_rounds)
            .with_call_timeout(Duration::from_secs(settings.timeout_secs));

        match &settings.system_prompt {
            Some(prompt) => orchestrator.with_system_prompt(prompt),
            None => orchestrator,
        }
    }

    /// Set a custom system prompt.
    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = prompt.to_string();
        self
    }

    /// Set the number of tool rounds. Zero disables tools.
    pub fn with_max_rounds(mut self, rounds: usize) -> Self {
        self.max_rounds = rounds;
        self
    }

    /// Set the timeout applied to each backend call.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = tokens;
        self
    }

    /// Answer `query`, letting the model use `tools` for at most `max_rounds`
    /// rounds.
    ///
    /// Without tools this is a single call. With tools, each round calls the
    /// model and runs any invocations it requests; once the round cap is hit
    /// one last call is made without tools so the model has to answer. Tool
    /// failures are reported back to the model; backend failures abort.
    #[instrument(skip(self, query, history, tools), fields(model = %self.model))]
    pub async fn generate(
        &self,
        query: &str,
        history: Option<&str>,
        tools: Option<&ToolRegistry>,
    ) -> Result<Answer> {
        let system = self.system_content(history);
        let mut messages = vec![ConversationMessage::user_text(query)];
        let mut trace = Trace::default();

        let registry = match tools {
            Some(registry) if !registry.is_empty() && self.max_rounds > 0 => registry,
            _ => {
                let response = self
                    .call(self.request(&system, &messages, None), &mut trace)
                    .await?;
                let text = response
                    .first_text()
                    .ok_or_else(|| {
                        CoursewiseError::Backend("Empty response from model".to_string())
                    })?
                    .to_string();
                return Ok(trace.finish(text));
            }
        };

        let definitions = registry.definitions();
        let mut round = 1;
        let mut phase = Phase::AwaitingModel;

        loop {
            phase = match phase {
                Phase::AwaitingModel => {
                    info!("Tool round {}/{}", round, self.max_rounds);
                    let request = self.request(&system, &messages, Some(definitions.clone()));
                    let response = self.call(request, &mut trace).await?;
                    let text = response.first_text().unwrap_or_default().to_string();
                    let invocations = response.tool_invocations();

                    if invocations.is_empty() {
                        Phase::Terminal(text)
                    } else {
                        messages.push(ConversationMessage::assistant_tool_use(&text, &invocations));
                        Phase::ToolsPending(invocations)
                    }
                }
                Phase::ToolsPending(invocations) => {
                    let results = self.run_tools(registry, &invocations, &mut trace).await;
                    messages.push(ConversationMessage::tool_results(results));

                    if round >= self.max_rounds {
                        break;
                    }
                    round += 1;
                    Phase::AwaitingModel
                }
                Phase::Terminal(text) => {
                    debug!("Model answered after {} rounds", round);
                    return Ok(trace.finish(text));
                }
            };
        }

        info!(
            "Reached {} tool rounds, requesting final answer",
            self.max_rounds
        );
        let response = self
            .call(self.request(&system, &messages, None), &mut trace)
            .await?;
        let text = response.first_text().unwrap_or_default().to_string();
        Ok(trace.finish(text))
    }

    fn system_content(&self, history: Option<&str>) -> String {
        match history {
            Some(h) if !h.is_empty() => {
                format!("{}\n\n{}\n{}", self.system_prompt, HISTORY_HEADING, h)
            }
            _ => self.system_prompt.clone(),
        }
    }

    fn request(
        &self,
        system: &str,
        messages: &[ConversationMessage],
        tools: Option<Vec<ToolDefinition>>,
    ) -> ModelRequest {
        let request = ModelRequest {
            model: self.model.clone(),
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
            system_prompt: system.to_string(),
            messages: messages.to_vec(),
            tools: None,
            tool_choice: None,
        };
        match tools {
            Some(defs) => request.with_tools(defs),
            None => request,
        }
    }

    async fn call(&self, request: ModelRequest, trace: &mut Trace) -> Result<ModelResponse> {
        trace.model_calls += 1;
        debug!(
            "Calling {} (call {}, tools: {})",
            self.backend.name(),
            trace.model_calls,
            request.tools.is_some()
        );
        tokio::time::timeout(self.call_timeout, self.backend.complete(&request))
            .await
            .map_err(|_| CoursewiseError::BackendTimeout(self.call_timeout.as_secs()))?
    }

    /// Run invocations one after another, in the order requested.
    async fn run_tools(
        &self,
        registry: &ToolRegistry,
        invocations: &[ToolInvocation],
        trace: &mut Trace,
    ) -> Vec<ToolResult> {
        let mut results = Vec::with_capacity(invocations.len());

        for invocation in invocations {
            info!("Executing tool: {} with args: {}", invocation.name, invocation.input);

            let (content, is_error) = match registry.execute(&invocation.name, &invocation.input).await {
                Ok(output) => {
                    trace.add_sources(output.sources);
                    (output.content, false)
                }
                Err(e) => {
                    warn!("Tool {} failed: {}", invocation.name, e);
                    (format!("error: {}", e), true)
                }
            };

            trace.tool_calls.push(ToolCallRecord {
                name: invocation.name.clone(),
                arguments: invocation.input.to_string(),
                result: content.clone(),
                is_error,
            });
            results.push(ToolResult {
                invocation_id: invocation.id.clone(),
                content,
                is_error,
            });
        }

        results
    }
}
