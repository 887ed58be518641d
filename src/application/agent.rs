use crate::application::tooling::{ListingConnection, ServerToolInfo, ToolInvokeError};
use crate::infrastructure::model::{ModelClient, ModelError, ModelRequest};
use crate::types::ChatMessage;
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

const DEFAULT_MAX_STEPS: usize = 8;

/// One tool invocation performed during an agent run.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AgentStep {
    pub tool: String,
    #[schema(value_type = Object)]
    pub input: Value,
    pub success: bool,
    #[schema(value_type = Object)]
    pub output: Value,
    pub message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AgentOutcome {
    pub response: String,
    pub steps: Vec<AgentStep>,
}

#[derive(Debug, Clone)]
pub struct AgentOptions {
    pub model: String,
    pub system_prompt: Option<String>,
    pub max_steps: usize,
}

impl AgentOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: None,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt;
        self
    }
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Tool(#[from] ToolInvokeError),
    #[error("unknown tool requested: {0}")]
    UnknownTool(String),
    #[error("invalid agent response: {0}")]
    InvalidResponse(String),
    #[error("agent exceeded the limit of {0} tool interactions")]
    StepLimit(usize),
}

impl AgentError {
    pub fn user_message(&self) -> String {
        match self {
            AgentError::Model(err) => err.user_message(),
            AgentError::Tool(err) => err.user_message(),
            AgentError::UnknownTool(name) => {
                format!("The model asked for a tool named \"{name}\" that the search server does not provide.")
            }
            AgentError::InvalidResponse(_) => {
                "The model gave a response that could not be interpreted. Try rephrasing the query."
                    .to_string()
            }
            AgentError::StepLimit(limit) => {
                format!("The search did not finish within {limit} tool calls.")
            }
        }
    }
}

/// Pairs a hosted model with the tools of one live listing connection. The
/// model is driven through a JSON directive protocol: each reply either calls
/// a tool or delivers the final markdown answer.
pub struct Agent<'a, M: ModelClient, C: ListingConnection> {
    model: &'a M,
    connection: &'a C,
    options: AgentOptions,
}

impl<'a, M: ModelClient, C: ListingConnection> Agent<'a, M, C> {
    pub fn new(model: &'a M, connection: &'a C, options: AgentOptions) -> Self {
        Self {
            model,
            connection,
            options,
        }
    }

    pub async fn run(&self, prompt: String) -> Result<AgentOutcome, AgentError> {
        info!("Agent run started");
        let catalogue = self.connection.tools().await;
        let server_instructions = self.connection.instructions().await;
        let system_prompt = compose_system_prompt(
            &catalogue,
            server_instructions.as_deref(),
            self.options.system_prompt.as_deref(),
        );

        let mut messages = vec![
            ChatMessage::system(system_prompt),
            ChatMessage::user(initial_user_prompt(&prompt)),
        ];
        let mut steps: Vec<AgentStep> = Vec::new();
        let mut remaining_steps = self.options.max_steps;

        loop {
            debug!(remaining_steps, "Submitting agent turn to model provider");
            let response = self
                .model
                .chat(ModelRequest {
                    model: self.options.model.clone(),
                    messages: messages.clone(),
                })
                .await?;
            let content = response.message.content.clone();
            messages.push(response.message);

            match parse_directive(&content)? {
                AgentDirective::Final { response } => {
                    info!(steps = steps.len(), "Agent returned final response");
                    return Ok(AgentOutcome { response, steps });
                }
                AgentDirective::CallTool { tool, input } => {
                    if remaining_steps == 0 {
                        warn!("Agent exceeded max tool interactions");
                        return Err(AgentError::StepLimit(self.options.max_steps));
                    }
                    remaining_steps -= 1;

                    let step = self.execute_tool(&catalogue, &tool, input).await?;
                    info!(tool = %step.tool, success = step.success, "Tool step executed");
                    messages.push(ChatMessage::user(
                        json!({
                            "tool_result": {
                                "tool": step.tool,
                                "input": step.input,
                                "success": step.success,
                                "output": step.output,
                                "message": step.message,
                            }
                        })
                        .to_string(),
                    ));
                    steps.push(step);
                }
            }
        }
    }

    async fn execute_tool(
        &self,
        catalogue: &[ServerToolInfo],
        tool: &str,
        input: Value,
    ) -> Result<AgentStep, AgentError> {
        let known = catalogue
            .iter()
            .find(|info| info.name.eq_ignore_ascii_case(tool))
            .ok_or_else(|| {
                warn!(requested_tool = %tool, "Unknown tool requested by agent");
                AgentError::UnknownTool(tool.to_string())
            })?;

        match self.connection.call_tool(&known.name, input.clone()).await {
            Ok(result) => {
                // MCP marks tool-level failures inside the result payload
                let failed = result
                    .get("isError")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                let output = match result_text(&result) {
                    Some(text) => Value::String(text),
                    None => result,
                };
                Ok(AgentStep {
                    tool: known.name.clone(),
                    input,
                    success: !failed,
                    output,
                    message: None,
                })
            }
            // An RPC rejection is fed back so the model can adjust its
            // arguments; transport-level failures mean the connection is gone.
            Err(ToolInvokeError::Rpc { message, .. }) => Ok(AgentStep {
                tool: known.name.clone(),
                input,
                success: false,
                output: Value::Null,
                message: Some(message),
            }),
            Err(err) => Err(AgentError::Tool(err)),
        }
    }
}

fn compose_system_prompt(
    catalogue: &[ServerToolInfo],
    server_instructions: Option<&str>,
    custom: Option<&str>,
) -> String {
    let mut lines = vec![
        "You are a travel assistant that finds lodging listings by calling tools.".to_string(),
        "All responses must be valid JSON without commentary or code fences.".to_string(),
        "When you need to invoke a tool, respond with: {\"action\":\"call_tool\",\"tool\":\"tool_name\",\"input\":{...}}.".to_string(),
        "When you are ready to give the final answer to the user, respond with: {\"action\":\"final\",\"response\":\"...\"}.".to_string(),
        "Format the final response text as Markdown.".to_string(),
    ];

    if catalogue.is_empty() {
        lines.push("No tools are currently available.".to_string());
    } else {
        lines.push("Available tools:".to_string());
        for tool in catalogue {
            let description = tool
                .description
                .as_deref()
                .unwrap_or("No description provided.");
            lines.push(format!("- {}: {}", tool.name, description));
        }
    }

    if let Some(instructions) = server_instructions {
        lines.push(format!("Tool server guidance: {}", instructions.trim()));
    }
    if let Some(custom) = custom {
        if !custom.trim().is_empty() {
            lines.push(custom.trim().to_string());
        }
    }

    lines.join(" ")
}

fn initial_user_prompt(prompt: &str) -> String {
    format!(
        "{{\"action\":\"user_request\",\"prompt\":{}}}",
        serde_json::to_string(prompt).unwrap_or_else(|_| "\"\"".to_string())
    )
}

/// Flatten the text entries of an MCP `content` array into one string.
fn result_text(result: &Value) -> Option<String> {
    let entries = result.get("content")?.as_array()?;
    let texts: Vec<&str> = entries
        .iter()
        .filter(|entry| entry.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|entry| entry.get("text").and_then(Value::as_str))
        .collect();
    if texts.is_empty() {
        None
    } else {
        Some(texts.join("\n"))
    }
}

#[derive(Debug)]
enum AgentDirective {
    Final { response: String },
    CallTool { tool: String, input: Value },
}

fn parse_directive(content: &str) -> Result<AgentDirective, AgentError> {
    if let Some(value) = extract_json(content) {
        return parse_directive_value(value);
    }
    // Models occasionally skip the protocol for the last reply; treat bare
    // text as the final answer.
    Ok(AgentDirective::Final {
        response: content.trim().to_string(),
    })
}

fn parse_directive_value(value: Value) -> Result<AgentDirective, AgentError> {
    let Some(action) = value.get("action").and_then(Value::as_str) else {
        return Err(AgentError::InvalidResponse(
            "missing action field in agent response".into(),
        ));
    };
    match action {
        "call_tool" => {
            let tool = value
                .get("tool")
                .or_else(|| value.get("tool_name"))
                .or_else(|| value.get("name"))
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    AgentError::InvalidResponse("tool name missing in call_tool action".into())
                })?;
            let input = value
                .get("input")
                .or_else(|| value.get("arguments"))
                .cloned()
                .unwrap_or(Value::Null);
            Ok(AgentDirective::CallTool {
                tool: tool.to_string(),
                input,
            })
        }
        "final" => {
            let response = value
                .get("response")
                .or_else(|| value.get("answer"))
                .or_else(|| value.get("content"))
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    AgentError::InvalidResponse("final action missing response field".into())
                })?;
            Ok(AgentDirective::Final {
                response: response.to_string(),
            })
        }
        other => Err(AgentError::InvalidResponse(format!(
            "unknown action value: {other}"
        ))),
    }
}

fn extract_json(content: &str) -> Option<Value> {
    let trimmed = content.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    if trimmed.starts_with("```") {
        let stripped = trimmed.trim_start_matches("```json");
        let stripped = stripped.trim_start_matches("```JSON");
        let stripped = stripped.trim_start_matches("```");
        if let Some(end) = stripped.rfind("```") {
            let slice = &stripped[..end];
            if let Ok(value) = serde_json::from_str::<Value>(slice.trim()) {
                return Some(value);
            }
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            let candidate = &trimmed[start..=end];
            if let Ok(value) = serde_json::from_str::<Value>(candidate) {
                return Some(value);
            }
        }
    }

    None
}
