use anyhow::{Context, Result};
use async_trait::async_trait;
use llm::builder::{LLMBackend, LLMBuilder};
use llm::chat::{ChatMessage, ChatRole, FunctionTool, MessageType, Tool as LlmTool};
use tokio::time::{Duration, timeout};
use tracing::warn;

use super::{LlmProvider, LlmResponse, Message, MessageRole, ToolCall};
use crate::error::ConfigError;
use crate::tools::Tool;

const API_TIMEOUT_SECS: u64 = 120;

/// Gemini provider backed by the llm crate's Google backend.
///
/// Routing decisions must be reproducible, so the temperature is pinned to 0.
pub struct GeminiProvider {
    model: String,
    api_key: String,
}

impl GeminiProvider {
    /// Create a provider for the given Gemini model.
    ///
    /// Reads the API key from `GEMINI_API_KEY`, falling back to
    /// `GOOGLE_API_KEY`. Missing keys are a configuration error and fatal at
    /// startup.
    pub fn new(model: impl Into<String>) -> Result<Self, ConfigError> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("GOOGLE_API_KEY"))
            .map_err(|_| ConfigError::MissingApiKey)?;
        Ok(Self {
            model: model.into(),
            api_key,
        })
    }

    /// Create a provider using Gemini 2.5 Pro
    pub fn pro() -> Result<Self, ConfigError> {
        Self::new("gemini-2.5-pro")
    }

    /// Create a provider using Gemini 2.5 Flash
    pub fn flash() -> Result<Self, ConfigError> {
        Self::new("gemini-2.5-flash")
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn chat(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[&dyn Tool],
    ) -> Result<LlmResponse> {
        let llm_tools: Vec<LlmTool> = tools
            .iter()
            .map(|t| LlmTool {
                tool_type: "function".to_string(),
                function: FunctionTool {
                    name: t.name().to_string(),
                    description: t.description().to_string(),
                    parameters: t.schema(),
                },
                cache_control: None,
            })
            .collect();

        // The llm crate fixes tools at build time, so the client is rebuilt
        // per call.
        let mut builder = LLMBuilder::new()
            .backend(LLMBackend::Google)
            .api_key(&self.api_key)
            .model(&self.model)
            .system(system)
            .temperature(0.0)
            .max_tokens(8192);

        for tool in &llm_tools {
            builder = builder.function(
                llm::builder::FunctionBuilder::new(&tool.function.name)
                    .description(&tool.function.description)
                    .json_schema(tool.function.parameters.clone()),
            );
        }

        let client = builder.build().context("failed to build Gemini client")?;

        let chat_messages: Vec<ChatMessage> =
            messages.iter().filter_map(to_chat_message).collect();

        let api_timeout = Duration::from_secs(API_TIMEOUT_SECS);
        let response = if llm_tools.is_empty() {
            timeout(api_timeout, client.chat(&chat_messages))
                .await
                .with_context(|| format!("Gemini API call timed out after {API_TIMEOUT_SECS} seconds"))?
                .context("failed to call Gemini API")?
        } else {
            timeout(
                api_timeout,
                client.chat_with_tools(&chat_messages, Some(&llm_tools)),
            )
            .await
            .with_context(|| format!("Gemini API call timed out after {API_TIMEOUT_SECS} seconds"))?
            .context("failed to call Gemini API with tools")?
        };

        let content = response.text().unwrap_or_else(|| {
            warn!("Gemini API returned empty or missing response text");
            String::new()
        });

        let tool_calls = response
            .tool_calls()
            .map(|calls| {
                calls
                    .iter()
                    .map(|tc| ToolCall {
                        id: tc.id.clone(),
                        name: tc.function.name.clone(),
                        arguments: serde_json::from_str(&tc.function.arguments).unwrap_or_else(
                            |e| {
                                warn!(error = %e, "failed to parse tool call arguments as JSON");
                                serde_json::Value::Null
                            },
                        ),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(LlmResponse {
            message: Message::assistant(content),
            tool_calls,
        })
    }
}

/// Convert one of our messages into the llm crate's wire shape.
///
/// System messages return `None` since the system instruction is passed
/// separately at build time.
fn to_chat_message(msg: &Message) -> Option<ChatMessage> {
    match msg.role {
        MessageRole::User => Some(ChatMessage {
            role: ChatRole::User,
            message_type: MessageType::Text,
            content: msg.text(),
        }),
        MessageRole::Assistant => {
            if msg.tool_calls.is_empty() {
                Some(ChatMessage {
                    role: ChatRole::Assistant,
                    message_type: MessageType::Text,
                    content: msg.text(),
                })
            } else {
                let tool_calls: Vec<llm::ToolCall> = msg
                    .tool_calls
                    .iter()
                    .map(|tc| llm::ToolCall {
                        id: tc.id.clone(),
                        call_type: "function".to_string(),
                        function: llm::FunctionCall {
                            name: tc.name.clone(),
                            arguments: tc.arguments.to_string(),
                        },
                    })
                    .collect();
                Some(ChatMessage {
                    role: ChatRole::Assistant,
                    message_type: MessageType::ToolUse(tool_calls),
                    content: msg.text(),
                })
            }
        }
        MessageRole::Tool => msg.tool_result.as_ref().map(|result| {
            let tool_call = llm::ToolCall {
                id: result.tool_call_id.clone(),
                call_type: "function".to_string(),
                function: llm::FunctionCall {
                    name: String::new(),
                    arguments: result.result.clone(),
                },
            };
            ChatMessage {
                role: ChatRole::User,
                message_type: MessageType::ToolResult(vec![tool_call]),
                content: String::new(),
            }
        }),
        MessageRole::System => None,
    }
}
