use serde::{Deserialize, Serialize};

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// The role of who sent this message
    pub role: MessageRole,
    /// The content of the message
    pub content: MessageContent,
    /// Tool calls made by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Tool results (if this is a tool response)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_result: Option<ToolResult>,
}

impl Message {
    /// Create a user message
    pub fn user(content: impl Into<MessageContent>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_result: None,
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<MessageContent>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_result: None,
        }
    }

    /// Create an assistant message with tool calls
    pub fn assistant_with_tools(
        content: impl Into<MessageContent>,
        tool_calls: Vec<ToolCall>,
    ) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            tool_calls,
            tool_result: None,
        }
    }

    /// Create a tool result message
    pub fn tool_result(tool_call_id: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: MessageContent::Text(String::new()),
            tool_calls: Vec::new(),
            tool_result: Some(ToolResult {
                tool_call_id: tool_call_id.into(),
                result: result.into(),
            }),
        }
    }

    /// Plain-text rendering of the message content.
    pub fn text(&self) -> String {
        self.content.as_text()
    }
}

/// The role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message from the user
    User,
    /// Message from the assistant
    Assistant,
    /// Message containing tool output
    Tool,
    /// System prompt
    System,
}

/// Message content, either plain text or a sequence of typed segments.
///
/// Model replies are usually plain text, but some backends return a list of
/// mixed segments. Both shapes normalize to plain text through
/// [`MessageContent::as_text`], which every consumer goes through.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Segments(Vec<Segment>),
}

/// One part of a segmented message payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    /// Segment kind, e.g. "text" or "image"
    #[serde(default)]
    pub kind: String,
    /// Textual payload, present for text segments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl MessageContent {
    /// Normalize to plain text.
    ///
    /// Segmented payloads concatenate their textual segments in order,
    /// separated by single spaces. A segment list with no extractable text
    /// falls back to its raw JSON form.
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Segments(segments) => {
                let parts: Vec<&str> = segments.iter().filter_map(|s| s.text.as_deref()).collect();
                if parts.is_empty() {
                    serde_json::to_string(segments).unwrap_or_default()
                } else {
                    parts.join(" ")
                }
            }
        }
    }

    /// True when there is no textual payload at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::Segments(segments) => segments.iter().all(|s| s.text.is_none()),
        }
    }
}

impl From<String> for MessageContent {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for MessageContent {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// A tool call made by the assistant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this tool call
    pub id: String,
    /// Name of the tool to call
    pub name: String,
    /// Arguments to pass to the tool (as JSON)
    pub arguments: serde_json::Value,
}

/// Result of a tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// ID of the tool call this is a response to
    pub tool_call_id: String,
    /// The result of the tool execution
    pub result: String,
}
