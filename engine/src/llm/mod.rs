//! Chat Provider Abstraction Layer
//!
//! This module provides a common interface for the function-calling chat
//! providers (Gemini, OpenAI). The ChatProvider trait defines the
//! contract that all providers must implement, enabling the provider
//! router to fail over between them transparently.
//!
//! A provider is handed the system instruction, the fixed list of tool
//! schemas, and the conversation so far; it returns one [`ModelTurn`]:
//! text, requested tool calls, or both.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod gemini;
pub mod openai;
pub mod router;

/// Result type for chat operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during chat operations
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Message in a conversation history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role of the message sender (user, assistant, tool)
    pub role: MessageRole,

    /// Content of the message
    pub content: String,

    /// Tool calls carried by an assistant message
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// Tool call ID for tool result messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Tool name for tool result messages (Gemini pairs results by name)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            tool_name: None,
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            tool_name: None,
        }
    }

    /// Create an assistant message carrying requested tool calls
    /// (the text portion may be empty)
    pub fn assistant_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            tool_calls,
            tool_call_id: None,
            tool_name: None,
        }
    }

    /// Create a new tool result message answering `call`
    pub fn tool_result(content: impl Into<String>, call: &ToolCall) -> Self {
        Self {
            role: MessageRole::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(call.id.clone()),
            tool_name: Some(call.name.clone()),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User message
    User,

    /// Assistant message
    Assistant,

    /// Tool result message
    Tool,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::Tool => write!(f, "tool"),
        }
    }
}

/// Tool call request from the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// Unique identifier for this tool call
    pub id: String,

    /// Name of the operation to invoke
    pub name: String,

    /// Arguments to pass to the operation
    pub arguments: serde_json::Value,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// One chat round-trip's worth of model output.
///
/// Zero tool calls means the text is the final answer. One or more tool
/// calls means the orchestrator must execute them and feed the results
/// back; any accompanying text is an intermediate thought.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelTurn {
    /// Text portion of the turn, if any
    pub text: Option<String>,

    /// Tool invocations requested this turn
    pub tool_calls: Vec<ToolCall>,
}

impl ModelTurn {
    /// Create a turn holding only a final answer
    pub fn answer(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            tool_calls: Vec::new(),
        }
    }

    /// True when the turn requests no tool calls, i.e. the text is final
    pub fn is_final(&self) -> bool {
        self.tool_calls.is_empty()
    }
}

/// JSON-schema description of one operation advertised to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Operation name
    pub name: String,

    /// Human-readable description the model sees
    pub description: String,

    /// JSON schema for the arguments object
    pub parameters: serde_json::Value,
}

/// Chat provider trait that all providers must implement
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "gemini", "openai")
    fn name(&self) -> &str;

    /// Generate one model turn
    ///
    /// # Arguments
    /// * `system` - System instruction for the session
    /// * `tools` - Tool schemas the model may invoke
    /// * `messages` - Conversation so far (user/assistant/tool messages)
    ///
    /// # Returns
    /// * `Ok(ModelTurn)` - Model text and/or requested tool calls
    /// * `Err(LLMError)` - If the request fails
    async fn generate(
        &self,
        system: &str,
        tools: &[ToolSpec],
        messages: &[Message],
    ) -> Result<ModelTurn>;
}
