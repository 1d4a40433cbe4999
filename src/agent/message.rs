//! Vendor-neutral chat types.
//!
//! Flows build a [`ChatRequest`] from a system prompt and a rendered user
//! prompt; providers translate it to their SDK and hand back either a
//! [`ChatResponse`] or a stream of [`StreamFrame`]s.

use serde::{Deserialize, Serialize};

use super::tool::{ToolCall, ToolDefinition};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions.
    System,
    /// Rendered prompt.
    User,
    /// Model output.
    Assistant,
    /// Tool answer.
    Tool,
}

/// One conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author.
    pub role: Role,
    /// Text body.
    pub content: String,
    /// Calls requested by the assistant.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Call this tool message answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn plain(role: Role, content: &str) -> Self {
        Self {
            role,
            content: content.to_string(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

/// How the model may pick tools.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ToolChoice {
    /// Model decides.
    #[default]
    Auto,
    /// Tools are declared but must not be called.
    None,
}

/// A chat completion request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model identifier.
    pub model: String,
    /// Ordered messages.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Completion token cap.
    pub max_tokens: Option<u32>,
    /// Ask for a JSON object response.
    pub json_mode: bool,
    /// Stream the response.
    pub stream: bool,
    /// Declared tools.
    pub tools: Vec<ToolDefinition>,
    /// Tool selection policy, only sent when `tools` is non-empty.
    pub tool_choice: ToolChoice,
}

impl ChatRequest {
    /// Starts a request with a system and a user message.
    #[must_use]
    pub fn new(model: impl Into<String>, system: &str, user: &str) -> Self {
        Self {
            model: model.into(),
            messages: vec![system_message(system), user_message(user)],
            temperature: None,
            max_tokens: None,
            json_mode: false,
            stream: false,
            tools: Vec::new(),
            tool_choice: ToolChoice::Auto,
        }
    }

    /// Sets the temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the completion token cap.
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Requests a JSON object response.
    #[must_use]
    pub const fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }

    /// Declares tools with automatic choice.
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self.tool_choice = ToolChoice::Auto;
        self
    }

    /// Marks the request as streaming.
    #[must_use]
    pub const fn streaming(mut self) -> Self {
        self.stream = true;
        self
    }
}

/// Token accounting returned by the provider.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens.
    pub prompt_tokens: u32,
    /// Completion tokens.
    pub completion_tokens: u32,
    /// Sum of both.
    pub total_tokens: u32,
}

/// A blocking completion.
#[derive(Debug, Clone, Default)]
pub struct ChatResponse {
    /// Generated text, possibly empty when the model only called tools.
    pub content: String,
    /// Token usage.
    pub usage: TokenUsage,
    /// Requested tool calls.
    pub tool_calls: Vec<ToolCall>,
    /// Finish reason as reported (`"stop"`, `"tool_calls"`, ...).
    pub finish_reason: Option<String>,
}

/// A fragment of a streamed tool call.
///
/// The first fragment for an `index` carries the id and name; later ones
/// only append to `arguments`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCallDelta {
    /// Position of the call within the response.
    pub index: u32,
    /// Call id, present on the first fragment.
    pub id: Option<String>,
    /// Function name, present on the first fragment.
    pub name: Option<String>,
    /// Argument JSON fragment.
    pub arguments: Option<String>,
}

/// One item of a streamed completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    /// Text delta.
    Content(String),
    /// Tool-call fragment.
    ToolCall(ToolCallDelta),
    /// The model finished, with its reason.
    Finish(String),
}

/// Creates a system message.
#[must_use]
pub fn system_message(content: &str) -> ChatMessage {
    ChatMessage::plain(Role::System, content)
}

/// Creates a user message.
#[must_use]
pub fn user_message(content: &str) -> ChatMessage {
    ChatMessage::plain(Role::User, content)
}

/// Creates an assistant turn that carries text and tool calls.
#[must_use]
pub fn assistant_message(content: &str, tool_calls: Vec<ToolCall>) -> ChatMessage {
    ChatMessage {
        tool_calls,
        ..ChatMessage::plain(Role::Assistant, content)
    }
}

/// Creates a tool answer.
#[must_use]
pub fn tool_message(tool_call_id: &str, content: &str) -> ChatMessage {
    ChatMessage {
        tool_call_id: Some(tool_call_id.to_string()),
        ..ChatMessage::plain(Role::Tool, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_starts_with_system_then_user() {
        let req = ChatRequest::new("gpt-4o", "be terse", "hello");
        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.messages[0].role, Role::System);
        assert_eq!(req.messages[1].role, Role::User);
        assert_eq!(req.messages[1].content, "hello");
        assert!(!req.stream);
        assert!(req.tools.is_empty());
    }

    #[test]
    fn test_request_builders() {
        let req = ChatRequest::new("m", "s", "u")
            .with_temperature(0.1)
            .with_max_tokens(500)
            .json()
            .streaming();
        assert_eq!(req.temperature, Some(0.1));
        assert_eq!(req.max_tokens, Some(500));
        assert!(req.json_mode);
        assert!(req.stream);
    }

    #[test]
    fn test_tool_message_links_call() {
        let msg = tool_message("call_9", "ok");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_9"));
    }

    #[test]
    fn test_assistant_message_keeps_text_and_calls() {
        let msg = assistant_message(
            "looking",
            vec![ToolCall {
                id: "c1".to_string(),
                name: "web_search".to_string(),
                arguments: r#"{"query":"neobanks"}"#.to_string(),
            }],
        );
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.content, "looking");
        assert_eq!(msg.tool_calls.len(), 1);
    }

    #[test]
    fn test_serialization_omits_empty_tool_fields() {
        let json = serde_json::to_string(&user_message("x")).unwrap_or_default();
        assert!(json.contains("\"user\""));
        assert!(!json.contains("tool_calls"));
        assert!(!json.contains("tool_call_id"));
    }
}
