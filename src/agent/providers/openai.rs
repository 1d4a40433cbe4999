//! `OpenAI` provider implementation using the `async-openai` crate.
//!
//! Works against any `OpenAI`-compatible endpoint through the base URL
//! override in [`AgentConfig`].

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessage,
    ChatCompletionRequestAssistantMessageContent, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessage, ChatCompletionRequestSystemMessageContent,
    ChatCompletionRequestToolMessage, ChatCompletionRequestToolMessageContent,
    ChatCompletionRequestUserMessage, ChatCompletionRequestUserMessageContent, ChatCompletionTool,
    ChatCompletionToolChoiceOption, ChatCompletionToolType, CreateChatCompletionRequest,
    CreateChatCompletionStreamResponse, FinishReason, FunctionCall, FunctionObject,
    ResponseFormat,
};
use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use tracing::{debug, warn};

use crate::agent::config::AgentConfig;
use crate::agent::message::{
    ChatMessage, ChatRequest, ChatResponse, Role, StreamFrame, TokenUsage, ToolCallDelta,
    ToolChoice,
};
use crate::agent::provider::{FrameStream, LlmProvider};
use crate::agent::tool::ToolCall;
use crate::error::AgentError;

/// `OpenAI`-compatible chat backend.
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
}

impl OpenAiProvider {
    /// Creates a provider from configuration, applying the request timeout.
    #[must_use]
    pub fn new(config: &AgentConfig) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_key(&config.api_key);
        if let Some(ref base_url) = config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        let client = match reqwest::Client::builder().timeout(config.timeout).build() {
            Ok(http) => Client::with_config(openai_config).with_http_client(http),
            Err(e) => {
                warn!(error = %e, "could not build HTTP client with timeout, using defaults");
                Client::with_config(openai_config)
            }
        };

        Self { client }
    }

    fn convert_message(msg: &ChatMessage) -> ChatCompletionRequestMessage {
        match msg.role {
            Role::System => {
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                    content: ChatCompletionRequestSystemMessageContent::Text(msg.content.clone()),
                    name: None,
                })
            }
            Role::User => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
                name: None,
            }),
            Role::Assistant => {
                let tool_calls = (!msg.tool_calls.is_empty()).then(|| {
                    msg.tool_calls
                        .iter()
                        .map(|tc| ChatCompletionMessageToolCall {
                            id: tc.id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: FunctionCall {
                                name: tc.name.clone(),
                                arguments: tc.arguments.clone(),
                            },
                        })
                        .collect()
                });
                let content = (!msg.content.is_empty()).then(|| {
                    ChatCompletionRequestAssistantMessageContent::Text(msg.content.clone())
                });

                #[allow(deprecated)]
                ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                    content,
                    name: None,
                    tool_calls,
                    refusal: None,
                    audio: None,
                    function_call: None,
                })
            }
            Role::Tool => ChatCompletionRequestMessage::Tool(ChatCompletionRequestToolMessage {
                content: ChatCompletionRequestToolMessageContent::Text(msg.content.clone()),
                tool_call_id: msg.tool_call_id.clone().unwrap_or_default(),
            }),
        }
    }

    fn build_request(request: &ChatRequest) -> CreateChatCompletionRequest {
        let messages = request.messages.iter().map(Self::convert_message).collect();

        let response_format = request.json_mode.then_some(ResponseFormat::JsonObject);

        let tools: Option<Vec<ChatCompletionTool>> = (!request.tools.is_empty()).then(|| {
            request
                .tools
                .iter()
                .map(|td| ChatCompletionTool {
                    r#type: ChatCompletionToolType::Function,
                    function: FunctionObject {
                        name: td.name.clone(),
                        description: Some(td.description.clone()),
                        parameters: Some(td.parameters.clone()),
                        strict: None,
                    },
                })
                .collect()
        });

        let tool_choice = tools.as_ref().map(|_| match request.tool_choice {
            ToolChoice::Auto => ChatCompletionToolChoiceOption::Auto,
            ToolChoice::None => ChatCompletionToolChoiceOption::None,
        });

        CreateChatCompletionRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature,
            max_completion_tokens: request.max_tokens,
            stream: request.stream.then_some(true),
            response_format,
            tools,
            tool_choice,
            ..Default::default()
        }
    }

    /// Splits one vendor chunk into frames: content, then tool-call
    /// fragments, then the finish reason.
    fn frames_from_chunk(chunk: CreateChatCompletionStreamResponse) -> Vec<StreamFrame> {
        let Some(choice) = chunk.choices.into_iter().next() else {
            return Vec::new();
        };

        let mut frames = Vec::new();
        if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
            frames.push(StreamFrame::Content(text));
        }
        for tc in choice.delta.tool_calls.unwrap_or_default() {
            let (name, arguments) = tc
                .function
                .map_or((None, None), |f| (f.name, f.arguments));
            frames.push(StreamFrame::ToolCall(ToolCallDelta {
                index: tc.index,
                id: tc.id,
                name,
                arguments,
            }));
        }
        if let Some(reason) = choice.finish_reason {
            frames.push(StreamFrame::Finish(finish_reason_str(&reason)));
        }
        frames
    }
}

fn finish_reason_str(reason: &FinishReason) -> String {
    serde_json::to_value(reason)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| format!("{reason:?}").to_lowercase())
}

fn api_error(e: &OpenAIError) -> AgentError {
    let status = match e {
        OpenAIError::Reqwest(inner) => inner.status().map(|s| s.as_u16()),
        _ => None,
    };
    AgentError::ApiRequest {
        message: e.to_string(),
        status,
    }
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("client", &"<async-openai::Client>")
            .finish()
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        let response = self
            .client
            .chat()
            .create(Self::build_request(request))
            .await
            .map_err(|e| api_error(&e))?;

        let choice = response.choices.into_iter().next();
        let finish_reason = choice
            .as_ref()
            .and_then(|c| c.finish_reason.as_ref())
            .map(finish_reason_str);

        let (content, tool_calls) = choice.map_or_else(Default::default, |c| {
            let calls = c
                .message
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(|tc| ToolCall {
                    id: tc.id,
                    name: tc.function.name,
                    arguments: tc.function.arguments,
                })
                .collect();
            (c.message.content.unwrap_or_default(), calls)
        });

        let usage = response
            .usage
            .map_or_else(TokenUsage::default, |u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            });

        debug!(
            model = %request.model,
            total_tokens = usage.total_tokens,
            finish_reason = finish_reason.as_deref().unwrap_or(""),
            "chat completion received"
        );

        Ok(ChatResponse {
            content,
            usage,
            tool_calls,
            finish_reason,
        })
    }

    async fn chat_stream(&self, request: &ChatRequest) -> Result<FrameStream, AgentError> {
        let mut stream_request = request.clone();
        stream_request.stream = true;

        let upstream = self
            .client
            .chat()
            .create_stream(Self::build_request(&stream_request))
            .await
            .map_err(|e| api_error(&e))?;

        let frames = upstream.flat_map(|result| {
            let items: Vec<Result<StreamFrame, AgentError>> = match result {
                Ok(chunk) => Self::frames_from_chunk(chunk)
                    .into_iter()
                    .map(Ok)
                    .collect(),
                Err(e) => vec![Err(AgentError::Stream {
                    message: e.to_string(),
                })],
            };
            stream::iter(items)
        });

        Ok(Box::pin(frames))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::message;
    use crate::agent::tool::ToolSet;

    #[test]
    fn test_convert_roles() {
        assert!(matches!(
            OpenAiProvider::convert_message(&message::system_message("s")),
            ChatCompletionRequestMessage::System(_)
        ));
        assert!(matches!(
            OpenAiProvider::convert_message(&message::user_message("u")),
            ChatCompletionRequestMessage::User(_)
        ));
        assert!(matches!(
            OpenAiProvider::convert_message(&message::tool_message("c", "r")),
            ChatCompletionRequestMessage::Tool(_)
        ));
    }

    #[test]
    fn test_convert_assistant_with_tool_calls() {
        let msg = message::assistant_message(
            "",
            vec![ToolCall {
                id: "call_1".to_string(),
                name: "web_search".to_string(),
                arguments: r#"{"query":"x"}"#.to_string(),
            }],
        );
        if let ChatCompletionRequestMessage::Assistant(a) = OpenAiProvider::convert_message(&msg)
        {
            assert_eq!(a.tool_calls.as_ref().map_or(0, Vec::len), 1);
            assert!(a.content.is_none());
        } else {
            panic!("Expected Assistant message");
        }
    }

    #[test]
    fn test_build_request_with_tools_sets_auto_choice() {
        let request = ChatRequest::new("gpt-4o", "s", "u")
            .with_tools(ToolSet::research_tools().into_definitions());
        let built = OpenAiProvider::build_request(&request);
        assert_eq!(built.tools.as_ref().map_or(0, Vec::len), 2);
        assert!(matches!(
            built.tool_choice,
            Some(ChatCompletionToolChoiceOption::Auto)
        ));
    }

    #[test]
    fn test_build_request_without_tools_has_no_choice() {
        let built = OpenAiProvider::build_request(&ChatRequest::new("gpt-4o", "s", "u"));
        assert!(built.tools.is_none());
        assert!(built.tool_choice.is_none());
        assert!(built.stream.is_none());
    }

    #[test]
    fn test_build_request_json_and_stream() {
        let request = ChatRequest::new("gpt-4o", "s", "u")
            .json()
            .with_temperature(0.1)
            .streaming();
        let built = OpenAiProvider::build_request(&request);
        assert!(built.response_format.is_some());
        assert_eq!(built.stream, Some(true));
        assert_eq!(built.temperature, Some(0.1));
    }

    #[test]
    fn test_finish_reason_is_snake_case() {
        assert_eq!(finish_reason_str(&FinishReason::ToolCalls), "tool_calls");
        assert_eq!(finish_reason_str(&FinishReason::Stop), "stop");
    }

    #[test]
    fn test_frames_from_chunk() {
        let chunk: CreateChatCompletionStreamResponse = serde_json::from_value(serde_json::json!({
            "id": "c1",
            "object": "chat.completion.chunk",
            "created": 1,
            "model": "gpt-4o",
            "choices": [{
                "index": 0,
                "delta": {
                    "content": "Hi",
                    "tool_calls": [{
                        "index": 0,
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "web_search", "arguments": "{\"qu"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }))
        .unwrap_or_else(|e| panic!("chunk fixture: {e}"));

        let frames = OpenAiProvider::frames_from_chunk(chunk);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0], StreamFrame::Content("Hi".to_string()));
        assert!(matches!(&frames[1], StreamFrame::ToolCall(d) if d.name.as_deref() == Some("web_search")));
        assert_eq!(frames[2], StreamFrame::Finish("tool_calls".to_string()));
    }
}
