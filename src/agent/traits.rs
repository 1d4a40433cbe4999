//! Agent trait definition.
//!
//! Single-call agents (competitor processor, document reviewer) implement
//! this trait: a fixed system prompt and model settings, one user
//! message in, one answer out. Report flows go through
//! [`ReportGenerator`](super::generator::ReportGenerator) instead, since
//! they carry tools, streaming and fallbacks.

use async_trait::async_trait;

use super::message::{ChatRequest, TokenUsage};
use super::provider::LlmProvider;
use crate::error::AgentError;

/// Response from an agent execution.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    /// The agent's text output.
    pub content: String,
    /// Token usage for this call.
    pub usage: TokenUsage,
    /// Why the model stopped generating (e.g. `"stop"`, `"length"`).
    pub finish_reason: Option<String>,
}

/// Trait implemented by single-call agents.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Agent name for logging and identification.
    fn name(&self) -> &'static str;

    /// Model identifier to use for this agent.
    fn model(&self) -> &str;

    /// System prompt that defines the agent's role and behavior.
    fn system_prompt(&self) -> &str;

    /// Whether to request JSON-formatted output.
    fn json_mode(&self) -> bool {
        false
    }

    /// Sampling temperature.
    fn temperature(&self) -> f32 {
        0.0
    }

    /// Maximum tokens for the response.
    fn max_tokens(&self) -> u32 {
        2048
    }

    /// Executes the agent with the given user message.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures or an empty answer.
    async fn execute(
        &self,
        provider: &dyn LlmProvider,
        user_msg: &str,
    ) -> Result<AgentResponse, AgentError> {
        let mut request = ChatRequest::new(self.model(), self.system_prompt(), user_msg)
            .with_temperature(self.temperature())
            .with_max_tokens(self.max_tokens());
        if self.json_mode() {
            request = request.json();
        }

        let response = provider.chat(&request).await?;
        if response.content.trim().is_empty() {
            return Err(AgentError::ResponseParse {
                message: format!("{} returned an empty answer", self.name()),
                content: String::new(),
            });
        }

        Ok(AgentResponse {
            content: response.content,
            usage: response.usage,
            finish_reason: response.finish_reason,
        })
    }
}
