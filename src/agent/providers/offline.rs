//! Provider used when no model is configured.

use async_trait::async_trait;

use crate::agent::message::{ChatRequest, ChatResponse};
use crate::agent::provider::{FrameStream, LlmProvider};
use crate::error::AgentError;

/// Refuses every call, so each flow serves its fallback report.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledProvider;

#[async_trait]
impl LlmProvider for DisabledProvider {
    fn name(&self) -> &'static str {
        "offline"
    }

    async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        Err(AgentError::Disabled)
    }

    async fn chat_stream(&self, _request: &ChatRequest) -> Result<FrameStream, AgentError> {
        Err(AgentError::Disabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_provider_refuses() {
        let provider = DisabledProvider;
        let request = ChatRequest::new("m", "s", "u");
        assert!(matches!(
            provider.chat(&request).await,
            Err(AgentError::Disabled)
        ));
        assert!(provider.chat_stream(&request).await.is_err());
    }
}
