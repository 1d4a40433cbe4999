//! Document review agent.
//!
//! Three independent calls per document: summary, KPIs and red flags.
//! Each falls back to a fixed string when its call fails, so a review
//! always yields a complete [`DocumentSummary`].

use async_trait::async_trait;
use tracing::{debug, warn};

use super::config::AgentConfig;
use super::prompt::{
    DOCUMENT_KPIS_TEMPLATE, DOCUMENT_RED_FLAGS_TEMPLATE, DOCUMENT_SUMMARY_TEMPLATE, render,
};
use super::provider::LlmProvider;
use super::traits::Agent;
use crate::core::DocumentSummary;

/// Summary used when the summary call fails.
pub const SUMMARY_UNAVAILABLE: &str = "Summary not available";
/// KPIs used when the KPI call fails.
pub const KPIS_UNAVAILABLE: &str = "No KPIs extracted";
/// Red flags used when the red-flag call fails.
pub const RED_FLAGS_UNAVAILABLE: &str = "No red flags identified";

/// Longest document content sent to the model, in characters.
const MAX_CONTENT_CHARS: usize = 30_000;

/// A document submitted for review.
#[derive(Debug, Clone)]
pub struct DocumentInput<'a> {
    /// File or display name.
    pub name: &'a str,
    /// Kind of document (pitch deck, financials, ...).
    pub doc_type: &'a str,
    /// Extracted text.
    pub content: &'a str,
}

/// Agent that reviews startup documents.
pub struct DocumentAgent {
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl DocumentAgent {
    /// Creates a reviewer with the extraction model settings.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.extraction_model.clone(),
            max_tokens: config.extraction_max_tokens,
            system_prompt,
        }
    }

    /// Reviews one document.
    pub async fn review(&self, provider: &dyn LlmProvider, doc: &DocumentInput<'_>) -> DocumentSummary {
        let content: String = doc.content.chars().take(MAX_CONTENT_CHARS).collect();
        let doc_type = if doc.doc_type.trim().is_empty() {
            "document"
        } else {
            doc.doc_type.trim()
        };
        let vars = [
            ("documentName", doc.name),
            ("documentType", doc_type),
            ("content", content.as_str()),
        ];

        let summary = self
            .ask(provider, DOCUMENT_SUMMARY_TEMPLATE, &vars, SUMMARY_UNAVAILABLE)
            .await;
        let kpis = self
            .ask(provider, DOCUMENT_KPIS_TEMPLATE, &vars, KPIS_UNAVAILABLE)
            .await;
        let red_flags = self
            .ask(provider, DOCUMENT_RED_FLAGS_TEMPLATE, &vars, RED_FLAGS_UNAVAILABLE)
            .await;

        debug!(document = doc.name, "document reviewed");
        DocumentSummary {
            name: doc.name.to_string(),
            doc_type: doc_type.to_string(),
            summary,
            kpis,
            red_flags,
        }
    }

    async fn ask(
        &self,
        provider: &dyn LlmProvider,
        template: &str,
        vars: &[(&str, &str)],
        default: &str,
    ) -> String {
        match self.execute(provider, &render(template, vars)).await {
            Ok(response) => response.content.trim().to_string(),
            Err(e) => {
                warn!(error = %e, "document call failed; using default");
                default.to_string()
            }
        }
    }
}

#[async_trait]
impl Agent for DocumentAgent {
    fn name(&self) -> &'static str {
        "document"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn temperature(&self) -> f32 {
        0.2
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::message::{ChatRequest, ChatResponse};
    use crate::agent::provider::FrameStream;
    use crate::agent::providers::DisabledProvider;
    use crate::error::AgentError;

    /// Echoes which template it received.
    struct TemplateEcho;

    #[async_trait]
    impl LlmProvider for TemplateEcho {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
            let user = &request.messages[1].content;
            let content = if user.starts_with("Summarize") {
                "A lending startup."
            } else if user.starts_with("List the key performance") {
                "ARR: $1M"
            } else {
                return Err(AgentError::ApiRequest {
                    message: "rate limited".to_string(),
                    status: Some(429),
                });
            };
            Ok(ChatResponse {
                content: content.to_string(),
                ..ChatResponse::default()
            })
        }

        async fn chat_stream(&self, _request: &ChatRequest) -> Result<FrameStream, AgentError> {
            Err(AgentError::Disabled)
        }
    }

    fn input() -> DocumentInput<'static> {
        DocumentInput {
            name: "deck.pdf",
            doc_type: "",
            content: "We lend money.",
        }
    }

    fn agent() -> DocumentAgent {
        DocumentAgent::new(&AgentConfig::offline(), "review".to_string())
    }

    #[tokio::test]
    async fn test_each_call_falls_back_independently() {
        let summary = agent().review(&TemplateEcho, &input()).await;
        assert_eq!(summary.summary, "A lending startup.");
        assert_eq!(summary.kpis, "ARR: $1M");
        assert_eq!(summary.red_flags, RED_FLAGS_UNAVAILABLE);
        assert_eq!(summary.doc_type, "document");
    }

    #[tokio::test]
    async fn test_disabled_model_yields_defaults() {
        let summary = agent().review(&DisabledProvider, &input()).await;
        assert_eq!(summary.name, "deck.pdf");
        assert_eq!(summary.summary, SUMMARY_UNAVAILABLE);
        assert_eq!(summary.kpis, KPIS_UNAVAILABLE);
        assert_eq!(summary.red_flags, RED_FLAGS_UNAVAILABLE);
    }
}
