//! Competitor processor agent.
//!
//! Turns a free-text research report into competitor records with one
//! JSON-mode call at low temperature. The answer is parsed strictly;
//! when that fails the line grammar runs instead and the strict error is
//! kept as a note. If the model call itself fails, the grammar runs over
//! the report text directly.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::config::AgentConfig;
use super::prompt::{PROCESSOR_TEMPLATE, render};
use super::provider::LlmProvider;
use super::traits::Agent;
use crate::core::CompetitorProfile;
use crate::extract::{ExtractionMethod, extract, parse_heuristic};

/// Longest report sent to the model, in bytes.
const MAX_REPORT_LEN: usize = 60_000;

/// Records recovered from one report.
#[derive(Debug, Clone)]
pub struct ProcessedCompetitors {
    /// Extracted records, deduplicated by name.
    pub competitors: Vec<CompetitorProfile>,
    /// Strategy that produced them.
    pub method: ExtractionMethod,
    /// Notes about failed strategies.
    pub errors: Vec<String>,
}

/// Agent that extracts competitor records from a research report.
pub struct ProcessorAgent {
    model: String,
    temperature: f32,
    max_tokens: u32,
    system_prompt: String,
}

impl ProcessorAgent {
    /// Creates a processor with the extraction model settings.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.extraction_model.clone(),
            temperature: config.extraction_temperature,
            max_tokens: config.extraction_max_tokens,
            system_prompt,
        }
    }

    /// Extracts records from `report`. Never fails; problems land in `errors`.
    pub async fn process(&self, provider: &dyn LlmProvider, report: &str) -> ProcessedCompetitors {
        let user_msg = render(
            PROCESSOR_TEMPLATE,
            &[("researchReport", truncate(report, MAX_REPORT_LEN))],
        );

        let response = match self.execute(provider, &user_msg).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "extraction call failed; scanning report text");
                return ProcessedCompetitors {
                    competitors: parse_heuristic(report),
                    method: ExtractionMethod::Heuristic,
                    errors: vec![format!("Model extraction failed: {e}")],
                };
            }
        };

        let extraction = extract(&response.content);
        debug!(
            method = ?extraction.method,
            records = extraction.records.len(),
            "extraction parsed"
        );

        let mut errors = Vec::new();
        if let Some(strict_error) = &extraction.strict_error {
            errors.push(format!(
                "Failed to parse JSON response, used text extraction instead: {strict_error}"
            ));
        }

        // Prose answers may name nothing the grammar recognizes.
        let competitors = if extraction.records.is_empty()
            && extraction.method == ExtractionMethod::Heuristic
        {
            parse_heuristic(report)
        } else {
            extraction.records
        };

        ProcessedCompetitors {
            competitors,
            method: extraction.method,
            errors,
        }
    }
}

fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[async_trait]
impl Agent for ProcessorAgent {
    fn name(&self) -> &'static str {
        "processor"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn json_mode(&self) -> bool {
        true
    }

    fn temperature(&self) -> f32 {
        self.temperature
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

    use std::sync::Mutex;

    /// Answers with fixed text and records the request it saw.
    struct FixedAnswer {
        content: String,
        seen: Mutex<Option<ChatRequest>>,
    }

    impl FixedAnswer {
        fn new(content: &str) -> Self {
            Self {
                content: content.to_string(),
                seen: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for FixedAnswer {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
            if let Ok(mut seen) = self.seen.lock() {
                *seen = Some(request.clone());
            }
            Ok(ChatResponse {
                content: self.content.clone(),
                ..ChatResponse::default()
            })
        }

        async fn chat_stream(&self, _request: &ChatRequest) -> Result<FrameStream, AgentError> {
            Err(AgentError::Disabled)
        }
    }

    fn agent() -> ProcessorAgent {
        ProcessorAgent::new(&AgentConfig::offline(), "extract".to_string())
    }

    #[tokio::test]
    async fn test_json_answer_is_parsed_strictly() {
        let provider = FixedAnswer::new(
            r#"{"competitors": [{"competitor_name": "Plaid", "description": "Bank APIs", "founded_year": 2013}]}"#,
        );
        let out = agent().process(&provider, "report").await;
        assert_eq!(out.method, ExtractionMethod::Strict);
        assert_eq!(out.competitors.len(), 1);
        assert_eq!(out.competitors[0].founded_year, Some(2013));
        assert!(out.errors.is_empty());

        let seen = provider
            .seen
            .lock()
            .ok()
            .and_then(|s| s.clone())
            .unwrap_or_else(|| unreachable!());
        assert!(seen.json_mode);
        assert!(seen.temperature.is_some_and(|t| (t - 0.1).abs() < f32::EPSILON));
        assert!(seen.messages[1].content.contains("report"));
    }

    #[tokio::test]
    async fn test_prose_answer_falls_back_with_note() {
        let provider = FixedAnswer::new("Competitor: Chime\nDescription: Neobank");
        let out = agent().process(&provider, "report").await;
        assert_eq!(out.method, ExtractionMethod::Heuristic);
        assert_eq!(out.competitors[0].name, "Chime");
        assert_eq!(out.errors.len(), 1);
        assert!(out.errors[0].starts_with("Failed to parse JSON response"));
    }

    #[tokio::test]
    async fn test_failed_call_scans_report() {
        let report = "Competitor: Brex\nDescription: Corporate cards";
        let out = agent().process(&DisabledProvider, report).await;
        assert_eq!(out.competitors.len(), 1);
        assert_eq!(out.competitors[0].name, "Brex");
        assert!(out.errors[0].starts_with("Model extraction failed"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "h");
        assert_eq!(truncate("abc", 10), "abc");
    }
}
