//! Startup advisor agent.
//!
//! Answers questions about one startup from what is on file: an
//! investment analysis, an executive summary, or a reply in an analyst
//! conversation. Each is a single call; a failed or blank call yields a
//! deterministic answer built from the file and marked as fallback.

use std::fmt::Write;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::config::AgentConfig;
use super::fallback::FALLBACK_NOTE;
use super::prompt::{ANALYSIS_TEMPLATE, CHAT_TEMPLATE, SUMMARY_TEMPLATE, documents_block, render};
use super::provider::LlmProvider;
use super::traits::Agent;
use crate::core::{AdvisorAnswer, ChatTurn, DocumentSummary, Metrics, ReportOrigin, Startup};

/// Prior chat turns sent with a question; older turns are dropped.
pub const MAX_HISTORY_TURNS: usize = 20;

/// Everything on file about a startup.
#[derive(Debug, Clone, Default)]
pub struct StartupContext {
    /// The startup row.
    pub startup: Startup,
    /// Entered metrics.
    pub metrics: Option<Metrics>,
    /// Reviewed documents.
    pub documents: Vec<DocumentSummary>,
}

impl StartupContext {
    /// Renders the profile, metrics and documents for a prompt.
    #[must_use]
    pub fn to_prompt_block(&self) -> String {
        let s = &self.startup;
        let metrics = self
            .metrics
            .as_ref()
            .map_or_else(|| "No metrics available".to_string(), Metrics::to_prompt_block);
        format!(
            "STARTUP\n- Name: {}\n- Sector: {}\n- Stage: {}\n- Country: {}\n- Description: {}\n- Team: {}\n\nMETRICS\n{metrics}\n\nDOCUMENTS\n{}",
            s.name,
            on_file(s.sector.as_deref()),
            on_file(s.stage.as_deref()),
            on_file(s.country.as_deref()),
            on_file(s.description.as_deref()),
            on_file(s.team_info.as_deref()),
            documents_block(&self.documents),
        )
    }
}

fn on_file(value: Option<&str>) -> &str {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("Not available")
}

/// `role: content` lines for the latest turns.
#[must_use]
pub fn conversation_block(history: &[ChatTurn]) -> String {
    let start = history.len().saturating_sub(MAX_HISTORY_TURNS);
    let lines: Vec<String> = history[start..]
        .iter()
        .filter(|turn| !turn.content.trim().is_empty())
        .map(|turn| format!("{}: {}", turn.role.trim(), turn.content.trim()))
        .collect();
    if lines.is_empty() {
        "No previous messages".to_string()
    } else {
        lines.join("\n")
    }
}

/// Agent answering analyst requests about one startup.
pub struct AdvisorAgent {
    model: String,
    max_tokens: u32,
    temperature: f32,
    system_prompt: String,
}

impl AdvisorAgent {
    /// Creates an advisor with the report model settings.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.report_model.clone(),
            max_tokens: config.report_max_tokens,
            temperature: config.temperature,
            system_prompt,
        }
    }

    /// Investment analysis of the startup.
    pub async fn analyze(&self, provider: &dyn LlmProvider, ctx: &StartupContext) -> AdvisorAnswer {
        let context = ctx.to_prompt_block();
        let prompt = render(ANALYSIS_TEMPLATE, &[("startupContext", context.as_str())]);
        self.answer(provider, &prompt, || fallback_analysis(ctx)).await
    }

    /// Structured executive summary of the startup.
    pub async fn summarize(&self, provider: &dyn LlmProvider, ctx: &StartupContext) -> AdvisorAnswer {
        let context = ctx.to_prompt_block();
        let prompt = render(SUMMARY_TEMPLATE, &[("startupContext", context.as_str())]);
        self.answer(provider, &prompt, || fallback_summary(ctx)).await
    }

    /// Reply to `message`, given the conversation so far.
    pub async fn chat(
        &self,
        provider: &dyn LlmProvider,
        ctx: &StartupContext,
        history: &[ChatTurn],
        message: &str,
    ) -> AdvisorAnswer {
        let context = ctx.to_prompt_block();
        let conversation = conversation_block(history);
        let prompt = render(
            CHAT_TEMPLATE,
            &[
                ("startupContext", context.as_str()),
                ("conversation", conversation.as_str()),
                ("message", message.trim()),
            ],
        );
        self.answer(provider, &prompt, || fallback_chat(ctx, message)).await
    }

    async fn answer(
        &self,
        provider: &dyn LlmProvider,
        prompt: &str,
        fallback: impl FnOnce() -> String + Send,
    ) -> AdvisorAnswer {
        match self.execute(provider, prompt).await {
            Ok(response) => {
                debug!(len = response.content.len(), "advisor answered");
                AdvisorAnswer {
                    text: response.content.trim().to_string(),
                    origin: ReportOrigin::Model,
                }
            }
            Err(e) => {
                warn!(error = %e, "advisor call failed; using fallback");
                AdvisorAnswer {
                    text: format!("{}\n\n{FALLBACK_NOTE}", fallback()),
                    origin: ReportOrigin::Fallback,
                }
            }
        }
    }
}

#[async_trait]
impl Agent for AdvisorAgent {
    fn name(&self) -> &'static str {
        "advisor"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn temperature(&self) -> f32 {
        self.temperature
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

fn profile_line(s: &Startup) -> String {
    let mut line = format!("{} is a", s.name);
    if let Some(stage) = s.stage.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        let _ = write!(line, " {stage}");
    }
    match s.sector.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        Some(sector) => {
            let _ = write!(line, " {} company", sector.to_lowercase());
        }
        None => line.push_str(" startup"),
    }
    if let Some(country) = s.country.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        let _ = write!(line, " based in {country}");
    }
    line.push('.');
    if let Some(description) = s.description.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        let _ = write!(line, " {description}");
    }
    line
}

fn evidence(ctx: &StartupContext) -> String {
    let metrics = ctx
        .metrics
        .as_ref()
        .filter(|m| !m.is_empty())
        .map_or_else(|| "No metrics on file".to_string(), |m| {
            m.entries()
                .into_iter()
                .map(|(label, value)| format!("{label} {value}"))
                .collect::<Vec<_>>()
                .join(", ")
        });
    format!(
        "- Metrics: {metrics}\n- Reviewed documents: {}",
        ctx.documents.len()
    )
}

fn fallback_analysis(ctx: &StartupContext) -> String {
    format!(
        "Investment Analysis for {name}\n\n\
         Executive Summary: {profile}\n\n\
         Pros:\n{evidence}\n\n\
         Cons:\n- No model assessment of the documents and metrics on file\n\n\
         Open Questions:\n\
         - What is the current revenue and how fast is it growing?\n\
         - How experienced is the founding team in this market?\n\
         - Who are the closest competitors and how is {name} different?\n\
         - What is the burn rate and how many months of runway remain?\n\
         - What are the terms and use of funds of the current round?\n\n\
         Recommendation: More Info",
        name = ctx.startup.name,
        profile = profile_line(&ctx.startup),
        evidence = evidence(ctx),
    )
}

fn fallback_summary(ctx: &StartupContext) -> String {
    let s = &ctx.startup;
    let metrics = ctx
        .metrics
        .as_ref()
        .map_or_else(|| "No metrics available".to_string(), Metrics::to_prompt_block);
    format!(
        "Executive Summary for {}\n\n\
         Problem: {}\n\n\
         Team: {}\n\n\
         Metrics:\n{metrics}\n\n\
         Funding Round: {}\n\n\
         Investment Thesis: Not available until the file is analyzed.",
        s.name,
        profile_line(s),
        on_file(s.team_info.as_deref()),
        on_file(s.stage.as_deref()),
    )
}

fn fallback_chat(ctx: &StartupContext, message: &str) -> String {
    format!(
        "I could not reach the analysis model, so I cannot answer \"{}\" yet. \
         This is what is on file for {}:\n\n{}\n{}",
        message.trim(),
        ctx.startup.name,
        profile_line(&ctx.startup),
        evidence(ctx),
    )
}
