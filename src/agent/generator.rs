//! Report generation: one model call (or one tool loop) per request.
//!
//! The generator never fails. A blank answer, a provider error, a tool
//! loop overrun or a cancelled call all end in the deterministic
//! [`fallback_report`], marked [`ReportOrigin::Fallback`].

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::agentic_loop::agentic_loop;
use super::config::{AgentConfig, ToolMode};
use super::executor::ToolExecutor;
use super::fallback::fallback_report;
use super::message::ChatRequest;
use super::prompt::{PromptSet, build_report_prompt};
use super::provider::LlmProvider;
use super::search::{HttpSearchBackend, NoSearch, SearchBackend};
use super::tool::{ToolSet, trace_line};
use crate::core::{
    GeneratedReport, ReportAction, ReportKind, ReportOrigin, ReportRequest, ReportStatus,
};
use crate::error::AgentError;
use crate::relay::{RelayEnd, StreamEvent, emit_whole, relay};
use crate::storage::SharedStorage;

/// Turns report requests into report text.
#[derive(Clone)]
pub struct ReportGenerator {
    provider: Arc<dyn LlmProvider>,
    config: AgentConfig,
    prompts: PromptSet,
    search: Arc<dyn SearchBackend>,
    storage: Option<SharedStorage>,
}

impl ReportGenerator {
    /// Creates a generator.
    ///
    /// Prompts come from [`AgentConfig::prompt_dir`]; the search backend
    /// from [`AgentConfig::search_url`].
    pub fn new(provider: Arc<dyn LlmProvider>, config: AgentConfig) -> Self {
        let prompts = PromptSet::load(config.prompt_dir.as_deref());
        let search = search_backend(&config);
        Self {
            provider,
            config,
            prompts,
            search,
            storage: None,
        }
    }

    /// Replaces the prompt set.
    #[must_use]
    pub fn with_prompts(mut self, prompts: PromptSet) -> Self {
        self.prompts = prompts;
        self
    }

    /// Replaces the search backend.
    #[must_use]
    pub fn with_search(mut self, search: Arc<dyn SearchBackend>) -> Self {
        self.search = search;
        self
    }

    /// Store used by `save_competitor` in execute mode.
    #[must_use]
    pub fn with_storage(mut self, storage: SharedStorage) -> Self {
        self.storage = Some(storage);
        self
    }

    /// The model provider.
    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    /// Configuration in effect.
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Loaded prompts.
    pub const fn prompts(&self) -> &PromptSet {
        &self.prompts
    }

    /// Tools offered for a request.
    pub fn tools_for(request: &ReportRequest) -> ToolSet {
        match (request.kind, request.action) {
            (ReportKind::Competitors, ReportAction::Research) => ToolSet::research_tools(),
            _ => ToolSet::search_tools(),
        }
    }

    /// Builds the chat request for `request`.
    pub fn chat_request(&self, request: &ReportRequest) -> ChatRequest {
        let model = match request.kind {
            ReportKind::Memo => &self.config.memo_model,
            ReportKind::Competitors | ReportKind::Market => &self.config.report_model,
        };
        ChatRequest::new(
            model.clone(),
            self.prompts.system_for(request.kind),
            &build_report_prompt(request),
        )
        .with_temperature(self.config.temperature)
        .with_max_tokens(self.config.report_max_tokens)
        .with_tools(Self::tools_for(request).into_definitions())
    }

    /// Generates a report with one blocking call.
    pub async fn generate(
        &self,
        request: &ReportRequest,
        cancel: &CancellationToken,
    ) -> GeneratedReport {
        let chat = self.chat_request(request);
        let result = match self.config.tool_mode {
            ToolMode::Narrate => self.narrate(&chat, cancel).await,
            ToolMode::Execute => self.execute(request, chat, cancel).await,
        };

        match result {
            Ok(text) if !text.trim().is_empty() => {
                info!(
                    subject_id = %request.subject_id,
                    kind = %request.kind,
                    action = %request.action,
                    len = text.len(),
                    "report generated"
                );
                report(request, text, ReportOrigin::Model)
            }
            Ok(_) => {
                warn!(subject_id = %request.subject_id, kind = %request.kind, "model returned an empty report; using fallback");
                report(request, fallback_report(request), ReportOrigin::Fallback)
            }
            Err(e) => {
                warn!(subject_id = %request.subject_id, kind = %request.kind, error = %e, "report generation failed; using fallback");
                report(request, fallback_report(request), ReportOrigin::Fallback)
            }
        }
    }

    async fn narrate(
        &self,
        chat: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<String, AgentError> {
        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(AgentError::Cancelled),
            response = self.provider.chat(chat) => response?,
        };
        debug!(
            tool_calls = response.tool_calls.len(),
            total_tokens = response.usage.total_tokens,
            "narrating tool calls"
        );

        let mut text = response.content;
        for call in &response.tool_calls {
            text.push_str(&trace_line(call, false));
        }
        Ok(text)
    }

    async fn execute(
        &self,
        request: &ReportRequest,
        mut chat: ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<String, AgentError> {
        let executor = ToolExecutor::new(
            Arc::clone(&self.search),
            self.storage.clone(),
            request.subject_id.clone(),
        );
        let outcome = agentic_loop(
            self.provider.as_ref(),
            &mut chat,
            &executor,
            self.config.max_tool_iterations,
            cancel,
        )
        .await?;
        debug!(
            iterations = outcome.iterations,
            tool_calls = outcome.tool_calls,
            total_tokens = outcome.usage.total_tokens,
            "tool loop finished"
        );
        Ok(outcome.transcript)
    }

    /// Generates a report while relaying it into `tx` as stream events.
    ///
    /// Tool calls are narrated, never executed, while streaming. If the
    /// stream cannot be opened, or fails before producing anything, the
    /// fallback report goes out as a single `content` event followed by
    /// `final_output`.
    pub async fn stream_into(
        &self,
        request: &ReportRequest,
        tx: &mpsc::Sender<StreamEvent>,
        cancel: &CancellationToken,
    ) -> GeneratedReport {
        let chat = self.chat_request(request).streaming();

        let frames = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(AgentError::Cancelled),
            frames = self.provider.chat_stream(&chat) => frames,
        };

        let frames = match frames {
            Ok(frames) => frames,
            Err(e) => {
                warn!(subject_id = %request.subject_id, kind = %request.kind, error = %e, "could not open stream; sending fallback");
                let text = fallback_report(request);
                emit_whole(tx, cancel, &text).await;
                return report(request, text, ReportOrigin::Fallback);
            }
        };

        let outcome = relay(frames, tx, cancel, || fallback_report(request)).await;
        debug!(end = ?outcome.end, len = outcome.text.len(), "stream relayed");

        if outcome.used_fallback {
            return report(request, outcome.text, ReportOrigin::Fallback);
        }
        match outcome.end {
            RelayEnd::Completed => report(request, outcome.text, ReportOrigin::Model),
            RelayEnd::Failed | RelayEnd::Disconnected if outcome.text.trim().is_empty() => {
                report(request, fallback_report(request), ReportOrigin::Fallback)
            }
            RelayEnd::Failed | RelayEnd::Disconnected => {
                report(request, outcome.text, ReportOrigin::Model)
            }
        }
    }
}

fn report(request: &ReportRequest, text: String, origin: ReportOrigin) -> GeneratedReport {
    GeneratedReport {
        subject_id: request.subject_id.clone(),
        kind: request.kind,
        action: request.action,
        report_text: text,
        status: ReportStatus::Completed,
        origin,
    }
}

/// Search backend for `config`: HTTP when a URL is set, otherwise none.
pub fn search_backend(config: &AgentConfig) -> Arc<dyn SearchBackend> {
    let Some(url) = config.search_url.as_deref() else {
        return Arc::new(NoSearch);
    };
    match HttpSearchBackend::new(url, config.timeout) {
        Ok(backend) => Arc::new(backend),
        Err(e) => {
            warn!(url, error = %e, "search backend unavailable; web_search will fail");
            Arc::new(NoSearch)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::message::{ChatResponse, StreamFrame, ToolCallDelta};
    use crate::agent::provider::FrameStream;
    use crate::agent::providers::DisabledProvider;
    use crate::agent::tool::{SAVE_COMPETITOR, ToolCall, WEB_SEARCH};
    use crate::extract::extract;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use futures_util::stream;

    /// Scripted provider: fixed blocking answer and fixed stream frames.
    struct ScriptedProvider {
        response: ChatResponse,
        frames: Vec<StreamFrame>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn text(content: &str) -> Self {
            Self {
                response: ChatResponse {
                    content: content.to_string(),
                    ..ChatResponse::default()
                },
                frames: Vec::new(),
                calls: AtomicUsize::new(0),
            }
        }

        fn streaming(frames: Vec<StreamFrame>) -> Self {
            Self {
                frames,
                ..Self::text("")
            }
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, AgentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }

        async fn chat_stream(&self, _request: &ChatRequest) -> Result<FrameStream, AgentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let frames: Vec<Result<StreamFrame, AgentError>> =
                self.frames.clone().into_iter().map(Ok).collect();
            Ok(Box::pin(stream::iter(frames)))
        }
    }

    fn generator(provider: impl LlmProvider + 'static) -> ReportGenerator {
        ReportGenerator::new(Arc::new(provider), AgentConfig::offline())
            .with_prompts(PromptSet::defaults())
    }

    fn request(kind: ReportKind) -> ReportRequest {
        ReportRequest::new("42", "Acme", kind, kind.default_action()).with_category("Fintech")
    }

    async fn drain(mut rx: mpsc::Receiver<StreamEvent>) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_disabled_model_yields_fallback() {
        let out = generator(DisabledProvider)
            .generate(&request(ReportKind::Competitors), &CancellationToken::new())
            .await;
        assert_eq!(out.status, ReportStatus::Completed);
        assert!(out.is_fallback());
        assert!(out.report_text.contains("Acme"));
        assert!(out.report_text.contains("Fintech"));
        assert!(!extract(&out.report_text).records.is_empty());
    }

    #[tokio::test]
    async fn test_model_text_is_kept() {
        let out = generator(ScriptedProvider::text("Market is large."))
            .generate(&request(ReportKind::Market), &CancellationToken::new())
            .await;
        assert_eq!(out.origin, ReportOrigin::Model);
        assert_eq!(out.report_text, "Market is large.");
    }

    #[tokio::test]
    async fn test_blank_model_text_falls_back() {
        let out = generator(ScriptedProvider::text("  \n "))
            .generate(&request(ReportKind::Memo), &CancellationToken::new())
            .await;
        assert!(out.is_fallback());
        assert!(out.report_text.contains("Recommendation: More Info"));
    }

    #[tokio::test]
    async fn test_narrated_tool_calls_append_trace_lines() {
        let mut provider = ScriptedProvider::text("Landscape overview.");
        provider.response.tool_calls = vec![
            ToolCall {
                id: "c1".to_string(),
                name: WEB_SEARCH.to_string(),
                arguments: r#"{"query": "fintech competitors"}"#.to_string(),
            },
            ToolCall {
                id: "c2".to_string(),
                name: SAVE_COMPETITOR.to_string(),
                arguments: r#"{"competitor": {"competitor_name": "Plaid"}}"#.to_string(),
            },
        ];
        let out = generator(provider)
            .generate(&request(ReportKind::Competitors), &CancellationToken::new())
            .await;
        assert!(out.report_text.starts_with("Landscape overview."));
        assert!(out.report_text.contains("--- SEARCHING FOR: fintech competitors ---"));
        assert!(out.report_text.contains("--- SAVING COMPETITOR: Plaid ---"));
        assert!(out.report_text.contains("not executed"));
    }

    #[tokio::test]
    async fn test_cancelled_generation_falls_back() {
        let provider = ScriptedProvider::text("never used");
        let cancel = CancellationToken::new();
        cancel.cancel();
        let out = generator(provider)
            .generate(&request(ReportKind::Market), &cancel)
            .await;
        assert!(out.is_fallback());
    }

    #[test]
    fn test_tool_sets_per_flow() {
        assert_eq!(ReportGenerator::tools_for(&request(ReportKind::Competitors)).len(), 2);
        assert_eq!(ReportGenerator::tools_for(&request(ReportKind::Market)).len(), 1);
        let analyze = ReportRequest::new("1", "A", ReportKind::Competitors, ReportAction::Analyze);
        assert_eq!(ReportGenerator::tools_for(&analyze).len(), 1);
    }

    #[test]
    fn test_chat_request_uses_flow_model_and_prompts() {
        let generator = generator(DisabledProvider);
        let chat = generator.chat_request(&request(ReportKind::Memo));
        assert_eq!(chat.model, generator.config().memo_model);
        assert_eq!(chat.messages.len(), 2);
        assert!(chat.messages[1].content.contains("Acme"));
        assert!(!chat.stream);
    }

    #[tokio::test]
    async fn test_stream_three_chunks() {
        let provider = ScriptedProvider::streaming(vec![
            StreamFrame::Content("Mar".to_string()),
            StreamFrame::Content("ket is ".to_string()),
            StreamFrame::Content("large.".to_string()),
            StreamFrame::Finish("stop".to_string()),
        ]);
        let (tx, rx) = mpsc::channel(16);
        let out = generator(provider)
            .stream_into(&request(ReportKind::Market), &tx, &CancellationToken::new())
            .await;
        drop(tx);
        let events = drain(rx).await;

        assert_eq!(events.len(), 4);
        assert_eq!(
            events[3],
            StreamEvent::FinalOutput {
                text: "Market is large.".to_string()
            }
        );
        assert_eq!(out.report_text, "Market is large.");
        assert_eq!(out.origin, ReportOrigin::Model);
    }

    #[tokio::test]
    async fn test_stream_unavailable_sends_fallback_once() {
        let (tx, rx) = mpsc::channel(16);
        let out = generator(DisabledProvider)
            .stream_into(&request(ReportKind::Market), &tx, &CancellationToken::new())
            .await;
        drop(tx);
        let events = drain(rx).await;

        assert!(out.is_fallback());
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            StreamEvent::Content {
                text: out.report_text.clone()
            }
        );
        assert_eq!(
            events[1],
            StreamEvent::FinalOutput {
                text: out.report_text
            }
        );
    }

    #[tokio::test]
    async fn test_stream_tool_call_becomes_search_event() {
        let provider = ScriptedProvider::streaming(vec![
            StreamFrame::ToolCall(ToolCallDelta {
                index: 0,
                id: Some("c1".to_string()),
                name: Some(WEB_SEARCH.to_string()),
                arguments: Some(r#"{"query": "acme rivals"}"#.to_string()),
            }),
            StreamFrame::Finish("tool_calls".to_string()),
            StreamFrame::Content("Done.".to_string()),
        ]);
        let (tx, rx) = mpsc::channel(16);
        let out = generator(provider)
            .stream_into(&request(ReportKind::Competitors), &tx, &CancellationToken::new())
            .await;
        drop(tx);
        let events = drain(rx).await;

        assert_eq!(
            events[0],
            StreamEvent::Search {
                query: "acme rivals".to_string()
            }
        );
        assert!(out.report_text.contains("--- SEARCHING FOR: acme rivals ---"));
        assert!(out.report_text.ends_with("Done."));
    }
}
