//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::stream;

use dealroom::agent::message::{ChatRequest, ChatResponse, StreamFrame};
use dealroom::agent::provider::{FrameStream, LlmProvider};
use dealroom::agent::{AgentConfig, PromptSet, ReportGenerator, ReportPipeline};
use dealroom::error::AgentError;
use dealroom::storage::{SqliteStorage, Storage, shared};

/// Provider with a fixed answer, fixed stream frames and a call log.
pub struct MockProvider {
    answer: Result<String, String>,
    frames: Vec<Result<StreamFrame, String>>,
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl MockProvider {
    /// Answers every blocking call with `text`.
    pub fn answering(text: &str) -> Self {
        Self {
            answer: Ok(text.to_string()),
            frames: Vec::new(),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Fails every call with an HTTP 500.
    pub fn failing() -> Self {
        Self {
            answer: Err("upstream exploded".to_string()),
            ..Self::answering("")
        }
    }

    /// Streams `chunks` as content frames, then `stop`.
    pub fn streaming(chunks: &[&str]) -> Self {
        let mut frames: Vec<Result<StreamFrame, String>> = chunks
            .iter()
            .map(|c| Ok(StreamFrame::Content((*c).to_string())))
            .collect();
        frames.push(Ok(StreamFrame::Finish("stop".to_string())));
        Self {
            frames,
            ..Self::answering("")
        }
    }

    /// Streams `chunks`, then fails.
    pub fn streaming_then_failing(chunks: &[&str]) -> Self {
        let mut provider = Self::streaming(chunks);
        provider.frames.pop();
        provider.frames.push(Err("connection reset".to_string()));
        provider
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_user_message(&self) -> Option<String> {
        self.requests
            .lock()
            .ok()
            .and_then(|r| r.last().map(|req| req.messages[1].content.clone()))
    }

    fn record(&self, request: &ChatRequest) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        self.record(request);
        match &self.answer {
            Ok(text) => Ok(ChatResponse {
                content: text.clone(),
                finish_reason: Some("stop".to_string()),
                ..ChatResponse::default()
            }),
            Err(message) => Err(AgentError::ApiRequest {
                message: message.clone(),
                status: Some(500),
            }),
        }
    }

    async fn chat_stream(&self, request: &ChatRequest) -> Result<FrameStream, AgentError> {
        self.record(request);
        if let Err(message) = &self.answer {
            return Err(AgentError::ApiRequest {
                message: message.clone(),
                status: Some(500),
            });
        }
        let frames: Vec<Result<StreamFrame, AgentError>> = self
            .frames
            .iter()
            .cloned()
            .map(|f| f.map_err(|message| AgentError::Stream { message }))
            .collect();
        Ok(Box::pin(stream::iter(frames)))
    }
}

/// Pipeline over an initialized in-memory store.
pub fn pipeline(provider: Arc<dyn LlmProvider>) -> ReportPipeline {
    let mut storage = SqliteStorage::in_memory().unwrap_or_else(|_| unreachable!());
    storage.init().unwrap_or_else(|_| unreachable!());
    let generator =
        ReportGenerator::new(provider, AgentConfig::offline()).with_prompts(PromptSet::defaults());
    ReportPipeline::new(generator, shared(storage))
}

/// A two-competitor research answer with sections.
pub const RESEARCH_REPORT: &str = "Competitor: Plaid\n\
Description: Bank data APIs\n\
Website: https://plaid.com\n\
Founded: 2013\n\
\n\
Competitor: Chime\n\
Description: US neobank\n\
\n\
Market Positioning: Acme targets SMB card issuing, a niche neither serves.\n\
\n\
Recommendations:\n\
- Partner with sponsor banks\n\
- Undercut Chime on interchange";
