//! Model-facing half of the report pipeline.
//!
//! Provides prompt rendering, model invocation (blocking or streamed),
//! tool handling and fallbacks behind a pluggable provider abstraction
//! backed by OpenAI-compatible APIs.
//!
//! # Architecture
//!
//! ```text
//! ReportRequest → ReportPipeline::prepare (stored context)
//!   └── ReportGenerator
//!       ├── PromptSet + render → system/user messages
//!       ├── Narrate: one chat call, tool calls become trace lines
//!       ├── Execute: agentic_loop + ToolExecutor (search, save_competitor)
//!       ├── Streaming: chat_stream → relay → StreamEvent
//!       └── any failure → fallback_report
//!   └── ReportPipeline::finish → extract → persist → report history
//! StartupContext → AdvisorAgent (analysis, summary, chat) → analyses
//! ```

pub mod advisor;
pub mod agentic_loop;
pub mod client;
pub mod config;
pub mod document;
pub mod executor;
pub mod fallback;
pub mod generator;
pub mod message;
pub mod pipeline;
pub mod processor;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod search;
pub mod tool;
pub mod traits;

// Re-export key types
pub use advisor::{AdvisorAgent, StartupContext};
pub use client::create_provider;
pub use config::{AgentConfig, ProviderKind, ToolMode};
pub use document::{DocumentAgent, DocumentInput};
pub use fallback::{FALLBACK_NOTE, fallback_report};
pub use generator::ReportGenerator;
pub use message::{ChatMessage, ChatRequest, ChatResponse, Role, StreamFrame, TokenUsage};
pub use pipeline::{
    AnalysisOutcome, ChatOutcome, DocumentOutcome, ProcessOutcome, ReportOutcome, ReportPipeline,
    Subject,
};
pub use processor::ProcessorAgent;
pub use prompt::{PromptSet, render};
pub use provider::LlmProvider;
pub use search::{HttpSearchBackend, NoSearch, SearchBackend, SearchHit};
pub use tool::{ToolCall, ToolDefinition, ToolResult, ToolSet};
pub use traits::{Agent, AgentResponse};
