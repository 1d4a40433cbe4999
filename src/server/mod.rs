//! HTTP API over the report pipeline.
//!
//! # Architecture
//!
//! ```text
//! POST /api/agents/{competitors,market,memo}[?stream=true]
//!   ↓ AgentBody → Subject → ReportPipeline::prepare
//!   ├── JSON:  ReportPipeline::run → ReportOutcome
//!   └── SSE:   ReportPipeline::spawn_stream → StreamEvent frames
//! POST /api/competitors/process, /api/documents/process
//! POST /api/analyze-startup, /api/generate-summary, /api/chat-analysis
//!   ↓ ReportPipeline::startup_context → AdvisorAgent
//! GET|POST /api/metrics, /api/startups[/{id}[/competitors|/analyses|/reports/{kind}[/history]]]
//! ```

pub mod error;
pub mod params;
pub mod routes;
pub mod transport;

use axum::Router;
use axum::routing::{get, post};

use crate::agent::ReportPipeline;

pub use error::ApiError;
pub use transport::serve;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// The report pipeline and its store.
    pub pipeline: ReportPipeline,
}

impl AppState {
    /// Wraps a pipeline.
    #[must_use]
    pub const fn new(pipeline: ReportPipeline) -> Self {
        Self { pipeline }
    }
}

/// Builds the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/agents/competitors", post(routes::competitors_agent))
        .route("/api/agents/market", post(routes::market_agent))
        .route("/api/agents/memo", post(routes::memo_agent))
        .route("/api/analyze-startup", post(routes::analyze_startup))
        .route("/api/chat-analysis", post(routes::chat_analysis))
        .route("/api/generate-summary", post(routes::generate_summary))
        .route("/api/competitors/process", post(routes::process_competitors))
        .route("/api/documents/process", post(routes::process_document))
        .route(
            "/api/metrics",
            get(routes::get_metrics).post(routes::save_metrics),
        )
        .route(
            "/api/startups",
            get(routes::list_startups).post(routes::create_startup),
        )
        .route("/api/startups/{id}", get(routes::get_startup))
        .route("/api/startups/{id}/analyses", get(routes::list_analyses))
        .route("/api/startups/{id}/competitors", get(routes::list_competitors))
        .route("/api/startups/{id}/reports/{kind}", get(routes::latest_report))
        .route(
            "/api/startups/{id}/reports/{kind}/history",
            get(routes::report_history),
        )
        .with_state(state)
}
