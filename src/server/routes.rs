//! Request handlers.

use std::convert::Infallible;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;
use serde::Serialize;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::AppState;
use super::error::ApiError;
use super::params::{
    AgentBody, AnalysesQuery, AnalysisBody, ChatBody, DocumentBody, MetricsBody,
    ProcessCompetitorsBody, StartupBody, StartupQuery, StreamQuery,
};
use crate::agent::{AnalysisOutcome, ChatOutcome, DocumentInput, DocumentOutcome, ProcessOutcome};
use crate::core::{
    AnalysisKind, Metrics, ReportAction, ReportKind, Startup, StoredAnalysis, StoredCompetitor,
    StoredReport,
};
use crate::error::{CommandError, StorageError};
use crate::storage::{Storage, lock};

/// Reports returned by the history endpoint.
const HISTORY_LIMIT: usize = 10;

type ApiResult<T> = Result<Json<T>, ApiError>;

/// `POST /api/agents/competitors`
pub async fn competitors_agent(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
    Json(body): Json<AgentBody>,
) -> Result<Response, ApiError> {
    run_agent(&state, ReportKind::Competitors, query, &body).await
}

/// `POST /api/agents/market`
pub async fn market_agent(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
    Json(body): Json<AgentBody>,
) -> Result<Response, ApiError> {
    run_agent(&state, ReportKind::Market, query, &body).await
}

/// `POST /api/agents/memo`
pub async fn memo_agent(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
    Json(body): Json<AgentBody>,
) -> Result<Response, ApiError> {
    run_agent(&state, ReportKind::Memo, query, &body).await
}

/// Whether a flow can answer with an event stream.
///
/// Competitor analysis and comparison and every memo action read their
/// results back in one piece, so they always answer with JSON.
const fn streams(kind: ReportKind, action: ReportAction) -> bool {
    matches!(
        (kind, action),
        (ReportKind::Competitors, ReportAction::Research) | (ReportKind::Market, _)
    )
}

async fn run_agent(
    state: &AppState,
    kind: ReportKind,
    query: StreamQuery,
    body: &AgentBody,
) -> Result<Response, ApiError> {
    let action = match body.action.as_deref().map(str::trim) {
        Some(action) if !action.is_empty() => ReportAction::parse_for(kind, action)?,
        _ => kind.default_action(),
    };
    let request = state.pipeline.prepare(&body.subject(), kind, action)?;

    if query.stream.unwrap_or(false) && streams(kind, action) {
        info!(subject_id = %request.subject_id, kind = %kind, action = %action, "streaming report");
        let cancel = CancellationToken::new();
        let rx = state.pipeline.spawn_stream(request, cancel.clone());

        // Dropping the body (client gone) cancels the generation.
        let guard = cancel.drop_guard();
        let events = ReceiverStream::new(rx).map(move |event| {
            let _ = &guard;
            Ok::<_, Infallible>(Event::default().data(event.to_json()))
        });
        return Ok(Sse::new(events)
            .keep_alive(KeepAlive::default())
            .into_response());
    }

    info!(subject_id = %request.subject_id, kind = %kind, action = %action, "generating report");
    let outcome = state
        .pipeline
        .run(&request, &CancellationToken::new())
        .await?;
    Ok(Json(outcome).into_response())
}

/// `POST /api/competitors/process`
pub async fn process_competitors(
    State(state): State<AppState>,
    Json(body): Json<ProcessCompetitorsBody>,
) -> ApiResult<ProcessOutcome> {
    let startup_id = required(&body.startup_id, "startupId")?;
    let outcome = state
        .pipeline
        .process_competitors(startup_id, body.research_report)
        .await?;
    Ok(Json(outcome))
}

/// `POST /api/documents/process`
pub async fn process_document(
    State(state): State<AppState>,
    Json(body): Json<DocumentBody>,
) -> ApiResult<DocumentOutcome> {
    let input = DocumentInput {
        name: body.name.trim(),
        doc_type: body.doc_type.as_deref().unwrap_or_default(),
        content: &body.content,
    };
    let outcome = state
        .pipeline
        .process_document(body.startup_id.as_deref(), &input)
        .await?;
    Ok(Json(outcome))
}

/// `POST /api/analyze-startup`
pub async fn analyze_startup(
    State(state): State<AppState>,
    Json(body): Json<AnalysisBody>,
) -> ApiResult<AnalysisOutcome> {
    let startup_id = required(&body.startup_id, "startupId")?;
    Ok(Json(state.pipeline.analyze_startup(startup_id).await?))
}

/// `POST /api/generate-summary`
pub async fn generate_summary(
    State(state): State<AppState>,
    Json(body): Json<AnalysisBody>,
) -> ApiResult<AnalysisOutcome> {
    let startup_id = required(&body.startup_id, "startupId")?;
    Ok(Json(state.pipeline.summarize_startup(startup_id).await?))
}

/// `POST /api/chat-analysis`
pub async fn chat_analysis(
    State(state): State<AppState>,
    Json(body): Json<ChatBody>,
) -> ApiResult<ChatOutcome> {
    let startup_id = required(&body.startup_id, "startupId")?;
    let message = required(&body.message, "message")?;
    let outcome = state
        .pipeline
        .chat(startup_id, message, &body.conversation_history)
        .await?;
    Ok(Json(outcome))
}

/// `GET /api/metrics?startupId=`
///
/// A startup without metrics gets an all-null object.
pub async fn get_metrics(
    State(state): State<AppState>,
    Query(query): Query<StartupQuery>,
) -> ApiResult<Metrics> {
    let startup_id = required(&query.startup_id, "startupId")?;
    let metrics = lock(state.pipeline.storage())?
        .get_metrics(startup_id)?
        .unwrap_or_default();
    Ok(Json(metrics))
}

/// `POST /api/metrics`
pub async fn save_metrics(
    State(state): State<AppState>,
    Json(body): Json<MetricsBody>,
) -> ApiResult<Metrics> {
    let startup_id = required(&body.startup_id, "startupId")?;
    let mut store = lock(state.pipeline.storage())?;
    store.upsert_metrics(startup_id, &body.metrics)?;
    let merged = store.get_metrics(startup_id)?.unwrap_or_default();
    Ok(Json(merged))
}

/// `GET /api/startups`
pub async fn list_startups(State(state): State<AppState>) -> ApiResult<Vec<Startup>> {
    Ok(Json(lock(state.pipeline.storage())?.list_startups()?))
}

/// `POST /api/startups`
pub async fn create_startup(
    State(state): State<AppState>,
    Json(body): Json<StartupBody>,
) -> ApiResult<Startup> {
    required(&body.name, "name")?;
    let startup = body.into_startup();
    lock(state.pipeline.storage())?.save_startup(&startup)?;
    info!(startup_id = %startup.id, name = %startup.name, "startup saved");
    Ok(Json(startup))
}

/// `GET /api/startups/{id}`
pub async fn get_startup(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Startup> {
    let startup = lock(state.pipeline.storage())?
        .get_startup(&id)?
        .ok_or(StorageError::NotFound {
            entity: "startup",
            id,
        })?;
    Ok(Json(startup))
}

/// `GET /api/startups/{id}/competitors`
pub async fn list_competitors(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<StoredCompetitor>> {
    Ok(Json(lock(state.pipeline.storage())?.list_competitors(&id)?))
}

/// `GET /api/startups/{id}/reports/{kind}`
pub async fn latest_report(
    State(state): State<AppState>,
    Path((id, kind)): Path<(String, String)>,
) -> ApiResult<StoredReport> {
    let kind = ReportKind::parse(&kind)?;
    let report = lock(state.pipeline.storage())?
        .latest_report(&id, kind)?
        .ok_or(StorageError::NotFound {
            entity: "report",
            id,
        })?;
    Ok(Json(report))
}

/// Newest-first report list.
#[derive(Debug, Serialize)]
pub struct ReportHistory {
    /// Report flow.
    pub kind: ReportKind,
    /// Reports, newest first.
    pub reports: Vec<StoredReport>,
}

/// `GET /api/startups/{id}/reports/{kind}/history`
pub async fn report_history(
    State(state): State<AppState>,
    Path((id, kind)): Path<(String, String)>,
) -> ApiResult<ReportHistory> {
    let kind = ReportKind::parse(&kind)?;
    let reports = lock(state.pipeline.storage())?.report_history(&id, kind, HISTORY_LIMIT)?;
    Ok(Json(ReportHistory { kind, reports }))
}

/// `GET /api/startups/{id}/analyses[?kind=]`
pub async fn list_analyses(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<AnalysesQuery>,
) -> ApiResult<Vec<StoredAnalysis>> {
    let kind = match query.kind.as_deref().map(str::trim) {
        Some(kind) if !kind.is_empty() => Some(AnalysisKind::parse(kind)?),
        _ => None,
    };
    let rows = lock(state.pipeline.storage())?.list_analyses(&id, kind, HISTORY_LIMIT)?;
    Ok(Json(rows))
}

fn required<'a>(value: &'a str, field: &str) -> Result<&'a str, CommandError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CommandError::InvalidArgument(format!("{field} is required")));
    }
    Ok(value)
}
