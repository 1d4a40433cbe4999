//! HTTP API tests through `tower::ServiceExt::oneshot`.

mod common;

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use common::{MockProvider, RESEARCH_REPORT, pipeline};
use dealroom::agent::LlmProvider;
use dealroom::agent::providers::DisabledProvider;
use dealroom::server::{AppState, router};

fn app(provider: Arc<dyn LlmProvider>) -> Router {
    router(AppState::new(pipeline(provider)))
}

fn offline() -> Router {
    app(Arc::new(DisabledProvider))
}

fn post(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap_or_else(|_| unreachable!())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .unwrap_or_else(|_| unreachable!())
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String, Option<String>) {
    let response = app
        .clone()
        .oneshot(request)
        .await
        .unwrap_or_else(|_| unreachable!());
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let bytes = response
        .into_body()
        .collect()
        .await
        .map(|c| c.to_bytes())
        .unwrap_or_default();
    (status, String::from_utf8_lossy(&bytes).into_owned(), content_type)
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body, _) = send(app, request).await;
    (status, serde_json::from_str(&body).unwrap_or(Value::Null))
}

fn acme() -> Value {
    json!({"subjectId": "42", "subjectName": "Acme", "subjectCategory": "Fintech"})
}

#[tokio::test]
async fn test_offline_competitor_report() {
    let app = offline();
    let (status, body) = send_json(&app, post("/api/agents/competitors", &acme())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report"]["status"], "completed");
    assert_eq!(body["report"]["origin"], "fallback");
    let text = body["report"]["report_text"].as_str().unwrap_or_default();
    assert!(text.contains("Acme") && text.contains("Fintech"));
    assert!(body["competitors"].as_array().is_some_and(|c| !c.is_empty()));
    assert!(body["report_id"].is_i64());
}

#[tokio::test]
async fn test_market_stream_is_event_stream() {
    let app = app(Arc::new(MockProvider::streaming(&["Market ", "is ", "large"])));
    let (status, body, content_type) =
        send(&app, post("/api/agents/market?stream=true", &acme())).await;

    assert_eq!(status, StatusCode::OK);
    assert!(content_type.is_some_and(|ct| ct.starts_with("text/event-stream")));
    let frames: Vec<&str> = body
        .split("\n\n")
        .filter(|f| f.starts_with("data: "))
        .collect();
    assert_eq!(frames.len(), 4);
    assert_eq!(frames[0], r#"data: {"type":"content","text":"Market "}"#);
    assert_eq!(
        frames[3],
        r#"data: {"type":"final_output","text":"Market is large"}"#
    );
}

#[tokio::test]
async fn test_memo_ignores_stream_flag() {
    let app = offline();
    let (status, _, content_type) = send(&app, post("/api/agents/memo?stream=true", &acme())).await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.is_some_and(|ct| ct.starts_with("application/json")));
}

#[tokio::test]
async fn test_unknown_subject_is_not_found() {
    let app = offline();
    let (status, body) =
        send_json(&app, post("/api/agents/market", &json!({"subjectId": "nope"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().is_some_and(|e| e.contains("startup")));
}

#[tokio::test]
async fn test_invalid_input_is_bad_request() {
    let app = offline();

    let mut body = acme();
    body["action"] = json!("forecast");
    let (status, _) = send_json(&app, post("/api/agents/memo", &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(&app, post("/api/agents/market", &json!({"subjectId": " "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(&app, get("/api/startups/42/reports/weather")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stored_startup_fills_subject() {
    let app = offline();
    let (status, created) = send_json(
        &app,
        post(
            "/api/startups",
            &json!({"id": "s1", "name": "Stored Co", "sector": "Health"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["id"], "s1");

    let (status, fetched) = send_json(&app, get("/api/startups/s1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "Stored Co");

    let (status, report) =
        send_json(&app, post("/api/agents/market", &json!({"subjectId": "s1"}))).await;
    assert_eq!(status, StatusCode::OK);
    let text = report["report"]["report_text"].as_str().unwrap_or_default();
    assert!(text.contains("Stored Co") && text.contains("Health"));

    let (status, latest) = send_json(&app, get("/api/startups/s1/reports/market")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(latest["report_text"].as_str(), Some(text));

    let (status, _) = send_json(&app, get("/api/startups/missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_upsert_merges() {
    let app = offline();
    let (status, _) = send_json(
        &app,
        post("/api/metrics", &json!({"startupId": "42", "arr": 1000.0, "mrr": 90.0})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, merged) = send_json(
        &app,
        post("/api/metrics", &json!({"startupId": "42", "mrr": 100.0})),
    )
    .await;
    assert_eq!(merged["arr"], 1000.0);
    assert_eq!(merged["mrr"], 100.0);

    let (status, fetched) = send_json(&app, get("/api/metrics?startupId=42")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["arr"], 1000.0);
}

#[tokio::test]
async fn test_process_competitors_persists_and_lists() {
    let app = app(Arc::new(MockProvider::answering(
        r#"{"competitors": [{"competitor_name": "Plaid", "description": "Bank APIs", "website": "plaid.com"}]}"#,
    )));

    let (status, body) = send_json(
        &app,
        post(
            "/api/competitors/process",
            &json!({"startupId": "42", "researchReport": RESEARCH_REPORT}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["processed_count"], 1);
    assert_eq!(body["inserted"], 1);

    let (_, listed) = send_json(&app, get("/api/startups/42/competitors")).await;
    let listed = listed.as_array().cloned().unwrap_or_default();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["name"], "Plaid");

    let (status, _) = send_json(
        &app,
        post("/api/competitors/process", &json!({"startupId": "empty"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_document_without_startup_is_not_stored() {
    let app = offline();
    let (status, body) = send_json(
        &app,
        post(
            "/api/documents/process",
            &json!({"name": "deck.pdf", "docType": "pitch deck", "content": "We lend."}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "deck.pdf");
    assert_eq!(body["summary"], "Summary not available");
    assert!(body["document_id"].is_null());

    let (status, _) = send_json(
        &app,
        post("/api/documents/process", &json!({"name": "empty.pdf", "content": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_report_history_is_newest_first() {
    let app = offline();
    for action in ["research", "forecast"] {
        let mut body = acme();
        body["action"] = json!(action);
        let (status, _) = send_json(&app, post("/api/agents/market", &body)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, history) = send_json(&app, get("/api/startups/42/reports/market/history")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["kind"], "market");
    assert_eq!(history["reports"][0]["action"], "forecast");
    assert_eq!(history["reports"].as_array().map(Vec::len), Some(2));
}

async fn create_stored_co(app: &Router) {
    let (status, _) = send_json(
        app,
        post(
            "/api/startups",
            &json!({"id": "s1", "name": "Stored Co", "sector": "Health", "stage": "Seed"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_offline_analysis_is_fallback_and_not_stored() {
    let app = offline();
    create_stored_co(&app).await;

    let (status, body) =
        send_json(&app, post("/api/analyze-startup", &json!({"startupId": "s1"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["origin"], "fallback");
    assert_eq!(body["startup_name"], "Stored Co");
    assert!(body["analysis_id"].is_null());
    let content = body["content"].as_str().unwrap_or_default();
    assert!(content.contains("Recommendation: More Info"));

    let (status, rows) = send_json(&app, get("/api/startups/s1/analyses")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rows.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn test_model_summary_is_listed_by_kind() {
    let app = app(Arc::new(MockProvider::answering(
        "Problem: Clinics lose patients.\nInvestment Thesis: Strong team.",
    )));
    create_stored_co(&app).await;

    let (status, body) =
        send_json(&app, post("/api/generate-summary", &json!({"startupId": "s1"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "summary");
    assert_eq!(body["origin"], "model");
    assert!(body["analysis_id"].is_i64());

    let (status, rows) = send_json(&app, get("/api/startups/s1/analyses?kind=summary")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rows[0]["kind"], "summary");

    let (status, rows) = send_json(&app, get("/api/startups/s1/analyses?kind=investment")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rows.as_array().map(Vec::len), Some(0));

    let (status, _) = send_json(&app, get("/api/startups/s1/analyses?kind=weather")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_chat_analysis_answers_with_history() {
    let mock = Arc::new(MockProvider::answering("Churn is not on file."));
    let app = app(Arc::clone(&mock) as Arc<dyn LlmProvider>);
    create_stored_co(&app).await;

    let (status, body) = send_json(
        &app,
        post(
            "/api/chat-analysis",
            &json!({
                "startupId": "s1",
                "message": "What about churn?",
                "conversationHistory": [{"role": "assistant", "content": "Burn is 80k."}]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "Churn is not on file.");
    assert_eq!(body["origin"], "model");
    let sent = mock.last_user_message().unwrap_or_default();
    assert!(sent.contains("assistant: Burn is 80k."));
    assert!(sent.contains("USER: What about churn?"));
}

#[tokio::test]
async fn test_chat_analysis_rejects_bad_input() {
    let app = offline();
    create_stored_co(&app).await;

    let (status, _) = send_json(
        &app,
        post("/api/chat-analysis", &json!({"startupId": "missing", "message": "Hi"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send_json(
        &app,
        post("/api/chat-analysis", &json!({"startupId": "s1", "message": "  "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(&app, post("/api/analyze-startup", &json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
