//! Route behavior through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use tarpit::evidence::MemoryEvidenceRecorder;
use tarpit::http::{router, AppState};
use tarpit::pipeline::Honeypot;
use tarpit::providers::{
    CompletionRequest, CompletionResponse, LlmProvider, ProviderError, UsageStats,
};
use tarpit::report::PlainTextRenderer;
use tarpit::responder::{DecodingParams, ResponseGenerator};
use tarpit::store::memory::MemoryConversationStore;

const API_KEY: &str = "test-honeypot-key";

struct CannedProvider;

#[async_trait]
impl LlmProvider for CannedProvider {
    async fn complete(
        &self,
        _request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        Ok(CompletionResponse {
            text: "Which bank are you from?".to_owned(),
            usage: UsageStats::default(),
            model: "mock".to_owned(),
        })
    }

    fn model_id(&self) -> &str {
        "mock/canned"
    }
}

fn state() -> AppState {
    let honeypot = Honeypot::new(
        Arc::new(MemoryConversationStore::new()),
        Arc::new(MemoryEvidenceRecorder::new()),
        ResponseGenerator::new(Arc::new(CannedProvider), DecodingParams::default()),
    );
    AppState::new(Arc::new(honeypot), Arc::new(PlainTextRenderer), API_KEY)
}

async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = router(state.clone())
        .oneshot(request)
        .await
        .expect("router should respond");
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should read");
    (status, headers, body.to_vec())
}

fn json(body: &[u8]) -> Value {
    serde_json::from_slice(body).expect("json body")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn post_message(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/honeypot")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_owned()))
        .expect("request")
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_without_key_is_unauthorized() {
    let (status, _, body) = send(&state(), get("/api/health")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json(&body)["status"], "error");
}

#[tokio::test]
async fn health_with_wrong_key_is_forbidden() {
    let request = Request::builder()
        .uri("/api/health")
        .header("x-api-key", "nope")
        .body(Body::empty())
        .expect("request");
    let (status, _, body) = send(&state(), request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json(&body)["message"], "Invalid API key");
}

#[tokio::test]
async fn health_with_key_is_ok() {
    let request = Request::builder()
        .uri("/api/health")
        .header("x-api-key", API_KEY)
        .body(Body::empty())
        .expect("request");
    let (status, _, body) = send(&state(), request).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "Agentic Honeypot");
    assert!(body["timestamp"].is_string());
}

// ---------------------------------------------------------------------------
// Honeypot
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_message_prompts_for_input() {
    let (status, _, body) = send(&state(), post_message(r#"{"message": "   "}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), serde_json::json!({"reply": "Please send a message."}));
}

#[tokio::test]
async fn message_returns_reply_and_triage() {
    let state = state();
    let (status, _, body) = send(
        &state,
        post_message(r#"{"message": "Send money via UPI now", "scammer_id": "s-42"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["reply"], "Which bank are you from?");
    assert_eq!(body["scam_type"], "Payment / UPI Fraud");
    assert_eq!(body["risk_score"], "LOW");
    assert_eq!(body["persona"], "Confused User");
}

#[tokio::test]
async fn body_is_parsed_regardless_of_content_type() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/honeypot")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from(r#"{"message": "you won a prize"}"#))
        .expect("request");
    let (status, _, body) = send(&state(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["scam_type"], "Lottery Scam");
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let (status, _, _) = send(&state(), post_message("{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Listing and downloads
// ---------------------------------------------------------------------------

#[tokio::test]
async fn downloads_are_not_found_before_any_turn() {
    let state = state();

    let (status, _, body) = send(&state, get("/api/download/evidence")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json(&body)["error"], "No evidence found");

    let (status, _, body) = send(&state, get("/api/pdf/ghost")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json(&body)["error"], "No records found for this scammer");
}

#[tokio::test]
async fn recorded_turns_show_up_everywhere() {
    let state = state();
    send(&state, post_message(r#"{"message": "your parcel is held"}"#)).await;
    send(
        &state,
        post_message(r#"{"message": "pay customs duty now", "scammer_id": "s-9"}"#),
    )
    .await;

    let (status, _, body) = send(&state, get("/api/admin/scams")).await;
    assert_eq!(status, StatusCode::OK);
    let listing = json(&body);
    let rows = listing.as_array().expect("array");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["scammer_id"], "s-9");
    assert_eq!(rows[1]["scammer_id"], "UNKNOWN");
    assert_eq!(rows[1]["scam_type"], "Courier Scam");
    assert_eq!(rows[1]["message"], "your parcel is held");

    let (status, headers, body) = send(&state, get("/api/download/evidence")).await;
    assert_eq!(status, StatusCode::OK);
    let disposition = headers
        .get(header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .expect("content-disposition");
    assert!(disposition.contains("scam_evidence.csv"));
    let csv = String::from_utf8(body).expect("utf8");
    assert!(csv.starts_with("timestamp,scammer_id,scam_type,risk_score,persona,message"));
    assert_eq!(csv.lines().count(), 3);

    let (status, headers, body) = send(&state, get("/api/pdf/UNKNOWN")).await;
    assert_eq!(status, StatusCode::OK);
    let disposition = headers
        .get(header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .expect("content-disposition");
    assert!(disposition.contains("UNKNOWN.txt"));
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .expect("content-type");
    assert_eq!(content_type, "text/plain; charset=utf-8");
    let text = String::from_utf8(body).expect("utf8");
    assert!(text.starts_with("Scammer ID: UNKNOWN"));
    assert!(text.contains("Scammer Message: your parcel is held"));
    assert!(text.contains("Victim Reply: Which bank are you from?"));
}
