//! HTTP adapter.
//!
//! Thin axum layer over [`Honeypot`], [`ReportExporter`] and the evidence
//! sink. Handlers translate domain results into the JSON shapes and status
//! codes clients already depend on; no decision logic lives here.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::evidence::EvidenceError;
use crate::pipeline::{Engagement, Honeypot};
use crate::report::{ReportError, ReportExporter, ReportRenderer};
use crate::store::{format_timestamp, Turn};

/// Conversation id used when a request does not name one.
pub const DEFAULT_CONVERSATION_ID: &str = "UNKNOWN";

/// Header carrying the pre-shared key on the health route.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Service name reported by the health route.
pub const SERVICE_NAME: &str = "Agentic Honeypot";

/// Download name of the evidence CSV.
const EVIDENCE_FILENAME: &str = "scam_evidence.csv";

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Shared state behind every route.
#[derive(Clone)]
pub struct AppState {
    honeypot: Arc<Honeypot>,
    reports: ReportExporter,
    renderer: Arc<dyn ReportRenderer>,
    api_key: Arc<str>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("honeypot", &self.honeypot)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Build state; the report exporter reads the pipeline's own store.
    pub fn new(
        honeypot: Arc<Honeypot>,
        renderer: Arc<dyn ReportRenderer>,
        api_key: impl Into<Arc<str>>,
    ) -> Self {
        let reports = ReportExporter::new(Arc::clone(honeypot.store()));
        Self {
            honeypot,
            reports,
            renderer,
            api_key: api_key.into(),
        }
    }
}

/// Build the router with request tracing.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/honeypot", post(engage))
        .route("/api/admin/scams", get(list_scams))
        .route("/api/download/evidence", get(download_evidence))
        .route("/api/pdf/:scammer_id", get(download_report))
        .route("/api/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error responses, one variant per status code.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed request body.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Resource absent; the message is returned to the client.
    #[error("not found: {0}")]
    NotFound(&'static str),
    /// Credentials missing.
    #[error("unauthorized")]
    Unauthorized,
    /// Credentials present but wrong.
    #[error("forbidden")]
    Forbidden,
    /// Unexpected server-side failure; details are logged, not returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({ "status": "error", "message": "API key missing" }),
            ),
            Self::Forbidden => (
                StatusCode::FORBIDDEN,
                json!({ "status": "error", "message": "Invalid API key" }),
            ),
            Self::Internal(msg) => {
                error!(error = %msg, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "An internal error occurred" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// POST /api/honeypot
// ---------------------------------------------------------------------------

/// Inbound scammer message.
#[derive(Debug, Deserialize)]
pub struct EngageRequest {
    /// Message text; missing means empty.
    #[serde(default)]
    pub message: String,
    /// Conversation id.
    #[serde(default)]
    pub scammer_id: Option<String>,
}

/// Body is parsed as JSON whatever the content type says.
async fn engage(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Engagement>, ApiError> {
    let request: EngageRequest =
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let conversation_id = request
        .scammer_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or(DEFAULT_CONVERSATION_ID);

    let engagement = state.honeypot.handle(conversation_id, &request.message).await;
    if !engagement.storage_failures.is_empty() {
        warn!(
            conversation_id,
            failures = engagement.storage_failures.len(),
            "reply returned with storage failures"
        );
    }
    Ok(Json(engagement))
}

// ---------------------------------------------------------------------------
// GET /api/admin/scams
// ---------------------------------------------------------------------------

/// Listing row for the admin dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScamListing {
    /// Conversation id.
    pub scammer_id: String,
    /// RFC 3339 timestamp.
    pub timestamp: String,
    /// Category label.
    pub scam_type: String,
    /// Persona label.
    pub persona: String,
    /// Inbound scammer message.
    pub message: String,
    /// Risk tier.
    pub risk_score: String,
}

impl From<Turn> for ScamListing {
    fn from(turn: Turn) -> Self {
        Self {
            timestamp: format_timestamp(&turn.timestamp),
            scam_type: turn.scam_category.as_str().to_owned(),
            persona: turn.persona.label().to_owned(),
            risk_score: turn.risk_level.as_str().to_owned(),
            scammer_id: turn.conversation_id,
            message: turn.scammer_message,
        }
    }
}

async fn list_scams(State(state): State<AppState>) -> Result<Json<Vec<ScamListing>>, ApiError> {
    let turns = state
        .honeypot
        .store()
        .recent(None)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(turns.into_iter().map(ScamListing::from).collect()))
}

// ---------------------------------------------------------------------------
// Downloads
// ---------------------------------------------------------------------------

fn attachment(content_type: &'static str, filename: &str, bytes: Vec<u8>) -> Response {
    let disposition = format!("attachment; filename=\"{filename}\"");
    let mut response = bytes.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    response
}

/// Reduce a caller-supplied id to characters safe in a filename.
pub fn safe_filename_stem(raw: &str) -> String {
    let stem: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = stem.trim_matches('.');
    if stem.is_empty() {
        "report".to_owned()
    } else {
        stem.to_owned()
    }
}

async fn download_evidence(State(state): State<AppState>) -> Result<Response, ApiError> {
    match state.honeypot.evidence().export().await {
        Ok(bytes) => Ok(attachment("text/csv; charset=utf-8", EVIDENCE_FILENAME, bytes)),
        Err(EvidenceError::NotFound) => Err(ApiError::NotFound("No evidence found")),
        Err(e) => Err(ApiError::Internal(e.to_string())),
    }
}

/// `GET /api/pdf/:scammer_id`. The path is kept for existing clients, but the
/// body is whatever the configured [`ReportRenderer`] emits; with
/// [`PlainTextRenderer`](crate::report::PlainTextRenderer) that is a
/// `text/plain` `<id>.txt` attachment, not a PDF.
async fn download_report(
    State(state): State<AppState>,
    Path(scammer_id): Path<String>,
) -> Result<Response, ApiError> {
    let document = match state.reports.render(&scammer_id).await {
        Ok(document) => document,
        Err(ReportError::NotFound(_)) => {
            return Err(ApiError::NotFound("No records found for this scammer"))
        }
        Err(e) => return Err(ApiError::Internal(e.to_string())),
    };
    let filename = format!(
        "{}.{}",
        safe_filename_stem(&scammer_id),
        state.renderer.file_extension()
    );
    Ok(attachment(
        state.renderer.content_type(),
        &filename,
        state.renderer.render(&document),
    ))
}

// ---------------------------------------------------------------------------
// GET /api/health
// ---------------------------------------------------------------------------

/// Compare without short-circuiting on the first differing byte.
fn keys_match(given: &[u8], expected: &[u8]) -> bool {
    if given.len() != expected.len() {
        return false;
    }
    given
        .iter()
        .zip(expected)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

async fn health(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let given = headers
        .get(API_KEY_HEADER)
        .map(HeaderValue::as_bytes)
        .filter(|value| !value.is_empty())
        .ok_or(ApiError::Unauthorized)?;
    if !keys_match(given, state.api_key.as_bytes()) {
        return Err(ApiError::Forbidden);
    }
    Ok(Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "timestamp": Utc::now().to_rfc3339(),
    })))
}
