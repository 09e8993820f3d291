//! HTTP handlers for contract generation, editing and cancellation.

use super::sse::SseEncoder;
use crate::error::ApiError;
use crate::generation::{EditOrchestrator, GenerationOrchestrator, JobHandle, JobRuntime};
use crate::job::{Document, JobId, JobKind};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use futures::StreamExt;
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::info;

pub struct AppState {
    pub generation: GenerationOrchestrator,
    pub edits: EditOrchestrator,
}

impl AppState {
    /// Both orchestrators share one runtime, so either can stop any job.
    pub fn new(runtime: JobRuntime) -> Self {
        Self {
            generation: GenerationOrchestrator::new(runtime.clone()),
            edits: EditOrchestrator::new(runtime),
        }
    }
}

pub type SharedState = Arc<AppState>;

#[derive(Deserialize)]
pub struct CreateContractRequest {
    pub prompt: String,
}

#[derive(Deserialize)]
pub struct EditContractRequest {
    #[serde(default)]
    pub title: String,
    pub content: String,
    pub edit_prompt: String,
    #[serde(default)]
    pub contract_id: Option<String>,
}

#[derive(Deserialize)]
pub struct SuggestEditsRequest {
    #[serde(default)]
    pub title: Option<String>,
    pub content: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ProviderNotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = match self {
            ApiError::InvalidRequest(msg) => msg,
            other => other.to_string(),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/contracts", post(create_contract))
        .route("/contracts/edit", post(edit_contract))
        .route("/contracts/suggestions", post(suggest_edits))
        .route("/contracts/{id}/stop", delete(stop_contract))
        .route("/health", get(health_check))
}

/// Stream a job's events as `text/event-stream`.
fn event_stream(handle: JobHandle, kind: JobKind) -> Response {
    let mut encoder = SseEncoder::new(kind);
    let frames = handle
        .flat_map(move |event| futures::stream::iter(encoder.encode(&event)))
        .map(Ok::<_, Infallible>);
    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(frames),
    )
        .into_response()
}

async fn health_check() -> &'static str {
    "ok"
}

async fn create_contract(
    State(state): State<SharedState>,
    Json(req): Json<CreateContractRequest>,
) -> Result<Response, ApiError> {
    let handle = state.generation.start(&req.prompt).await?;
    Ok(event_stream(handle, JobKind::Generation))
}

async fn edit_contract(
    State(state): State<SharedState>,
    Json(req): Json<EditContractRequest>,
) -> Result<Response, ApiError> {
    let source_id = req
        .contract_id
        .as_deref()
        .map(str::parse::<JobId>)
        .transpose()?;
    let source = Document::from_text(source_id, req.title, req.content);
    let handle = state.edits.start(&source, &req.edit_prompt).await?;
    Ok(event_stream(handle, JobKind::Edit))
}

async fn suggest_edits(
    State(state): State<SharedState>,
    Json(req): Json<SuggestEditsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.content.trim().is_empty() {
        return Err(ApiError::InvalidRequest(
            "Content cannot be empty".to_string(),
        ));
    }
    let document = Document::from_text(None, req.title.unwrap_or_default(), req.content);
    let suggestions = state.edits.suggest_edits(&document).await;
    Ok(Json(serde_json::json!({ "suggestions": suggestions })))
}

/// Always succeeds; `stopped` tells whether a live job was signalled.
async fn stop_contract(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let stopped = match id.parse::<JobId>() {
        Ok(job_id) => state.generation.cancel(&job_id).await,
        Err(_) => false,
    };
    let message = if stopped {
        info!(job_id = %id, "Contract generation stopped by user");
        format!("Contract generation {} stopped successfully", id)
    } else {
        format!("Contract {} not found or already completed", id)
    };
    Json(serde_json::json!({ "message": message, "stopped": stopped }))
}
