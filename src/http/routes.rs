//! REST and SSE handlers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::{Stream, StreamExt};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use super::envelope::{ApiError, ErrorBody, Success};
use crate::error::ValidationError;
use crate::mcp::streamable_http_service;
use crate::process::{StreamEvent, StreamingProcess};
use crate::service::{ChatParams, GeminiService, SearchParams};

/// Builds the application router.
///
/// | Route                   | Response                                    |
/// |-------------------------|---------------------------------------------|
/// | `GET /health`           | `{"status":"ok","version":...}`             |
/// | `POST /api/search`      | envelope, `result` is the parsed JSON array |
/// | `POST /api/chat`        | envelope, `result` is the reply text        |
/// | `POST /api/chat/stream` | SSE: `stdout`, `stderr`, `close`, `error`   |
/// | `/mcp`                  | MCP streamable HTTP                         |
pub fn router(service: Arc<GeminiService>, shutdown: &CancellationToken) -> Router {
    let mcp = streamable_http_service(Arc::clone(&service), shutdown);
    Router::new()
        .route("/health", get(health))
        .route("/api/search", post(search))
        .route("/api/chat", post(chat))
        .route("/api/chat/stream", post(chat_stream))
        .with_state(service)
        .nest_service("/mcp", mcp)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn search(
    State(service): State<Arc<GeminiService>>,
    payload: Result<Json<SearchParams>, JsonRejection>,
) -> Result<Json<Success>, ApiError> {
    let Json(params) = payload.map_err(reject)?;
    let output = service.search(&params).await?;
    let result = serde_json::from_str(&output).unwrap_or(Value::String(output));
    Ok(Json(Success::new(result)))
}

async fn chat(
    State(service): State<Arc<GeminiService>>,
    payload: Result<Json<ChatParams>, JsonRejection>,
) -> Result<Json<Success>, ApiError> {
    let Json(params) = payload.map_err(reject)?;
    let reply = service.chat(&params).await?;
    Ok(Json(Success::new(Value::String(reply))))
}

async fn chat_stream(
    State(service): State<Arc<GeminiService>>,
    payload: Result<Json<ChatParams>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(params) = payload.map_err(reject)?;
    let process = service.chat_stream(&params)?;
    tracing::debug!(pid = ?process.pid(), "streaming chat started");
    Ok(Sse::new(sse_events(process))
        .keep_alive(KeepAlive::default())
        .into_response())
}

/// Maps process events to SSE events.
///
/// The response body owns the process; a client disconnect drops it, which
/// terminates the CLI.
fn sse_events(process: StreamingProcess) -> impl Stream<Item = Result<Event, axum::Error>> {
    process.map(|event| {
        let sse = Event::default().event(event.kind());
        match &event {
            StreamEvent::Stdout(chunk) | StreamEvent::Stderr(chunk) => {
                sse.json_data(json!({ "data": chunk }))
            }
            StreamEvent::Close { code } => sse.json_data(json!({ "code": code })),
            StreamEvent::Error(e) => sse.json_data(ErrorBody::from(e)),
        }
    })
}

fn reject(rejection: JsonRejection) -> ApiError {
    ValidationError::new("body", rejection.body_text()).into()
}
