//! HTTP surface for the answer pipeline.
//!
//! ## Endpoints
//!
//! - `POST /api/google`: search-augmented answer, `{"answer": "..."}`
//! - `POST /api/chat`: pass-through chat, streamed back as `text/event-stream`
//! - `GET /api/models`: the completion backend's model list
//!
//! Every failure, including a body that does not parse, answers `500` with a
//! generic `{"error": "..."}` body; the detailed cause is only logged.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::info;

use crate::completion::{CompletionBackend, CompletionRequest};
use crate::config::CitewiseConfig;
use crate::error::{CitewiseError, Result};
use crate::history::trim_history;
use crate::message::{ChatMessage, ModelSpec};
use crate::pipeline::{AnswerPipeline, AnswerRequest};

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// `POST /api/chat` body.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    /// Backend model, forwarded as given.
    pub model: ModelSpec,
    /// Conversation, oldest first.
    pub messages: Vec<ChatMessage>,
    /// System prompt override.
    #[serde(default)]
    pub prompt: Option<String>,
    /// Temperature override.
    #[serde(default)]
    pub temperature: Option<f32>,
}

/// `POST /api/google` success body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResponse {
    /// The grounded answer.
    pub answer: String,
}

/// Generic error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Opaque error description.
    pub error: String,
}

// ---------------------------------------------------------------------------
// Shared application state
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct AppState {
    pipeline: Arc<AnswerPipeline>,
    system_prompt: Arc<str>,
    chat_temperature: f32,
}

// ---------------------------------------------------------------------------
// CitewiseServer
// ---------------------------------------------------------------------------

/// The citewise HTTP server, serving in a background task.
pub struct CitewiseServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl CitewiseServer {
    /// Validate `config`, bind `{server.host}:{server.port}` and start serving.
    ///
    /// Use port `0` for an ephemeral port.
    ///
    /// # Errors
    ///
    /// Returns [`CitewiseError::Config`] for an invalid config and
    /// [`CitewiseError::Io`] if the listener cannot bind.
    pub async fn start(config: &CitewiseConfig) -> Result<Self> {
        let pipeline = AnswerPipeline::from_config(config)?;
        let state = AppState {
            pipeline: Arc::new(pipeline),
            system_prompt: Arc::from(config.backend.system_prompt.as_str()),
            chat_temperature: config.backend.chat_temperature,
        };

        let app = Router::new()
            .route("/api/google", post(handle_google))
            .route("/api/chat", post(handle_chat))
            .route("/api/models", get(handle_models))
            .with_state(state);

        let bind_addr = format!("{}:{}", config.server.host, config.server.port);
        let listener = TcpListener::bind(&bind_addr).await?;
        let addr = listener.local_addr()?;

        info!("citewise listening on http://{addr}/api");

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("server error: {e}");
            }
        });

        Ok(Self { addr, handle })
    }

    /// Returns the address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Abort the server task.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for CitewiseServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Log `err` and answer with an opaque 500.
fn internal_error(route: &str, err: &CitewiseError) -> Response {
    match err {
        CitewiseError::InvalidRequest(_) => tracing::warn!(route, code = err.code(), "{err}"),
        _ => tracing::error!(route, code = err.code(), "{err}"),
    }
    let body = ErrorResponse {
        error: format!("{route} failed"),
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

/// Unwrap a JSON body, turning axum's rejection into the opaque 500.
fn json_body<T>(
    route: &str,
    payload: std::result::Result<Json<T>, JsonRejection>,
) -> std::result::Result<T, Response> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        let err = CitewiseError::InvalidRequest(rejection.body_text());
        internal_error(route, &err)
    })
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// `POST /api/google`: search, ground and answer.
async fn handle_google(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AnswerRequest>, JsonRejection>,
) -> Response {
    let request = match json_body("answer", payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    match state.pipeline.answer(&request).await {
        Ok(answer) => Json(AnswerResponse {
            answer: answer.text,
        })
        .into_response(),
        Err(e) => internal_error("answer", &e),
    }
}

/// `POST /api/chat`: trim history and stream the backend's reply through.
async fn handle_chat(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let request = match json_body("chat", payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let system_prompt = request
        .prompt
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| state.system_prompt.to_string());
    let temperature = request.temperature.unwrap_or(state.chat_temperature);
    let messages = trim_history(&request.messages, &system_prompt, request.model.token_limit);

    let completion =
        CompletionRequest::new(request.model, messages, temperature).with_prompt(system_prompt);

    match state.pipeline.backend().send(&completion).await {
        Ok(stream) => Response::builder()
            .header(header::CONTENT_TYPE, "text/event-stream")
            .header(header::CACHE_CONTROL, "no-cache")
            .body(Body::from_stream(stream))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        Err(e) => internal_error("chat", &e),
    }
}

/// `GET /api/models`: proxy the backend's model list.
async fn handle_models(State(state): State<AppState>) -> Response {
    match state.pipeline.backend().models().await {
        Ok(models) => Json(models).into_response(),
        Err(e) => internal_error("models", &e),
    }
}
