//! Completion backend client.
//!
//! Sends `{model, messages, temperature}` to the backend's chat endpoint and
//! hands back the live response body as a [`ByteStream`]. Connection failures
//! and non-2xx answers are [`CitewiseError::BackendUnavailable`]; nothing is
//! retried.
//!
//! # Examples
//!
//! ```no_run
//! use citewise::completion::{CompletionBackend, CompletionRequest, HttpCompletionClient};
//! use citewise::config::BackendConfig;
//! use citewise::message::{ChatMessage, ModelSpec};
//!
//! # async fn example() -> citewise::error::Result<()> {
//! let client = HttpCompletionClient::new(&BackendConfig::default())?;
//! let request = CompletionRequest::new(
//!     ModelSpec::new("local-7b"),
//!     vec![ChatMessage::user("Hello")],
//!     1.0,
//! );
//! let stream = client.send(&request).await?;
//! let answer = citewise::accumulator::accumulate(stream).await?;
//! println!("{answer}");
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Serialize;

use crate::config::BackendConfig;
use crate::error::{CitewiseError, Result};
use crate::message::{ChatMessage, ModelSpec};
use crate::prompt::Prompt;
use crate::sse::ByteStream;

/// Request body for the backend's chat endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    /// Model, forwarded as the caller sent it.
    pub model: ModelSpec,
    /// Conversation, oldest first.
    pub messages: Vec<ChatMessage>,
    /// Out-of-band system prompt, used by pass-through chat.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Sampling temperature.
    pub temperature: f32,
}

impl CompletionRequest {
    /// A request with no out-of-band prompt.
    pub fn new(model: ModelSpec, messages: Vec<ChatMessage>, temperature: f32) -> Self {
        Self {
            model,
            messages,
            prompt: None,
            temperature,
        }
    }

    /// The two-message request for a grounded prompt.
    pub fn grounded(model: ModelSpec, prompt: &Prompt, temperature: f32) -> Self {
        Self::new(model, prompt.to_messages(), temperature)
    }

    /// Attach an out-of-band system prompt.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }
}

/// A streaming chat backend.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Start a completion and return the response body stream.
    async fn send(&self, request: &CompletionRequest) -> Result<ByteStream>;

    /// Fetch the backend's model list.
    async fn models(&self) -> Result<serde_json::Value>;
}

/// HTTP implementation of [`CompletionBackend`].
#[derive(Clone)]
pub struct HttpCompletionClient {
    client: reqwest::Client,
    chat_url: String,
    models_url: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for HttpCompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCompletionClient")
            .field("chat_url", &self.chat_url)
            .field("models_url", &self.models_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl HttpCompletionClient {
    /// Create a client for the configured backend.
    ///
    /// The client has a connect timeout but no overall deadline: completion
    /// streams may run for as long as the backend keeps sending.
    ///
    /// # Errors
    ///
    /// Returns [`CitewiseError::Config`] if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| CitewiseError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, config))
    }

    /// Create a client around an existing `reqwest::Client`.
    pub fn with_client(client: reqwest::Client, config: &BackendConfig) -> Self {
        Self {
            client,
            chat_url: config.chat_url(),
            models_url: config.models_url(),
            api_key: config.api_key.clone(),
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    /// Map a non-2xx answer to [`CitewiseError::BackendUnavailable`].
    fn map_http_error(status: reqwest::StatusCode, body: &str) -> CitewiseError {
        let message = extract_error_message(body);
        CitewiseError::BackendUnavailable(format!("backend HTTP {}: {message}", status.as_u16()))
    }
}

/// Extract an error message from a JSON error body, falling back to the raw text.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            let error = v.get("error")?;
            error
                .get("message")
                .and_then(|m| m.as_str())
                .or_else(|| error.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl CompletionBackend for HttpCompletionClient {
    fn name(&self) -> &str {
        "http"
    }

    async fn send(&self, request: &CompletionRequest) -> Result<ByteStream> {
        tracing::trace!(
            model = %request.model.id,
            messages = request.messages.len(),
            "sending completion request"
        );

        let response = self
            .authorize(self.client.post(&self.chat_url))
            .json(request)
            .send()
            .await
            .map_err(|e| {
                CitewiseError::BackendUnavailable(format!(
                    "backend request failed: {}",
                    e.without_url()
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Self::map_http_error(status, &body_text));
        }

        let stream = response.bytes_stream().map(|chunk| {
            chunk.map_err(|e| {
                CitewiseError::StreamInterrupted(format!("stream read error: {}", e.without_url()))
            })
        });
        Ok(Box::pin(stream))
    }

    async fn models(&self) -> Result<serde_json::Value> {
        let response = self
            .authorize(self.client.get(&self.models_url))
            .send()
            .await
            .map_err(|e| {
                CitewiseError::BackendUnavailable(format!(
                    "backend request failed: {}",
                    e.without_url()
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Self::map_http_error(status, &body_text));
        }

        response.json().await.map_err(|e| {
            CitewiseError::BackendUnavailable(format!("invalid model list: {}", e.without_url()))
        })
    }
}
