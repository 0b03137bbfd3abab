//! The search-augmented answer pipeline.
//!
//! One call runs: query extraction → provider search → concurrent page
//! fetching → grounded prompt → completion stream → accumulated answer.
//! Nothing survives the call; each request owns its sources and prompt.

use chrono::NaiveDate;
use citewise_search::{GoogleProvider, ProviderCredentials, SearchProvider, SourceSet, WebSearch};
use serde::Deserialize;
use tracing::Instrument;

use crate::accumulator::accumulate;
use crate::completion::{CompletionBackend, CompletionRequest, HttpCompletionClient};
use crate::config::CitewiseConfig;
use crate::error::{CitewiseError, Result};
use crate::message::{ChatMessage, ModelSpec};
use crate::prompt::{Prompt, PromptBuilder};

/// Body of a search-augmented answer request.
#[derive(Debug, Clone, Deserialize)]
pub struct AnswerRequest {
    /// Conversation so far; the last message is the query.
    pub messages: Vec<ChatMessage>,
    /// Backend model, forwarded as given.
    pub model: ModelSpec,
    /// Per-request provider API key.
    #[serde(default, rename = "googleAPIKey")]
    pub google_api_key: Option<String>,
    /// Per-request provider engine id.
    #[serde(default, rename = "googleCSEId")]
    pub google_cse_id: Option<String>,
}

impl AnswerRequest {
    /// Per-request credentials, if the caller sent any part of them.
    ///
    /// Missing halves stay empty and fall back to configured values.
    pub fn credentials(&self) -> Option<ProviderCredentials> {
        if self.google_api_key.is_none() && self.google_cse_id.is_none() {
            return None;
        }
        Some(ProviderCredentials {
            api_key: self.google_api_key.clone().unwrap_or_default(),
            engine_id: self.google_cse_id.clone().unwrap_or_default(),
        })
    }
}

/// The outcome of one pipeline run.
#[derive(Debug, Clone)]
pub struct Answer {
    /// The accumulated backend answer.
    pub text: String,
    /// Sources the prompt was grounded in, in citation order.
    pub sources: SourceSet,
    /// The prompt that was sent.
    pub prompt: Prompt,
}

/// The trimmed content of the last message.
///
/// # Errors
///
/// [`CitewiseError::InvalidRequest`] if there are no messages or the last one
/// is blank.
pub fn extract_query(messages: &[ChatMessage]) -> Result<String> {
    let query = messages
        .last()
        .map(|m| m.content.trim())
        .unwrap_or_default();
    if query.is_empty() {
        return Err(CitewiseError::InvalidRequest(
            "the last message must contain a query".into(),
        ));
    }
    Ok(query.to_owned())
}

/// Search, ground, complete.
pub struct AnswerPipeline<B = HttpCompletionClient, P = GoogleProvider> {
    search: WebSearch<P>,
    backend: B,
    prompt_builder: PromptBuilder,
    temperature: f32,
}

impl AnswerPipeline {
    /// Build the default Google + HTTP backend pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`CitewiseError::Config`] if the config is invalid.
    pub fn from_config(config: &CitewiseConfig) -> Result<Self> {
        config.validate()?;
        let search = WebSearch::new(config.search.clone())?;
        let backend = HttpCompletionClient::new(&config.backend)?;
        Ok(Self::new(
            search,
            backend,
            PromptBuilder::new(config.prompt.max_sentences),
            config.backend.answer_temperature,
        ))
    }
}

impl<B: CompletionBackend, P: SearchProvider> AnswerPipeline<B, P> {
    /// Assemble a pipeline from its parts.
    pub fn new(
        search: WebSearch<P>,
        backend: B,
        prompt_builder: PromptBuilder,
        temperature: f32,
    ) -> Self {
        Self {
            search,
            backend,
            prompt_builder,
            temperature,
        }
    }

    /// The completion backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Answer `request`, dating the prompt with today's local date.
    ///
    /// # Errors
    ///
    /// See [`AnswerPipeline::answer_on`].
    pub async fn answer(&self, request: &AnswerRequest) -> Result<Answer> {
        self.answer_on(request, chrono::Local::now().date_naive())
            .await
    }

    /// Answer `request` with a fixed prompt date.
    ///
    /// # Errors
    ///
    /// - [`CitewiseError::InvalidRequest`] for an empty query (no network call is made)
    /// - [`CitewiseError::Config`] if provider credentials cannot be resolved
    /// - [`CitewiseError::Provider`] if the search provider fails
    /// - [`CitewiseError::BackendUnavailable`] if the backend cannot be reached
    /// - [`CitewiseError::StreamInterrupted`] if the answer stream breaks off
    ///
    /// Pages that fail to fetch are dropped, never errors.
    pub async fn answer_on(&self, request: &AnswerRequest, date: NaiveDate) -> Result<Answer> {
        let request_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("answer", %request_id);

        async move {
            let query = extract_query(&request.messages)?;
            tracing::trace!(%query, "answering");

            let credentials = request.credentials();
            let sources = self.search.search(&query, credentials.as_ref()).await?;
            tracing::debug!(sources = sources.len(), "sources ready");

            let prompt = self.prompt_builder.build(&query, &sources, date);
            tracing::trace!(
                bytes = prompt.user_content().len(),
                "grounded prompt built"
            );

            let completion =
                CompletionRequest::grounded(request.model.clone(), &prompt, self.temperature);
            let stream = self.backend.send(&completion).await?;
            let text = accumulate(stream).await?;

            tracing::info!(
                sources = sources.len(),
                answer_chars = text.chars().count(),
                "answer complete"
            );
            Ok::<_, CitewiseError>(Answer {
                text,
                sources,
                prompt,
            })
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use bytes::Bytes;
    use citewise_search::{SearchConfig, SearchError, Source};

    use super::*;
    use crate::sse::ByteStream;

    struct FixedProvider {
        result: std::result::Result<Vec<Source>, String>,
    }

    impl SearchProvider for FixedProvider {
        async fn search(
            &self,
            _query: &str,
            _credentials: Option<&ProviderCredentials>,
            _config: &SearchConfig,
        ) -> citewise_search::Result<Vec<Source>> {
            self.result.clone().map_err(SearchError::Provider)
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    #[derive(Default)]
    struct RecordingBackend {
        body: String,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    #[async_trait]
    impl CompletionBackend for RecordingBackend {
        fn name(&self) -> &str {
            "recording"
        }

        async fn send(&self, request: &CompletionRequest) -> Result<ByteStream> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(request.clone());
            }
            let body = Bytes::from(self.body.clone());
            Ok(Box::pin(futures_util::stream::iter(vec![Ok(body)])))
        }

        async fn models(&self) -> Result<serde_json::Value> {
            Ok(serde_json::json!([]))
        }
    }

    fn pipeline(
        provider: FixedProvider,
        body: &str,
    ) -> AnswerPipeline<RecordingBackend, FixedProvider> {
        let search = WebSearch::with_provider(provider, SearchConfig::default()).expect("search");
        let backend = RecordingBackend {
            body: body.to_owned(),
            ..Default::default()
        };
        AnswerPipeline::new(search, backend, PromptBuilder::default(), 1.0)
    }

    fn request(query: &str) -> AnswerRequest {
        AnswerRequest {
            messages: vec![ChatMessage::user(query)],
            model: ModelSpec::new("m"),
            google_api_key: None,
            google_cse_id: None,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).expect("date")
    }

    #[test]
    fn extract_query_trims_last_message() {
        let messages = vec![ChatMessage::user("old"), ChatMessage::user("  new  ")];
        assert_eq!(extract_query(&messages).expect("query"), "new");
    }

    #[test]
    fn extract_query_rejects_empty() {
        assert!(matches!(
            extract_query(&[]),
            Err(CitewiseError::InvalidRequest(_))
        ));
        assert!(matches!(
            extract_query(&[ChatMessage::user(" \n ")]),
            Err(CitewiseError::InvalidRequest(_))
        ));
    }

    #[test]
    fn credentials_absent_when_not_sent() {
        assert!(request("q").credentials().is_none());
    }

    #[test]
    fn partial_credentials_leave_other_half_empty() {
        let mut req = request("q");
        req.google_cse_id = Some("cx".into());
        let creds = req.credentials().expect("some");
        assert_eq!(creds.api_key, "");
        assert_eq!(creds.engine_id, "cx");
    }

    #[test]
    fn request_parses_caller_contract() {
        let req: AnswerRequest = serde_json::from_str(
            r#"{"messages":[{"role":"user","content":"hi"}],
                "model":{"id":"m","name":"M","tokenLimit":4000},
                "googleAPIKey":"k","googleCSEId":"cx"}"#,
        )
        .expect("parse");
        assert_eq!(req.google_api_key.as_deref(), Some("k"));
        assert_eq!(req.google_cse_id.as_deref(), Some("cx"));
        assert_eq!(req.model.token_limit, Some(4000));
    }

    #[tokio::test]
    async fn empty_query_makes_no_calls() {
        let p = pipeline(FixedProvider { result: Ok(Vec::new()) }, "");
        let err = p.answer_on(&request("   "), date()).await.unwrap_err();
        assert!(matches!(err, CitewiseError::InvalidRequest(_)));
        assert!(p.backend().seen.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn provider_failure_is_fatal() {
        let p = pipeline(
            FixedProvider {
                result: Err("HTTP 500".into()),
            },
            "",
        );
        let err = p.answer_on(&request("q"), date()).await.unwrap_err();
        assert!(matches!(err, CitewiseError::Provider(_)));
        assert!(p.backend().seen.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn no_candidates_still_answers_with_marker() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"Unknown.\"}}]}\n\n";
        let p = pipeline(FixedProvider { result: Ok(Vec::new()) }, body);
        let answer = p.answer_on(&request("q"), date()).await.expect("answer");

        assert_eq!(answer.text, "Unknown.");
        assert!(answer.sources.is_empty());
        assert!(
            answer
                .prompt
                .user_content()
                .contains(crate::prompt::NO_SOURCES_MARKER)
        );

        let seen = p.backend().seen.lock().expect("lock");
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].messages.len(), 2);
        assert_eq!(seen[0].temperature, 1.0);
    }

    #[tokio::test]
    async fn empty_stream_yields_no_answer() {
        let p = pipeline(FixedProvider { result: Ok(Vec::new()) }, "data: [DONE]\n\n");
        let answer = p.answer_on(&request("q"), date()).await.expect("answer");
        assert_eq!(answer.text, crate::accumulator::NO_ANSWER);
    }
}
