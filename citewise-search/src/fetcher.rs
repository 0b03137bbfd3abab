//! Per-source page fetching under a deadline.
//!
//! [`SourceFetcher::fetch`] downloads one candidate page in its own task and
//! races it against a timer. Whatever happens, the caller gets a
//! [`FetchOutcome`]; nothing here returns an error or panics across the
//! fan-out boundary.

use crate::config::SearchConfig;
use crate::content;
use crate::error::SearchError;
use crate::http;
use crate::sanitize::{sanitize, truncate_chars};
use crate::types::{FetchFailure, FetchOutcome, Source};
use std::time::Duration;
use url::Url;

/// `Accept` header sent with page requests.
const PAGE_ACCEPT: &str = "text/html,application/xhtml+xml;q=0.9,*/*;q=0.5";

/// Fetches candidate pages and fills in their readable text.
#[derive(Debug, Clone)]
pub struct SourceFetcher {
    client: reqwest::Client,
    timeout: Duration,
    text_cap: usize,
    max_page_bytes: usize,
}

impl SourceFetcher {
    /// Create a fetcher with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        Ok(Self::with_client(http::build_client(config)?, config))
    }

    /// Create a fetcher that shares an existing client.
    pub fn with_client(client: reqwest::Client, config: &SearchConfig) -> Self {
        Self {
            client,
            timeout: config.fetch_timeout(),
            text_cap: config.text_cap,
            max_page_bytes: config.max_page_bytes,
        }
    }

    /// The per-source deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch `source.link` and return the source with its text populated.
    ///
    /// The download runs in a spawned task raced against the deadline. If
    /// the timer wins, the task is aborted, which drops the in-flight request,
    /// and the outcome is [`FetchFailure::Timeout`].
    pub async fn fetch(&self, source: Source) -> FetchOutcome {
        if let Err(e) = Url::parse(&source.link) {
            return FetchOutcome::Failure(FetchFailure::Network(format!("invalid link: {e}")));
        }

        let mut task = tokio::spawn(download(
            self.client.clone(),
            source.link.clone(),
            self.max_page_bytes,
        ));

        let joined = tokio::select! {
            joined = &mut task => Some(joined),
            () = tokio::time::sleep(self.timeout) => None,
        };

        let html = match joined {
            Some(Ok(Ok(html))) => html,
            Some(Ok(Err(failure))) => return FetchOutcome::Failure(failure),
            Some(Err(e)) => {
                return FetchOutcome::Failure(FetchFailure::Network(format!(
                    "fetch task failed: {e}"
                )))
            }
            None => {
                task.abort();
                tracing::trace!(link = %source.link, "fetch deadline hit, request aborted");
                return FetchOutcome::Failure(FetchFailure::Timeout);
            }
        };

        build_source(source, &html, self.text_cap)
    }
}

/// Download a page body, rejecting non-HTML responses and oversized bodies.
async fn download(
    client: reqwest::Client,
    link: String,
    max_bytes: usize,
) -> Result<String, FetchFailure> {
    let mut response = client
        .get(&link)
        .header(reqwest::header::ACCEPT, PAGE_ACCEPT)
        .send()
        .await
        .map_err(|e| FetchFailure::Network(e.without_url().to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchFailure::Status(status.as_u16()));
    }

    if let Some(content_type) = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    {
        if !is_html(content_type) {
            return Err(FetchFailure::UnsupportedContent(content_type.to_owned()));
        }
    }

    let mut body: Vec<u8> = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| FetchFailure::Network(e.without_url().to_string()))?
    {
        if body.len() + chunk.len() > max_bytes {
            return Err(FetchFailure::ExtractError(format!(
                "page exceeds {max_bytes} bytes"
            )));
        }
        body.extend_from_slice(&chunk);
    }

    tracing::trace!(bytes = body.len(), "page downloaded");
    Ok(String::from_utf8_lossy(&body).into_owned())
}

/// Whether a `Content-Type` value denotes an HTML document.
fn is_html(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "text/html" || mime == "application/xhtml+xml"
}

/// Extract, sanitise and cap the text of `html` into `source`.
pub(crate) fn build_source(source: Source, html: &str, text_cap: usize) -> FetchOutcome {
    let page = match content::extract_readable(html) {
        Ok(page) => page,
        Err(e) => return FetchOutcome::Failure(FetchFailure::ExtractError(e.to_string())),
    };

    let text = sanitize(&page.text);
    if text.is_empty() {
        return FetchOutcome::Failure(FetchFailure::NoContent);
    }

    let title = if source.title.is_empty() {
        page.title
    } else {
        source.title
    };

    FetchOutcome::Success(Source {
        title,
        text: truncate_chars(&text, text_cap),
        ..source
    })
}
