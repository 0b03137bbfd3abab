//! Google Custom Search JSON API provider.
//!
//! Issues `GET {base}/customsearch/v1?key=..&cx=..&q=..&num=..` and maps the
//! returned `items` to candidate sources in the provider's ranking order.

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::http;
use crate::provider::SearchProvider;
use crate::types::{ProviderCredentials, Source};
use serde::Deserialize;
use url::Url;

/// Google Custom Search provider.
///
/// Holds one HTTP client, reused across requests.
#[derive(Debug, Clone)]
pub struct GoogleProvider {
    client: reqwest::Client,
}

impl GoogleProvider {
    /// Create a provider with a client built from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        Ok(Self {
            client: http::build_client(config)?,
        })
    }

    /// Create a provider around an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn request_url(
        base_url: &str,
        query: &str,
        credentials: &ProviderCredentials,
        max_results: usize,
    ) -> Result<Url, SearchError> {
        let endpoint = format!("{}/customsearch/v1", base_url.trim_end_matches('/'));
        let num = max_results.to_string();
        Url::parse_with_params(
            &endpoint,
            [
                ("key", credentials.api_key.as_str()),
                ("cx", credentials.engine_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ],
        )
        .map_err(|e| SearchError::Config(format!("invalid provider base URL: {e}")))
    }
}

impl SearchProvider for GoogleProvider {
    async fn search(
        &self,
        query: &str,
        credentials: Option<&ProviderCredentials>,
        config: &SearchConfig,
    ) -> Result<Vec<Source>, SearchError> {
        tracing::trace!(query, "Google custom search");

        let credentials = config.resolve_credentials(credentials)?;
        let url = Self::request_url(
            &config.provider_base_url,
            query,
            &credentials,
            config.max_results,
        )?;

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .timeout(config.provider_timeout())
            .send()
            .await
            .map_err(|e| SearchError::Http(format!("Google request failed: {}", e.without_url())))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SearchError::Http(format!("Google response read failed: {e}")))?;

        if !status.is_success() {
            return Err(SearchError::Provider(format!(
                "Google HTTP {}: {}",
                status.as_u16(),
                extract_error_message(&body)
            )));
        }

        tracing::trace!(bytes = body.len(), "Google response received");

        parse_search_response(&body, config.max_results)
    }

    fn name(&self) -> &'static str {
        "Google"
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    items: Option<Vec<Item>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Item {
    #[serde(default)]
    title: String,
    link: Option<String>,
    #[serde(default)]
    display_link: String,
    #[serde(default)]
    snippet: String,
    pagemap: Option<PageMap>,
}

#[derive(Debug, Deserialize)]
struct PageMap {
    #[serde(default)]
    cse_image: Vec<CseImage>,
}

#[derive(Debug, Deserialize)]
struct CseImage {
    src: Option<String>,
}

/// Parse a Custom Search JSON payload into candidate sources.
///
/// Extracted as a separate function for testability with canned payloads.
pub(crate) fn parse_search_response(
    body: &str,
    max_results: usize,
) -> Result<Vec<Source>, SearchError> {
    let payload: SearchResponse = serde_json::from_str(body)
        .map_err(|e| SearchError::Provider(format!("malformed Google payload: {e}")))?;

    let items = payload
        .items
        .ok_or_else(|| SearchError::Provider("Google payload has no items list".into()))?;

    let sources: Vec<Source> = items
        .into_iter()
        .filter_map(|item| {
            let link = item.link.filter(|l| !l.trim().is_empty())?;
            let image = item
                .pagemap
                .and_then(|p| p.cse_image.into_iter().next())
                .and_then(|img| img.src);
            Some(Source {
                title: item.title.trim().to_owned(),
                link,
                display_link: item.display_link,
                snippet: item.snippet.trim().to_owned(),
                image,
                text: String::new(),
            })
        })
        .take(max_results)
        .collect();

    tracing::debug!(count = sources.len(), "Google results parsed");
    Ok(sources)
}

/// Extract `error.message` from a Google error body, falling back to the body.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.chars().take(200).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "kind": "customsearch#search",
        "items": [
            {
                "title": "Paris - Wikipedia",
                "link": "https://en.wikipedia.org/wiki/Paris",
                "displayLink": "en.wikipedia.org",
                "snippet": "Paris is the capital and most populous city of France.",
                "pagemap": {"cse_image": [{"src": "https://upload.example/paris.jpg"}]}
            },
            {
                "title": "Paris | History, Map, Population",
                "link": "https://www.britannica.com/place/Paris",
                "displayLink": "www.britannica.com",
                "snippet": "Paris, city and capital of France."
            },
            {
                "title": "Broken item without link",
                "displayLink": "nowhere.example"
            }
        ]
    }"#;

    fn credentials() -> ProviderCredentials {
        ProviderCredentials {
            api_key: "test-key".into(),
            engine_id: "test-cx".into(),
        }
    }

    #[test]
    fn parses_items_in_order() {
        let sources = parse_search_response(FIXTURE, 10).expect("should parse");
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].title, "Paris - Wikipedia");
        assert_eq!(sources[0].display_link, "en.wikipedia.org");
        assert_eq!(
            sources[0].image.as_deref(),
            Some("https://upload.example/paris.jpg")
        );
        assert_eq!(sources[1].link, "https://www.britannica.com/place/Paris");
        assert!(sources[1].image.is_none());
        assert!(sources.iter().all(Source::is_pending));
    }

    #[test]
    fn respects_max_results() {
        let sources = parse_search_response(FIXTURE, 1).expect("should parse");
        assert_eq!(sources.len(), 1);
    }

    #[test]
    fn missing_items_is_provider_error() {
        let err = parse_search_response(r#"{"kind":"customsearch#search"}"#, 5).unwrap_err();
        assert!(matches!(err, SearchError::Provider(_)));
        assert!(err.to_string().contains("no items"));
    }

    #[test]
    fn malformed_payload_is_provider_error() {
        let err = parse_search_response("<html>not json</html>", 5).unwrap_err();
        assert!(matches!(err, SearchError::Provider(_)));
    }

    #[test]
    fn empty_items_is_ok() {
        let sources = parse_search_response(r#"{"items": []}"#, 5).expect("should parse");
        assert!(sources.is_empty());
    }

    #[test]
    fn request_url_encodes_query() {
        let url = GoogleProvider::request_url(
            "https://customsearch.googleapis.com/",
            "capital of France?",
            &credentials(),
            5,
        )
        .expect("valid url");
        assert_eq!(url.path(), "/customsearch/v1");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("q".into(), "capital of France?".into())));
        assert!(pairs.contains(&("cx".into(), "test-cx".into())));
        assert!(pairs.contains(&("num".into(), "5".into())));
    }

    #[test]
    fn extract_error_from_json() {
        let body = r#"{"error":{"code":403,"message":"API key not valid."}}"#;
        assert_eq!(extract_error_message(body), "API key not valid.");
    }

    #[test]
    fn extract_error_falls_back_to_body() {
        assert_eq!(extract_error_message("Service Unavailable"), "Service Unavailable");
    }

    #[test]
    fn provider_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GoogleProvider>();
    }

    #[tokio::test]
    #[ignore] // Live test: needs GOOGLE_API_KEY / GOOGLE_CSE_ID; run with `cargo test -- --ignored`
    async fn live_google_search() {
        let config = SearchConfig::default();
        let provider = GoogleProvider::new(&config).expect("client");
        let results = provider
            .search("rust programming", None, &config)
            .await
            .expect("live search should work");
        assert!(!results.is_empty());
    }
}
