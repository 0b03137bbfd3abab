//! Search configuration with sensible defaults.
//!
//! [`SearchConfig`] controls the provider endpoint and credentials, how many
//! candidates are requested, the per-source fetch deadline and the text cap
//! applied to every extracted page.

use crate::error::SearchError;
use crate::types::ProviderCredentials;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of candidate sources requested from the provider.
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// The provider returns at most this many results per request.
pub const PROVIDER_PAGE_LIMIT: usize = 10;

/// Default per-source fetch deadline in milliseconds.
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 5_000;

/// Default character cap for a source's extracted text.
pub const DEFAULT_TEXT_CAP: usize = 2_000;

/// Default Google Custom Search endpoint.
pub const DEFAULT_PROVIDER_BASE_URL: &str = "https://customsearch.googleapis.com";

/// Environment variable consulted for the provider API key.
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Environment variable consulted for the provider engine id.
pub const ENGINE_ID_ENV: &str = "GOOGLE_CSE_ID";

/// Configuration for searching and fetching sources.
///
/// Use [`Default::default()`] for sensible defaults, or construct with
/// field overrides for custom behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Base URL of the search provider API.
    pub provider_base_url: String,
    /// Credentials used when a request carries none of its own.
    pub credentials: Option<ProviderCredentials>,
    /// Maximum number of candidate sources requested from the provider.
    pub max_results: usize,
    /// Timeout for the provider request, in seconds.
    pub provider_timeout_seconds: u64,
    /// Per-source page fetch deadline, in milliseconds.
    pub fetch_timeout_ms: u64,
    /// Maximum characters of sanitised text kept per source.
    pub text_cap: usize,
    /// Pages whose body exceeds this many bytes are abandoned.
    pub max_page_bytes: usize,
    /// Custom User-Agent string. If `None`, rotates through a built-in list
    /// of realistic browser User-Agents.
    pub user_agent: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider_base_url: DEFAULT_PROVIDER_BASE_URL.to_owned(),
            credentials: None,
            max_results: DEFAULT_MAX_RESULTS,
            provider_timeout_seconds: 8,
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
            text_cap: DEFAULT_TEXT_CAP,
            max_page_bytes: 2 * 1024 * 1024,
            user_agent: None,
        }
    }
}

impl SearchConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `max_results` must be within `1..=10`
    /// - `provider_timeout_seconds` and `fetch_timeout_ms` must be greater than 0
    /// - `text_cap` and `max_page_bytes` must be greater than 0
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.max_results == 0 || self.max_results > PROVIDER_PAGE_LIMIT {
            return Err(SearchError::Config(format!(
                "max_results must be between 1 and {PROVIDER_PAGE_LIMIT}"
            )));
        }
        if self.provider_timeout_seconds == 0 {
            return Err(SearchError::Config(
                "provider_timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.fetch_timeout_ms == 0 {
            return Err(SearchError::Config(
                "fetch_timeout_ms must be greater than 0".into(),
            ));
        }
        if self.text_cap == 0 {
            return Err(SearchError::Config("text_cap must be greater than 0".into()));
        }
        if self.max_page_bytes == 0 {
            return Err(SearchError::Config(
                "max_page_bytes must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// The provider request timeout.
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_seconds)
    }

    /// The per-source fetch deadline.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Resolve the credentials for one request.
    ///
    /// Per-request credentials win, then configured ones, then the
    /// `GOOGLE_API_KEY` / `GOOGLE_CSE_ID` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if no complete credential pair is found.
    pub fn resolve_credentials(
        &self,
        request: Option<&ProviderCredentials>,
    ) -> Result<ProviderCredentials, SearchError> {
        let pick = |from_request: Option<&str>, from_config: Option<&str>, env: &str| {
            from_request
                .filter(|v| !v.is_empty())
                .or(from_config.filter(|v| !v.is_empty()))
                .map(str::to_owned)
                .or_else(|| std::env::var(env).ok().filter(|v| !v.is_empty()))
        };

        let api_key = pick(
            request.map(|c| c.api_key.as_str()),
            self.credentials.as_ref().map(|c| c.api_key.as_str()),
            API_KEY_ENV,
        );
        let engine_id = pick(
            request.map(|c| c.engine_id.as_str()),
            self.credentials.as_ref().map(|c| c.engine_id.as_str()),
            ENGINE_ID_ENV,
        );

        match (api_key, engine_id) {
            (Some(api_key), Some(engine_id)) => Ok(ProviderCredentials { api_key, engine_id }),
            (None, _) => Err(SearchError::Config("search provider API key is not set".into())),
            (_, None) => Err(SearchError::Config(
                "search provider engine id is not set".into(),
            )),
        }
    }
}
