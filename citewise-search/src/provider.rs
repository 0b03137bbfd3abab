//! Trait definition for pluggable search providers.
//!
//! A provider turns a query into an ordered list of candidate [`Source`]s
//! with empty text. The order it returns is the order citations use.

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::types::{ProviderCredentials, Source};

/// A search backend that yields candidate sources.
///
/// Implementations issue exactly one request per call and never retry.
/// All implementations must be `Send + Sync` so a single provider can serve
/// concurrent requests.
pub trait SearchProvider: Send + Sync {
    /// Search for `query` and return at most `config.max_results` candidates.
    ///
    /// # Arguments
    ///
    /// * `query`: The trimmed user query (encoding is handled here).
    /// * `credentials`: Per-request credentials, overriding configured ones.
    /// * `config`: Search configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Provider`] on a non-success status or a payload
    /// without a result list, [`SearchError::Http`] if the request cannot be
    /// completed, and [`SearchError::Config`] if credentials are missing.
    fn search(
        &self,
        query: &str,
        credentials: Option<&ProviderCredentials>,
        config: &SearchConfig,
    ) -> impl std::future::Future<Output = Result<Vec<Source>, SearchError>> + Send;

    /// Human-readable provider name, used in logs.
    fn name(&self) -> &'static str;
}
