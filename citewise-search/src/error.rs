//! Error types for the citewise-search crate.
//!
//! Only request-fatal failures live here. Per-source fetch failures are
//! values ([`crate::types::FetchFailure`]), never errors, so a single bad page
//! cannot abort a batch. No API keys appear in error messages.

/// Errors that abort a search request.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The search provider answered with a non-success status or a payload
    /// without a result list.
    #[error("search provider error: {0}")]
    Provider(String),

    /// An HTTP request to the search provider could not be completed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Failed to parse a provider response or page document.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid search configuration or missing credentials.
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience type alias for citewise-search results.
pub type Result<T> = std::result::Result<T, SearchError>;
