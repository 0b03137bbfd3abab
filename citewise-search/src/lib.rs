//! # citewise-search
//!
//! Web search and readable-text extraction for grounded answers.
//!
//! Given a query, this crate asks a search provider for candidate pages,
//! fetches every candidate concurrently under a per-source deadline, extracts
//! and sanitises each page's primary text, and returns the successful pages
//! as an ordered [`SourceSet`].
//!
//! ## Design
//!
//! - One provider request per query, no retries; provider failure is fatal
//! - Unbounded concurrent fan-out over the (small) candidate list
//! - Each fetch races a timer; the losing download is aborted
//! - Per-source failures are [`FetchOutcome`] values, never errors
//! - Provider ranking order is preserved for citation numbering
//!
//! ## Security
//!
//! - Search queries are logged only at trace level
//! - API keys never appear in errors or `Debug` output

pub mod aggregator;
pub mod config;
pub mod content;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod provider;
pub mod providers;
pub mod sanitize;
pub mod types;

pub use config::SearchConfig;
pub use error::{Result, SearchError};
pub use fetcher::SourceFetcher;
pub use provider::SearchProvider;
pub use providers::GoogleProvider;
pub use types::{FetchFailure, FetchOutcome, ProviderCredentials, Source, SourceSet};

/// A search provider paired with a page fetcher.
///
/// Both share one HTTP client. Construct once and reuse across requests.
#[derive(Debug, Clone)]
pub struct WebSearch<P = GoogleProvider> {
    provider: P,
    fetcher: SourceFetcher,
    config: SearchConfig,
}

impl WebSearch<GoogleProvider> {
    /// Create a Google-backed search from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if `config` is invalid, or
    /// [`SearchError::Http`] if the HTTP client cannot be built.
    pub fn new(config: SearchConfig) -> Result<Self> {
        config.validate()?;
        let client = http::build_client(&config)?;
        Ok(Self {
            provider: GoogleProvider::with_client(client.clone()),
            fetcher: SourceFetcher::with_client(client, &config),
            config,
        })
    }
}

impl<P: SearchProvider> WebSearch<P> {
    /// Create a search around a custom provider.
    ///
    /// # Errors
    ///
    /// Same as [`WebSearch::new`].
    pub fn with_provider(provider: P, config: SearchConfig) -> Result<Self> {
        config.validate()?;
        let fetcher = SourceFetcher::new(&config)?;
        Ok(Self {
            provider,
            fetcher,
            config,
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Ask the provider for candidate sources (text unset).
    ///
    /// # Errors
    ///
    /// Propagates the provider's [`SearchError`]; this is fatal for the request.
    pub async fn candidates(
        &self,
        query: &str,
        credentials: Option<&ProviderCredentials>,
    ) -> Result<Vec<Source>> {
        self.provider.search(query, credentials, &self.config).await
    }

    /// Search and fetch: the ordered set of sources with extracted text.
    ///
    /// # Errors
    ///
    /// Only provider failures are errors. Sources that fail to fetch are
    /// dropped, and an empty set is a valid result.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # async fn example() -> citewise_search::Result<()> {
    /// let search = citewise_search::WebSearch::new(Default::default())?;
    /// let sources = search.search("capital of France", None).await?;
    /// for (n, source) in sources.cited() {
    ///     println!("[{n}] {} ({})", source.title, source.link);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn search(
        &self,
        query: &str,
        credentials: Option<&ProviderCredentials>,
    ) -> Result<SourceSet> {
        let candidates = self.candidates(query, credentials).await?;
        tracing::debug!(
            provider = self.provider.name(),
            count = candidates.len(),
            "candidates received"
        );
        Ok(aggregator::gather_sources(&self.fetcher, candidates).await)
    }
}
