//! Core types for candidate sources, fetch outcomes and the ordered source set.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single search result, optionally carrying its extracted page text.
///
/// The search provider creates sources with an empty `text`; the fetcher
/// either returns a copy with `text` populated or drops the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    /// The title of the result page.
    pub title: String,
    /// The URL of the result page.
    pub link: String,
    /// The human-readable host shown by the provider (e.g. `en.wikipedia.org`).
    pub display_link: String,
    /// The provider's snippet for this result.
    pub snippet: String,
    /// Optional thumbnail image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Sanitised readable text of the page. Empty until fetched.
    #[serde(default)]
    pub text: String,
}

impl Source {
    /// Whether this source still awaits its page text.
    pub fn is_pending(&self) -> bool {
        self.text.is_empty()
    }
}

/// Why fetching a single source failed.
///
/// These never escalate past the aggregator; a failed source is simply
/// left out of the [`SourceSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// The page did not arrive before the per-source deadline.
    Timeout,
    /// The request could not be sent or the body could not be read.
    Network(String),
    /// The page host answered with a non-success status.
    Status(u16),
    /// The page is not an HTML or text document.
    UnsupportedContent(String),
    /// The document could not be processed.
    ExtractError(String),
    /// Extraction found no readable text.
    NoContent,
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("timed out"),
            Self::Network(reason) => write!(f, "network error: {reason}"),
            Self::Status(code) => write!(f, "HTTP status {code}"),
            Self::UnsupportedContent(kind) => write!(f, "unsupported content type: {kind}"),
            Self::ExtractError(reason) => write!(f, "extraction failed: {reason}"),
            Self::NoContent => f.write_str("no readable content"),
        }
    }
}

/// Result of fetching one candidate source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The page was fetched and its text extracted.
    Success(Source),
    /// The source is dropped for the given reason.
    Failure(FetchFailure),
}

impl FetchOutcome {
    /// Returns the fetched source, discarding the failure reason.
    pub fn into_source(self) -> Option<Source> {
        match self {
            Self::Success(source) => Some(source),
            Self::Failure(_) => None,
        }
    }

    /// Whether the fetch succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// The ordered sources that were fetched successfully.
///
/// Order follows the provider's ranking. Citation `[n]` in a prompt refers
/// to the n-th element (1-indexed).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceSet(Vec<Source>);

impl SourceSet {
    /// Wrap already-ordered sources.
    pub fn new(sources: Vec<Source>) -> Self {
        Self(sources)
    }

    /// Number of sources.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no source survived fetching.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate sources in citation order.
    pub fn iter(&self) -> std::slice::Iter<'_, Source> {
        self.0.iter()
    }

    /// Iterate `(citation_number, source)` pairs, numbering from 1.
    pub fn cited(&self) -> impl Iterator<Item = (usize, &Source)> {
        self.0.iter().enumerate().map(|(i, s)| (i + 1, s))
    }

    /// The source cited as `[number]`, if any.
    pub fn by_citation(&self, number: usize) -> Option<&Source> {
        number.checked_sub(1).and_then(|i| self.0.get(i))
    }

    /// Unwrap into the inner vector.
    pub fn into_inner(self) -> Vec<Source> {
        self.0
    }
}

impl<'a> IntoIterator for &'a SourceSet {
    type Item = &'a Source;
    type IntoIter = std::slice::Iter<'a, Source>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Per-request search provider credentials.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCredentials {
    /// Provider API key.
    pub api_key: String,
    /// Search engine (collection) identifier.
    pub engine_id: String,
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("api_key", &"<redacted>")
            .field("engine_id", &self.engine_id)
            .finish()
    }
}
