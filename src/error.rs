//! Error types for the citewise pipeline.
//!
//! Each variant carries a stable error code (SCREAMING_SNAKE_CASE) that is
//! included in the Display output and accessible via [`CitewiseError::code()`].
//! Per-source fetch failures and malformed stream frames are not errors; they
//! are absorbed where they happen.

use citewise_search::SearchError;

/// Stable error codes for programmatic error handling.
pub mod error_codes {
    /// The incoming request cannot be answered (e.g. empty query).
    pub const INVALID_REQUEST: &str = "INVALID_REQUEST";

    /// Invalid or missing configuration.
    pub const CONFIG_INVALID: &str = "CONFIG_INVALID";

    /// The search provider call failed; there are no sources to work from.
    pub const PROVIDER_ERROR: &str = "PROVIDER_ERROR";

    /// The completion backend could not be reached or rejected the request.
    pub const BACKEND_UNAVAILABLE: &str = "BACKEND_UNAVAILABLE";

    /// The completion stream broke off before it finished.
    pub const STREAM_INTERRUPTED: &str = "STREAM_INTERRUPTED";

    /// Local I/O failed (config files, listeners).
    pub const IO_ERROR: &str = "IO_ERROR";
}

/// Errors that abort a request.
///
/// The Display impl formats as `[CODE] message`.
#[derive(Debug, thiserror::Error)]
pub enum CitewiseError {
    /// The incoming request cannot be answered.
    #[error("[{}] {}", error_codes::INVALID_REQUEST, .0)]
    InvalidRequest(String),

    /// Invalid or missing configuration.
    #[error("[{}] {}", error_codes::CONFIG_INVALID, .0)]
    Config(String),

    /// The search provider call failed.
    #[error("[{}] {}", error_codes::PROVIDER_ERROR, .0)]
    Provider(String),

    /// The completion backend could not be reached or answered non-2xx.
    #[error("[{}] {}", error_codes::BACKEND_UNAVAILABLE, .0)]
    BackendUnavailable(String),

    /// The completion stream failed mid-way.
    #[error("[{}] {}", error_codes::STREAM_INTERRUPTED, .0)]
    StreamInterrupted(String),

    /// Local I/O error.
    #[error("[{}] {}", error_codes::IO_ERROR, .0)]
    Io(#[from] std::io::Error),
}

impl CitewiseError {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => error_codes::INVALID_REQUEST,
            Self::Config(_) => error_codes::CONFIG_INVALID,
            Self::Provider(_) => error_codes::PROVIDER_ERROR,
            Self::BackendUnavailable(_) => error_codes::BACKEND_UNAVAILABLE,
            Self::StreamInterrupted(_) => error_codes::STREAM_INTERRUPTED,
            Self::Io(_) => error_codes::IO_ERROR,
        }
    }
}

impl From<SearchError> for CitewiseError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Config(message) => Self::Config(message),
            other => Self::Provider(other.to_string()),
        }
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, CitewiseError>;
