//! Error types for the GitHub and Google Drive clients.

use thiserror::Error;

/// Errors that can occur while talking to a content provider.
#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// Provider answered with an unexpected status.
    #[error("{service} returned status {status}: {message}")]
    Status {
        /// Provider name.
        service: &'static str,
        /// HTTP status code.
        status: u16,
        /// Response body excerpt.
        message: String,
    },

    /// HTTP client configuration error.
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Not a `https://github.com/{owner}/{repo}` URL.
    #[error("Invalid GitHub repository URL.")]
    InvalidRepositoryUrl(String),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// The requested repository, ref, path or file does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded, retry after {0} seconds")]
    RateLimited(u64),

    /// Token rejected or missing scope.
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// Drive file type that cannot be turned into text.
    #[error("Unsupported file type: {0}")]
    UnsupportedMimeType(String),

    /// ZIP archive could not be written.
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SourceError {
    /// Check if this error is worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout => true,
            Self::HttpRequest(err) => err.is_timeout() || err.is_connect(),
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Get retry delay in seconds if applicable.
    #[must_use]
    pub const fn retry_delay(&self) -> Option<u64> {
        match self {
            Self::RateLimited(seconds) => Some(*seconds),
            Self::Timeout => Some(5),
            Self::HttpRequest(_) | Self::Status { .. } => Some(2),
            _ => None,
        }
    }

    /// Whether the error invalidates the whole request rather than one file.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::AccessDenied(_) | Self::RateLimited(_))
    }
}
