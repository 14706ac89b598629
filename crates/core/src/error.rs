//! Error types for glimpse operations.
//!
//! [`GlimpseError`] covers everything that can go wrong while fetching and
//! reading a single page or API response. None of these errors reach the
//! caller of [`Summarizer::summarize`](crate::Summarizer::summarize) for an
//! ordinary "could not summarize" situation: the pipeline converts them into
//! [`Rejection`](crate::Rejection) reasons and moves on to the next strategy.
//!
//! # Example
//!
//! ```rust
//! use glimpse_core::{GlimpseError, Result};
//!
//! fn require_title(title: &str) -> Result<&str> {
//!     if title.is_empty() {
//!         return Err(GlimpseError::NoMatch);
//!     }
//!     Ok(title)
//! }
//! ```

use thiserror::Error;

/// Main error type for retrieval and extraction operations.
#[derive(Error, Debug)]
pub enum GlimpseError {
    /// HTTP request errors from reqwest.
    ///
    /// DNS failures, refused or reset connections, TLS problems and body
    /// decoding failures all end up here.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// A single attempt exceeded its time budget.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The declared media type is not text or structured data.
    #[error("Disallowed content type: {0}")]
    DisallowedContentType(String),

    /// Every attempt of a retry loop failed.
    #[error("Gave up after {attempts} attempts")]
    MaxAttempts { attempts: usize },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// HTML parsing errors, including invalid CSS selectors.
    #[error("Failed to parse HTML: {0}")]
    HtmlParseError(String),

    /// JSON decoding errors for embedded blobs and API payloads.
    #[error("Failed to decode JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The page was fetched but the expected node or blob was not there.
    #[error("Expected content was not found")]
    NoMatch,

    /// Login or session failures for authenticated APIs.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Missing or inconsistent configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl GlimpseError {
    /// Whether a retry loop should stop immediately on this error.
    ///
    /// Retrying cannot change the content type a server declares.
    pub fn is_terminal(&self) -> bool {
        matches!(self, GlimpseError::DisallowedContentType(_))
    }
}

/// Result type alias for GlimpseError.
pub type Result<T> = std::result::Result<T, GlimpseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GlimpseError::InvalidUrl("not a url".to_string());
        assert!(err.to_string().contains("Invalid URL"));
    }

    #[test]
    fn test_timeout_error() {
        let err = GlimpseError::Timeout { timeout_ms: 1500 };
        assert!(err.to_string().contains("1500"));
    }

    #[test]
    fn test_status_error() {
        let err = GlimpseError::HttpStatus { status: 503, url: "https://example.com/".to_string() };
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("example.com"));
    }

    #[test]
    fn test_only_content_type_is_terminal() {
        assert!(GlimpseError::DisallowedContentType("image/png".into()).is_terminal());
        assert!(!GlimpseError::Timeout { timeout_ms: 10 }.is_terminal());
        assert!(!GlimpseError::NoMatch.is_terminal());
        assert!(!GlimpseError::MaxAttempts { attempts: 5 }.is_terminal());
    }
}
