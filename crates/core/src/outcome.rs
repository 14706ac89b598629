//! Tagged results shared by every handler and fallback strategy.

use std::fmt;

use crate::GlimpseError;
use crate::summary::Summary;

/// Why a handler or strategy declined to produce a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// The title matched a known "blocked / challenge / not found" prefix,
    /// or merely echoed the URL.
    RejectedTitle,
    /// Title and description together are below the minimum length.
    TooShort,
    /// Nothing usable was found on the page.
    NoContent,
    /// The server declared a media type that is not text or structured data.
    DisallowedContentType,
    /// The request (or every retry of it) ran out of time.
    TimedOut,
    /// DNS, connection, TLS or HTTP status failures.
    Transport,
    /// Malformed markup, JSON or selectors.
    Parse,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Rejection::RejectedTitle => "rejected-title",
            Rejection::TooShort => "summary-too-short",
            Rejection::NoContent => "no-content",
            Rejection::DisallowedContentType => "disallowed-content-type",
            Rejection::TimedOut => "timed-out",
            Rejection::Transport => "transport-error",
            Rejection::Parse => "parse-error",
        };
        f.write_str(reason)
    }
}

impl From<&GlimpseError> for Rejection {
    fn from(err: &GlimpseError) -> Self {
        match err {
            GlimpseError::Http(e) if e.is_timeout() => Rejection::TimedOut,
            GlimpseError::Http(_) | GlimpseError::HttpStatus { .. } | GlimpseError::Auth(_) => Rejection::Transport,
            GlimpseError::Timeout { .. } | GlimpseError::MaxAttempts { .. } => Rejection::TimedOut,
            GlimpseError::DisallowedContentType(_) => Rejection::DisallowedContentType,
            GlimpseError::NoMatch => Rejection::NoContent,
            GlimpseError::HtmlParseError(_)
            | GlimpseError::Json(_)
            | GlimpseError::InvalidUrl(_)
            | GlimpseError::ConfigError(_) => Rejection::Parse,
        }
    }
}

/// The result of running one handler or strategy against a URL.
///
/// `NotApplicable` means "no opinion" and is distinct from an explicit
/// `Rejected`: the first lets a dispatcher keep looking, the second records
/// that someone looked and declined.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Summary(Summary),
    NotApplicable,
    Rejected(Rejection),
}

impl Outcome {
    /// Collapses an extraction result, turning errors into rejections.
    pub fn from_result(result: crate::Result<Outcome>) -> Self {
        match result {
            Ok(outcome) => outcome,
            Err(err) => Outcome::Rejected(Rejection::from(&err)),
        }
    }

    pub fn is_summary(&self) -> bool {
        matches!(self, Outcome::Summary(_))
    }

    pub fn into_summary(self) -> Option<Summary> {
        match self {
            Outcome::Summary(summary) => Some(summary),
            _ => None,
        }
    }

    /// Short label used in log fields.
    pub fn label(&self) -> String {
        match self {
            Outcome::Summary(_) => "summary".to_string(),
            Outcome::NotApplicable => "not-applicable".to_string(),
            Outcome::Rejected(reason) => reason.to_string(),
        }
    }
}
