//! Error types.
//!
//! `SourceError` never leaves a source agent: it is absorbed into a
//! Fallback or Failed result. `CricketError` is what callers of the
//! coordinator, analyzer and service layers see.

use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single live source fetch.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Connection, timeout or body read failure.
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The source answered with a non-success status.
    #[error("unexpected HTTP status {0}")]
    Status(StatusCode),

    /// The source has no page for this player.
    #[error("player not found: {0}")]
    NotFound(String),

    /// The page was fetched but did not have the expected shape.
    #[error("could not parse {0}")]
    Parse(String),

    /// The page parsed but yielded no statistics.
    #[error("source returned no statistics")]
    Empty,
}

impl SourceError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SourceError::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            SourceError::Status(status) => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            SourceError::NotFound(_) | SourceError::Parse(_) | SourceError::Empty => false,
        }
    }
}

/// Request-level errors.
#[derive(Debug, Error)]
pub enum CricketError {
    /// Missing API key, empty player name, malformed arguments.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Unknown cricket format name.
    #[error("invalid format '{0}': expected one of test, odi, t20, all")]
    InvalidFormat(String),

    /// The language-model call failed.
    #[error("analysis backend error: {0}")]
    AnalysisBackend(String),

    /// The caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,
}

impl CricketError {
    /// Errors caused by the caller's input rather than by a dependency.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CricketError::Configuration(_) | CricketError::InvalidFormat(_)
        )
    }
}
