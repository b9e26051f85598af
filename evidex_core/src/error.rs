// src/error.rs
use crate::types::Source;

/// Failure of a single upstream source during one fan-out.
///
/// Variants map to the recovery policy: `RateLimited` is the only retryable
/// failure, `Malformed` and `InvalidInput` are never retried, and everything
/// is absorbed into degraded-source metadata above the adapter boundary.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("Upstream returned status {status}: {message}")]
    UpstreamStatus { status: u16, message: String },

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl SourceError {
    pub fn kind_str(&self) -> &'static str {
        match self {
            SourceError::HttpRequest(_) => "network_error",
            SourceError::UpstreamStatus { .. } => "upstream_error",
            SourceError::RateLimited(_) => "rate_limited",
            SourceError::Timeout(_) => "timeout",
            SourceError::Malformed(_) | SourceError::SerdeJson(_) => "malformed_response",
            SourceError::Authentication(_) => "auth_failed",
            SourceError::InvalidInput(_) => "invalid_input",
            SourceError::Other(_) => "internal_error",
        }
    }

    /// Whether the fan-out coordinator may retry this failure once.
    ///
    /// Only 429-class responses qualify; malformed payloads and client
    /// errors would fail identically on a second attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SourceError::RateLimited(_))
    }

    /// Classify an HTTP status from an upstream into a typed failure.
    pub fn from_status(status: reqwest::StatusCode, source: Source) -> Self {
        if status.as_u16() == 429 {
            SourceError::RateLimited(format!("{} returned 429", source))
        } else if status.as_u16() == 401 || status.as_u16() == 403 {
            SourceError::Authentication(format!("{} returned {}", source, status))
        } else {
            SourceError::UpstreamStatus {
                status: status.as_u16(),
                message: format!("{} search failed", source),
            }
        }
    }
}

/// Pipeline-level failure visible to the caller.
///
/// Everything below this boundary is absorbed into degraded-source
/// metadata; only invalid input and total fan-out failure escape.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Research sources unavailable: all {0} sources failed")]
    AllSourcesFailed(usize),
}
