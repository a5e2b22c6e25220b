//! Errors surfaced by the cached API client

use chrono::{DateTime, Local, Utc};
use thiserror::Error;

/// Broad failure class of an [`ApiError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Non-2xx status, non-JSON body, schema mismatch, or transport failure
    NetworkFailure,
    /// HTTP 429 or an active cooldown
    RateLimited,
}

/// Raised by the client when no usable data exists at any cache layer
///
/// Live failures are absorbed by the fallback chain first, so receiving one of
/// these means nothing live, cached, or last-known-good could be served.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// A cooldown is active and nothing is cached for the request
    #[error("API rate limited until {}", .until.with_timezone(&Local).format("%H:%M:%S"))]
    RateLimited { until: DateTime<Utc> },

    /// The API answered 429
    #[error("API daily limit exceeded")]
    DailyLimitExceeded,

    /// Non-success status or a body that is not JSON
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// The request never produced a response
    #[error("API transport error: {0}")]
    Transport(String),

    /// JSON parsed but does not match the endpoint's schema
    #[error("unexpected {endpoint} payload: {reason}")]
    InvalidPayload { endpoint: String, reason: String },
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::RateLimited { .. } | ApiError::DailyLimitExceeded => ErrorKind::RateLimited,
            ApiError::RequestFailed(_)
            | ApiError::Transport(_)
            | ApiError::InvalidPayload { .. } => ErrorKind::NetworkFailure,
        }
    }

    /// Whether the failure is due to provider throttling
    pub fn is_rate_limited(&self) -> bool {
        self.kind() == ErrorKind::RateLimited
    }
}
