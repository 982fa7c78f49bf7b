//! Error types for muse-llm

use thiserror::Error;

/// Provider error type
#[derive(Debug, Error)]
pub enum Error {
    /// Provider not configured
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    /// Provider answered with HTTP 429
    #[error("rate limit exceeded")]
    RateLimit,

    /// Non-success status other than 429
    #[error("api error ({status}): {message}")]
    Api {
        /// HTTP status code returned by the provider
        status: u16,
        /// Provider message with credentials redacted
        message: String,
    },

    /// Invalid response
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Network error
    #[error("network error: {0}")]
    Network(String),

    /// Timeout
    #[error("timeout after {0}ms")]
    Timeout(u64),

    /// Asynchronous prediction ended in `failed` or `canceled`
    #[error("prediction failed: {0}")]
    PredictionFailed(String),
}

impl Error {
    /// Whether the provider signalled rate limiting
    #[must_use]
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimit)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
