//! Error types for muse-core
//!
//! Every failure a generation request can end in. The HTTP layer maps each variant
//! to exactly one status code.

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// No caller identity
    #[error("unauthenticated")]
    Unauthenticated,

    /// Missing or malformed payload fields
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Non-paid caller is over the free limit
    #[error("free quota exceeded")]
    QuotaExceeded,

    /// Provider answered 429. Retried inside the proxy; never returned to callers.
    #[error("upstream rate limited")]
    UpstreamRateLimited,

    /// Provider failure, or retries exhausted
    #[error("upstream error: {0}")]
    UpstreamError(String),

    /// Provider succeeded but returned nothing usable
    #[error("empty upstream result: {0}")]
    EmptyUpstreamResult(String),

    /// Usage store failure
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<muse_llm::Error> for Error {
    fn from(err: muse_llm::Error) -> Self {
        match err {
            muse_llm::Error::RateLimit => Self::UpstreamRateLimited,
            other => Self::UpstreamError(other.to_string()),
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_rate_limit_maps_to_rate_limited() {
        let err: Error = muse_llm::Error::RateLimit.into();
        assert!(matches!(err, Error::UpstreamRateLimited));
    }

    #[test]
    fn test_llm_api_error_maps_to_upstream_error() {
        let err: Error = muse_llm::Error::Api {
            status: 500,
            message: "boom".to_string(),
        }
        .into();
        match err {
            Error::UpstreamError(msg) => assert!(msg.contains("boom")),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
