//! Error responses
//!
//! Every error body is plain text. Upstream and storage detail stays in the
//! server log; callers only ever see the fixed message for their status.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use muse_core::Error;
use tracing::error;

/// Body sent with 403 when the free tier is used up
pub const QUOTA_EXCEEDED_MESSAGE: &str = "Free trial has expired. Please upgrade to a paid plan.";

/// Body sent with every 500
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error.";

/// Handler error mapped to a status code and plain-text body
#[derive(Debug)]
pub enum ApiError {
    /// Pipeline failure
    Core(Error),
    /// Body was not valid JSON for the endpoint
    Body(String),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self::Core(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Body(rejection.body_text())
    }
}

impl ApiError {
    /// Status code and body for this error
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Body(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Core(err) => match err {
                Error::Unauthenticated => (StatusCode::UNAUTHORIZED, "Unauthorized.".to_string()),
                Error::InvalidPayload(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                Error::QuotaExceeded => (StatusCode::FORBIDDEN, QUOTA_EXCEEDED_MESSAGE.to_string()),
                Error::UpstreamRateLimited
                | Error::UpstreamError(_)
                | Error::EmptyUpstreamResult(_)
                | Error::Storage(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    INTERNAL_ERROR_MESSAGE.to_string(),
                ),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if let Self::Core(Error::Storage(detail)) = &self {
            error!(detail = %detail, "Storage failure");
        }
        (status, message).into_response()
    }
}
