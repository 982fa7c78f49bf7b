//! Authentication middleware for Axum
//!
//! Extracts Bearer tokens or API keys from requests and validates them
//! against the AuthStore. Provides `RequireAuth` extractor for handlers.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use muse_core::{AuthContext, AuthError, AuthStore};
use std::sync::Arc;
use tracing::error;

/// Auth rejection type (plain-text body)
#[derive(Debug)]
pub struct AuthRejection {
    status: StatusCode,
    message: &'static str,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

impl From<AuthError> for AuthRejection {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials
            | AuthError::InvalidCredentials
            | AuthError::TokenRevoked => AuthRejection {
                status: StatusCode::UNAUTHORIZED,
                message: "Unauthorized.",
            },
            AuthError::InvalidKeyHash(msg) | AuthError::Internal(msg) => {
                error!(error = %msg, "Authentication failed internally");
                AuthRejection {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "Internal server error.",
                }
            }
        }
    }
}

// ============================================================================
// RequireAuth Extractor
// ============================================================================

/// Axum extractor that requires authentication.
///
/// Extracts the token from:
/// 1. `Authorization: Bearer <token>` header
/// 2. `X-API-Key: <key>` header
pub struct RequireAuth(pub AuthContext);

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        // Get AuthStore from extensions
        let auth_store = parts
            .extensions
            .get::<Arc<AuthStore>>()
            .ok_or_else(|| AuthError::Internal("AuthStore not configured".to_string()))?;

        // Disabled auth resolves every request to the development caller
        if !auth_store.is_enabled() {
            return Ok(RequireAuth(auth_store.authenticate("")?));
        }

        let token = extract_token(parts)?;
        let ctx = auth_store.authenticate(&token)?;

        Ok(RequireAuth(ctx))
    }
}

/// Extract token from request headers
fn extract_token(parts: &Parts) -> std::result::Result<String, AuthError> {
    // 1. Authorization: Bearer <token>
    if let Some(auth_header) = parts.headers.get("authorization") {
        if let Ok(value) = auth_header.to_str() {
            if let Some(token) = value.strip_prefix("Bearer ") {
                return Ok(token.trim().to_string());
            }
        }
    }

    // 2. X-API-Key header
    if let Some(api_key_header) = parts.headers.get("x-api-key") {
        if let Ok(value) = api_key_header.to_str() {
            return Ok(value.trim().to_string());
        }
    }

    Err(AuthError::MissingCredentials)
}
