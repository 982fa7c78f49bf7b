//! Usage endpoint backing the dashboard's free-generation counter

use super::error::ApiError;
use crate::middleware::auth::RequireAuth;
use axum::{extract::Extension, response::Json, routing::get, Router};
use muse_core::{CallerUsage, GenerationService};
use std::sync::Arc;

/// Create usage routes
pub fn usage_routes() -> Router {
    Router::new().route("/api/usage", get(get_usage))
}

/// GET /api/usage
async fn get_usage(
    RequireAuth(auth): RequireAuth,
    Extension(service): Extension<Arc<GenerationService>>,
) -> Result<Json<CallerUsage>, ApiError> {
    Ok(Json(service.usage(&auth.caller_id).await?))
}
