//! Web API module for Muse
//!
//! Provides REST API endpoints for:
//! - The five generation tools (`/api/conversation`, `/api/code`, `/api/image`, `/api/music`, `/api/video`)
//! - The caller's free-usage counter (`/api/usage`)
//! - Health checks (`/health`)

pub mod error;
pub mod generate;
pub mod health;
pub mod usage;


use axum::{Extension, Router};
use muse_core::{AuthStore, GenerationService};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use error::ApiError;
pub use generate::generate_routes;
pub use health::health_routes;
pub use usage::usage_routes;

/// Create the API router with all endpoints
pub fn api_router() -> Router {
    Router::new().merge(generate_routes()).merge(usage_routes())
}

/// Full application: routes plus shared state and HTTP layers
pub fn app_router(service: Arc<GenerationService>, auth_store: Arc<AuthStore>) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(api_router())
        .layer(Extension(service))
        .layer(Extension(auth_store))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
