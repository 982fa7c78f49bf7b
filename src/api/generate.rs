//! Generation tool endpoints
//!
//! Each handler authenticates first, then parses the body, then hands the
//! request to the [`GenerationService`] with the caller id passed explicitly.

use super::error::ApiError;
use crate::middleware::auth::RequireAuth;
use axum::{
    extract::{rejection::JsonRejection, Extension},
    response::Json,
    routing::post,
    Router,
};
use muse_core::{ChatPayload, GenerationRequest, GenerationService, ImagePayload, PromptPayload};
use serde_json::Value;
use std::sync::Arc;

type Body<T> = Result<Json<T>, JsonRejection>;

/// Create generation routes
pub fn generate_routes() -> Router {
    Router::new()
        .route("/api/conversation", post(conversation))
        .route("/api/code", post(code))
        .route("/api/image", post(image))
        .route("/api/music", post(music))
        .route("/api/video", post(video))
}

async fn generate(
    service: &GenerationService,
    caller_id: &str,
    request: GenerationRequest,
) -> Result<Json<Value>, ApiError> {
    let output = service.run(Some(caller_id), request).await?;
    Ok(Json(output.into_json()))
}

/// POST /api/conversation
async fn conversation(
    RequireAuth(auth): RequireAuth,
    Extension(service): Extension<Arc<GenerationService>>,
    body: Body<ChatPayload>,
) -> Result<Json<Value>, ApiError> {
    let Json(payload) = body?;
    generate(&service, &auth.caller_id, GenerationRequest::Conversation(payload)).await
}

/// POST /api/code
async fn code(
    RequireAuth(auth): RequireAuth,
    Extension(service): Extension<Arc<GenerationService>>,
    body: Body<ChatPayload>,
) -> Result<Json<Value>, ApiError> {
    let Json(payload) = body?;
    generate(&service, &auth.caller_id, GenerationRequest::Code(payload)).await
}

/// POST /api/image
async fn image(
    RequireAuth(auth): RequireAuth,
    Extension(service): Extension<Arc<GenerationService>>,
    body: Body<ImagePayload>,
) -> Result<Json<Value>, ApiError> {
    let Json(payload) = body?;
    generate(&service, &auth.caller_id, GenerationRequest::Image(payload)).await
}

/// POST /api/music
async fn music(
    RequireAuth(auth): RequireAuth,
    Extension(service): Extension<Arc<GenerationService>>,
    body: Body<PromptPayload>,
) -> Result<Json<Value>, ApiError> {
    let Json(payload) = body?;
    generate(&service, &auth.caller_id, GenerationRequest::Music(payload)).await
}

/// POST /api/video
async fn video(
    RequireAuth(auth): RequireAuth,
    Extension(service): Extension<Arc<GenerationService>>,
    body: Body<PromptPayload>,
) -> Result<Json<Value>, ApiError> {
    let Json(payload) = body?;
    generate(&service, &auth.caller_id, GenerationRequest::Video(payload)).await
}
