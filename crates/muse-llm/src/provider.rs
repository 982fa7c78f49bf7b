//! Provider trait definitions
//!
//! Each generation surface has its own trait so that a deployment can mix vendors
//! (e.g. OpenAI for chat and images, Replicate for music and video).

use crate::completion::{CompletionRequest, CompletionResponse};
use crate::error::Result;
use crate::image::{GeneratedImage, ImageRequest};
use crate::media::MediaRequest;
use serde_json::Value;

/// Chat completion provider
#[async_trait::async_trait]
pub trait ChatProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Get the default model
    fn default_model(&self) -> &str;

    /// Complete a conversation
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;
}

/// Image generation provider
#[async_trait::async_trait]
pub trait ImageProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Generate `request.n` images
    async fn generate_images(&self, request: ImageRequest) -> Result<Vec<GeneratedImage>>;
}

/// Asynchronous media generation provider
#[async_trait::async_trait]
pub trait MediaProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Run a model to completion and return its provider-native output
    async fn run(&self, request: MediaRequest) -> Result<Value>;
}
