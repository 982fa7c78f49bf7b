//! Muse LLM - Generation Provider Abstraction
//!
//! This crate provides the upstream generation providers used by Muse:
//! - Provider traits for chat completion, image generation and media generation
//! - OpenAI: chat completions and image generation over the REST API
//! - Replicate: asynchronous media predictions (music, video)
//! - Mock: scripted providers for tests

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod completion;
pub mod error;
pub mod image;
pub mod media;
pub mod message;
pub mod mock;
pub mod openai;
pub mod provider;
pub mod replicate;
pub mod util;

pub use completion::{CompletionRequest, CompletionResponse, TokenUsage};
pub use error::{Error, Result};
pub use image::{GeneratedImage, ImageRequest, ImageSize};
pub use media::MediaRequest;
pub use message::{Message, MessageRole};
pub use provider::{ChatProvider, ImageProvider, MediaProvider};

// Re-export provider types
pub use openai::{OpenAiConfig, OpenAiProvider};
pub use replicate::{ReplicateConfig, ReplicateProvider};
