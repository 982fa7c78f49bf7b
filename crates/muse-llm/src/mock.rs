//! Scripted providers for testing
//!
//! Each provider pops queued outcomes and falls back to a fixed default once the
//! queue is drained. Every call is counted so tests can assert that upstream was
//! (or was not) contacted.

use crate::completion::{CompletionRequest, CompletionResponse};
use crate::error::{Error, Result};
use crate::image::{GeneratedImage, ImageRequest};
use crate::media::MediaRequest;
use crate::provider::{ChatProvider, ImageProvider, MediaProvider};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Outcome a scripted provider produces for one call
#[derive(Debug, Clone)]
pub enum Outcome<T> {
    /// Successful response
    Ok(T),
    /// HTTP 429
    RateLimited,
    /// Any other provider failure with the given status
    Fail(u16),
}

impl<T: Clone> Outcome<T> {
    fn to_result(&self) -> Result<T> {
        match self {
            Self::Ok(value) => Ok(value.clone()),
            Self::RateLimited => Err(Error::RateLimit),
            Self::Fail(status) => Err(Error::Api {
                status: *status,
                message: "scripted failure".to_string(),
            }),
        }
    }
}

struct Script<T> {
    queue: Mutex<VecDeque<Outcome<T>>>,
    fallback: Outcome<T>,
    calls: AtomicUsize,
}

impl<T: Clone> Script<T> {
    fn new(fallback: Outcome<T>) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    fn push(&self, outcome: Outcome<T>) {
        self.queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(outcome);
    }

    fn next(&self) -> Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        match queue.pop_front() {
            Some(outcome) => outcome.to_result(),
            None => self.fallback.to_result(),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Chat
// ============================================================================

/// Chat provider returning scripted completions
pub struct ScriptedChatProvider {
    script: Script<Option<String>>,
    last_request: Mutex<Option<CompletionRequest>>,
}

impl ScriptedChatProvider {
    /// Provider that always answers with `content`
    #[must_use]
    pub fn replying(content: impl Into<String>) -> Self {
        Self::with_fallback(Outcome::Ok(Some(content.into())))
    }

    /// Provider whose unscripted calls produce `fallback`
    #[must_use]
    pub fn with_fallback(fallback: Outcome<Option<String>>) -> Self {
        Self {
            script: Script::new(fallback),
            last_request: Mutex::new(None),
        }
    }

    /// Queue an outcome for the next call
    pub fn push(&self, outcome: Outcome<Option<String>>) {
        self.script.push(outcome);
    }

    /// Number of calls received
    #[must_use]
    pub fn calls(&self) -> usize {
        self.script.calls()
    }

    /// The most recent request received
    #[must_use]
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait::async_trait]
impl ChatProvider for ScriptedChatProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted-model"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let model = request.model.clone();
        *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) = Some(request);

        let content = self.script.next()?;
        Ok(CompletionResponse {
            content,
            usage: None,
            finish_reason: Some("stop".to_string()),
            model,
        })
    }
}

// ============================================================================
// Images
// ============================================================================

/// Image provider returning scripted image lists
pub struct ScriptedImageProvider {
    script: Script<Vec<GeneratedImage>>,
}

impl ScriptedImageProvider {
    /// Provider that always answers with `images`
    #[must_use]
    pub fn replying(images: Vec<GeneratedImage>) -> Self {
        Self::with_fallback(Outcome::Ok(images))
    }

    /// Provider whose unscripted calls produce `fallback`
    #[must_use]
    pub fn with_fallback(fallback: Outcome<Vec<GeneratedImage>>) -> Self {
        Self {
            script: Script::new(fallback),
        }
    }

    /// Queue an outcome for the next call
    pub fn push(&self, outcome: Outcome<Vec<GeneratedImage>>) {
        self.script.push(outcome);
    }

    /// Number of calls received
    #[must_use]
    pub fn calls(&self) -> usize {
        self.script.calls()
    }
}

#[async_trait::async_trait]
impl ImageProvider for ScriptedImageProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate_images(&self, _request: ImageRequest) -> Result<Vec<GeneratedImage>> {
        self.script.next()
    }
}

// ============================================================================
// Media
// ============================================================================

/// Media provider returning scripted outputs
pub struct ScriptedMediaProvider {
    script: Script<Value>,
    last_request: Mutex<Option<MediaRequest>>,
}

impl ScriptedMediaProvider {
    /// Provider that always answers with `output`
    #[must_use]
    pub fn replying(output: Value) -> Self {
        Self::with_fallback(Outcome::Ok(output))
    }

    /// Provider whose unscripted calls produce `fallback`
    #[must_use]
    pub fn with_fallback(fallback: Outcome<Value>) -> Self {
        Self {
            script: Script::new(fallback),
            last_request: Mutex::new(None),
        }
    }

    /// Queue an outcome for the next call
    pub fn push(&self, outcome: Outcome<Value>) {
        self.script.push(outcome);
    }

    /// Number of calls received
    #[must_use]
    pub fn calls(&self) -> usize {
        self.script.calls()
    }

    /// The most recent request received
    #[must_use]
    pub fn last_request(&self) -> Option<MediaRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait::async_trait]
impl MediaProvider for ScriptedMediaProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn run(&self, request: MediaRequest) -> Result<Value> {
        *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) = Some(request);
        self.script.next()
    }
}
