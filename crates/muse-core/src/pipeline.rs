//! Quota-gated generation pipeline
//!
//! [`GenerationService::run`] composes the pieces every tool shares:
//!
//! 1. Caller identity must be present (`Unauthenticated` otherwise)
//! 2. Payload is validated before anything touches storage or upstream
//! 3. Subscribed callers skip the quota gate
//! 4. Everyone else must be within the free limit (`QuotaExceeded` otherwise)
//! 5. The upstream proxy runs the tool
//! 6. Usage is recorded only after a successful call by a non-subscribed caller

use crate::error::{Error, Result};
use crate::proxy::{ChatPayload, ImagePayload, ImageSpec, PromptPayload, ToolKind, UpstreamProxy};
use crate::quota::QuotaGate;
use crate::subscription::SubscriptionChecker;
use muse_llm::GeneratedImage;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// One tool invocation
#[derive(Debug, Clone)]
pub enum GenerationRequest {
    /// Conversation tool
    Conversation(ChatPayload),
    /// Code tool
    Code(ChatPayload),
    /// Image tool
    Image(ImagePayload),
    /// Music tool
    Music(PromptPayload),
    /// Video tool
    Video(PromptPayload),
}

impl GenerationRequest {
    /// Tool this request targets
    #[must_use]
    pub fn tool(&self) -> ToolKind {
        match self {
            Self::Conversation(_) => ToolKind::Conversation,
            Self::Code(_) => ToolKind::Code,
            Self::Image(_) => ToolKind::Image,
            Self::Music(_) => ToolKind::Music,
            Self::Video(_) => ToolKind::Video,
        }
    }

    fn validate(self, max_images: u32) -> Result<Validated> {
        match self {
            Self::Conversation(payload) => {
                payload.validate()?;
                Ok(Validated::Chat(ToolKind::Conversation, payload))
            }
            Self::Code(payload) => {
                payload.validate()?;
                Ok(Validated::Chat(ToolKind::Code, payload))
            }
            Self::Image(payload) => Ok(Validated::Image(payload.parse(max_images)?)),
            Self::Music(payload) => {
                payload.validate()?;
                Ok(Validated::Music(payload))
            }
            Self::Video(payload) => {
                payload.validate()?;
                Ok(Validated::Video(payload))
            }
        }
    }
}

enum Validated {
    Chat(ToolKind, ChatPayload),
    Image(ImageSpec),
    Music(PromptPayload),
    Video(PromptPayload),
}

/// Normalized result of a tool invocation
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutput {
    /// Chat tools: generated text
    Text(String),
    /// Image tool: generated image descriptors
    Images(Vec<GeneratedImage>),
    /// Music and video tools: provider-native output
    Media(Value),
}

impl GenerationOutput {
    /// Response body for the dashboard
    ///
    /// Text becomes `{ "content": ... }`, images a JSON array, media is passed through.
    #[must_use]
    pub fn into_json(self) -> Value {
        match self {
            Self::Text(content) => json!({ "content": content }),
            Self::Images(images) => json!(images),
            Self::Media(value) => value,
        }
    }
}

/// Usage counter shown on the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CallerUsage {
    /// Billed operations consumed
    pub count: u64,
    /// Free limit
    pub limit: u64,
    /// Free operations left
    pub remaining: u64,
    /// Whether the caller is subscribed (quota does not apply)
    pub is_pro: bool,
}

/// Runs tools behind the quota gate
pub struct GenerationService {
    gate: QuotaGate,
    subscriptions: Arc<dyn SubscriptionChecker>,
    proxy: UpstreamProxy,
}

impl GenerationService {
    /// Create a new service
    pub fn new(
        gate: QuotaGate,
        subscriptions: Arc<dyn SubscriptionChecker>,
        proxy: UpstreamProxy,
    ) -> Self {
        Self {
            gate,
            subscriptions,
            proxy,
        }
    }

    /// Quota gate
    pub fn gate(&self) -> &QuotaGate {
        &self.gate
    }

    /// Upstream proxy
    pub fn proxy(&self) -> &UpstreamProxy {
        &self.proxy
    }

    /// Run one tool invocation for `caller_id`
    #[instrument(skip(self, request), fields(tool = %request.tool()))]
    pub async fn run(
        &self,
        caller_id: Option<&str>,
        request: GenerationRequest,
    ) -> Result<GenerationOutput> {
        let caller_id = caller_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(Error::Unauthenticated)?;
        let tool = request.tool();

        let validated = request.validate(self.proxy.settings().max_images)?;

        let is_pro = self.is_pro(caller_id).await;
        if !is_pro && !self.gate.is_within_limit(caller_id).await {
            info!(caller_id = %caller_id, tool = %tool, "Free quota exhausted, request denied");
            return Err(Error::QuotaExceeded);
        }

        let output = match self.dispatch(caller_id, validated).await {
            Ok(output) => output,
            Err(e) => {
                log_failure(caller_id, tool, &e);
                return Err(e);
            }
        };

        if !is_pro {
            if let Err(e) = self.gate.record_usage(caller_id).await {
                // The generation already succeeded; the caller still gets the result.
                error!(caller_id = %caller_id, tool = %tool, error = %e, "Failed to record usage");
            }
        }

        info!(caller_id = %caller_id, tool = %tool, is_pro, "Generation completed");
        Ok(output)
    }

    /// Usage counter for `caller_id`
    pub async fn usage(&self, caller_id: &str) -> Result<CallerUsage> {
        if caller_id.trim().is_empty() {
            return Err(Error::Unauthenticated);
        }
        let summary = self.gate.usage(caller_id).await?;
        let is_pro = self.is_pro(caller_id).await;

        Ok(CallerUsage {
            count: summary.count,
            limit: summary.limit,
            remaining: summary.remaining,
            is_pro,
        })
    }

    /// Subscription lookup; errors count as "not subscribed"
    async fn is_pro(&self, caller_id: &str) -> bool {
        match self.subscriptions.is_pro(caller_id).await {
            Ok(is_pro) => is_pro,
            Err(e) => {
                warn!(caller_id = %caller_id, error = %e, "Subscription lookup failed, treating as free tier");
                false
            }
        }
    }

    async fn dispatch(&self, caller_id: &str, request: Validated) -> Result<GenerationOutput> {
        match request {
            Validated::Chat(tool, payload) => self
                .proxy
                .chat(tool, caller_id, &payload)
                .await
                .map(GenerationOutput::Text),
            Validated::Image(spec) => self
                .proxy
                .images(caller_id, &spec)
                .await
                .map(GenerationOutput::Images),
            Validated::Music(payload) => self
                .proxy
                .music(caller_id, &payload)
                .await
                .map(GenerationOutput::Media),
            Validated::Video(payload) => self
                .proxy
                .video(caller_id, &payload)
                .await
                .map(GenerationOutput::Media),
        }
    }
}

fn log_failure(caller_id: &str, tool: ToolKind, err: &Error) {
    match err {
        Error::EmptyUpstreamResult(detail) => {
            error!(
                caller_id = %caller_id,
                tool = %tool,
                detail = %detail,
                "Upstream returned success without usable content"
            );
        }
        Error::UpstreamError(detail) => {
            error!(caller_id = %caller_id, tool = %tool, detail = %detail, "Upstream call failed");
        }
        other => {
            error!(caller_id = %caller_id, tool = %tool, error = %other, "Generation failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::ToolSettings;
    use crate::quota::{MemoryUsageStore, UsageStore, DEFAULT_FREE_LIMIT};
    use crate::subscription::StaticSubscriptions;
    use crate::utils::RetryConfig;
    use muse_llm::mock::{Outcome, ScriptedChatProvider, ScriptedImageProvider, ScriptedMediaProvider};
    use muse_llm::Message;
    use std::time::Duration;

    struct Harness {
        store: Arc<MemoryUsageStore>,
        chat: Arc<ScriptedChatProvider>,
        service: GenerationService,
    }

    fn harness(chat: ScriptedChatProvider, pro: &[&str]) -> Harness {
        let store = Arc::new(MemoryUsageStore::new());
        let chat = Arc::new(chat);
        let proxy = UpstreamProxy::new(
            chat.clone(),
            Arc::new(ScriptedImageProvider::replying(vec![GeneratedImage::from_url(
                "https://img/1.png",
            )])),
            Arc::new(ScriptedMediaProvider::replying(json!({ "audio": "https://cdn/a.mp3" }))),
            ToolSettings::default(),
        )
        .with_retry(
            RetryConfig::new()
                .with_initial_delay(Duration::from_millis(1))
                .with_max_delay(Duration::from_millis(2))
                .with_max_jitter(Duration::ZERO),
        );
        let service = GenerationService::new(
            QuotaGate::new(store.clone(), DEFAULT_FREE_LIMIT),
            Arc::new(StaticSubscriptions::new(pro.iter().copied())),
            proxy,
        );
        Harness {
            store,
            chat,
            service,
        }
    }

    fn conversation() -> GenerationRequest {
        GenerationRequest::Conversation(ChatPayload::new(vec![Message::user("hello")]))
    }

    #[tokio::test]
    async fn test_missing_caller_is_unauthenticated() {
        let h = harness(ScriptedChatProvider::replying("hi"), &[]);

        let result = h.service.run(None, conversation()).await;
        assert!(matches!(result, Err(Error::Unauthenticated)));

        let result = h.service.run(Some("  "), conversation()).await;
        assert!(matches!(result, Err(Error::Unauthenticated)));
        assert_eq!(h.chat.calls(), 0);
    }

    #[tokio::test]
    async fn test_unauthenticated_wins_over_invalid_payload() {
        let h = harness(ScriptedChatProvider::replying("hi"), &[]);
        let result = h
            .service
            .run(None, GenerationRequest::Conversation(ChatPayload::default()))
            .await;
        assert!(matches!(result, Err(Error::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_success_records_usage() {
        let h = harness(ScriptedChatProvider::replying("hi there"), &[]);

        let output = h.service.run(Some("user_1"), conversation()).await.unwrap();
        assert_eq!(output, GenerationOutput::Text("hi there".to_string()));
        assert_eq!(h.store.get("user_1").await.unwrap().unwrap().count, 1);
    }

    #[tokio::test]
    async fn test_pro_caller_bypasses_gate_and_is_not_recorded() {
        let h = harness(ScriptedChatProvider::replying("hi"), &["pro_1"]);
        h.store.set_count("pro_1", 100);

        h.service.run(Some("pro_1"), conversation()).await.unwrap();
        assert_eq!(h.store.get("pro_1").await.unwrap().unwrap().count, 100);
    }

    #[tokio::test]
    async fn test_invalid_payload_leaves_count() {
        let h = harness(ScriptedChatProvider::replying("hi"), &[]);
        let result = h
            .service
            .run(Some("user_1"), GenerationRequest::Music(PromptPayload::new("")))
            .await;
        assert!(matches!(result, Err(Error::InvalidPayload(_))));
        assert!(h.store.get("user_1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_usage_summary_includes_pro_flag() {
        let h = harness(ScriptedChatProvider::replying("hi"), &["pro_1"]);
        h.store.set_count("user_1", 2);

        let usage = h.service.usage("user_1").await.unwrap();
        assert_eq!(
            usage,
            CallerUsage {
                count: 2,
                limit: DEFAULT_FREE_LIMIT,
                remaining: DEFAULT_FREE_LIMIT - 2,
                is_pro: false,
            }
        );
        assert!(h.service.usage("pro_1").await.unwrap().is_pro);
    }

    #[test]
    fn test_output_json_shapes() {
        assert_eq!(
            GenerationOutput::Text("x".to_string()).into_json(),
            json!({ "content": "x" })
        );
        assert_eq!(
            GenerationOutput::Images(vec![GeneratedImage::from_url("u")]).into_json(),
            json!([{ "url": "u" }])
        );
        assert_eq!(
            GenerationOutput::Media(json!({ "audio": "a" })).into_json(),
            json!({ "audio": "a" })
        );
    }

    #[tokio::test]
    async fn test_failed_upstream_is_not_charged() {
        let h = harness(ScriptedChatProvider::with_fallback(Outcome::Fail(500)), &[]);
        let result = h.service.run(Some("user_1"), conversation()).await;
        assert!(matches!(result, Err(Error::UpstreamError(_))));
        assert!(h.store.get("user_1").await.unwrap().is_none());
    }
}
