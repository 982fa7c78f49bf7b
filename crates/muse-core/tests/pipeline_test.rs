//! Integration tests for the quota-gated generation pipeline
//!
//! These tests run the full pipeline against a SQLite usage store and scripted providers:
//! - Quota admission and recording across the free limit
//! - Subscribed callers bypassing the gate
//! - Upstream failures and empty results leaving the counter untouched
//! - Chat retry bound on persistent rate limiting

use std::sync::Arc;
use std::time::Duration;

use muse_core::{
    ChatPayload, Error, GenerationOutput, GenerationRequest, GenerationService, ImagePayload,
    PromptPayload, QuotaGate, RetryConfig, SqliteUsageStore, StaticSubscriptions, ToolSettings,
    UpstreamProxy, UsageStore, DEFAULT_FREE_LIMIT,
};
use muse_llm::mock::{Outcome, ScriptedChatProvider, ScriptedImageProvider, ScriptedMediaProvider};
use muse_llm::{GeneratedImage, Message};
use serde_json::json;

const MAX_RETRIES: u32 = 5;

struct Fixture {
    store: Arc<SqliteUsageStore>,
    chat: Arc<ScriptedChatProvider>,
    images: Arc<ScriptedImageProvider>,
    media: Arc<ScriptedMediaProvider>,
    service: GenerationService,
}

impl Fixture {
    async fn new(pro_callers: &[&str]) -> Self {
        Self::with_chat(ScriptedChatProvider::replying("Hello! How can I help?"), pro_callers).await
    }

    async fn with_chat(chat: ScriptedChatProvider, pro_callers: &[&str]) -> Self {
        let store = Arc::new(SqliteUsageStore::in_memory().await.unwrap());
        let chat = Arc::new(chat);
        let images = Arc::new(ScriptedImageProvider::replying(vec![
            GeneratedImage::from_url("https://img.example/1.png"),
            GeneratedImage::from_url("https://img.example/2.png"),
        ]));
        let media = Arc::new(ScriptedMediaProvider::replying(json!({
            "audio": "https://cdn.example/track.mp3",
            "spectrogram": "https://cdn.example/track.png"
        })));

        let retry = RetryConfig::new()
            .with_max_retries(MAX_RETRIES)
            .with_initial_delay(Duration::from_millis(1))
            .with_max_delay(Duration::from_millis(4))
            .with_max_jitter(Duration::ZERO);
        let proxy = UpstreamProxy::new(
            chat.clone(),
            images.clone(),
            media.clone(),
            ToolSettings::default(),
        )
        .with_retry(retry)
        .with_deadline(Some(Duration::from_secs(10)));

        let service = GenerationService::new(
            QuotaGate::new(store.clone(), DEFAULT_FREE_LIMIT),
            Arc::new(StaticSubscriptions::new(pro_callers.iter().copied())),
            proxy,
        );

        Self {
            store,
            chat,
            images,
            media,
            service,
        }
    }

    async fn seed(&self, caller_id: &str, count: u64) {
        for _ in 0..count {
            self.store.increment(caller_id).await.unwrap();
        }
    }

    async fn count(&self, caller_id: &str) -> u64 {
        self.store
            .get(caller_id)
            .await
            .unwrap()
            .map(|record| record.count)
            .unwrap_or(0)
    }
}

fn code_request() -> GenerationRequest {
    GenerationRequest::Code(ChatPayload::new(vec![Message::user(
        "Simple toggle button using react hooks.",
    )]))
}

// ============================================================================
// Quota admission
// ============================================================================

#[tokio::test]
async fn test_last_free_generation_succeeds_and_fills_quota() {
    let fx = Fixture::new(&[]).await;
    fx.seed("user_1", DEFAULT_FREE_LIMIT - 1).await;

    let output = fx.service.run(Some("user_1"), code_request()).await.unwrap();

    assert_eq!(output, GenerationOutput::Text("Hello! How can I help?".to_string()));
    assert_eq!(fx.count("user_1").await, DEFAULT_FREE_LIMIT);
}

#[tokio::test]
async fn test_exhausted_quota_is_denied_without_upstream_call() {
    let fx = Fixture::new(&[]).await;
    fx.seed("user_1", DEFAULT_FREE_LIMIT).await;

    let result = fx.service.run(Some("user_1"), code_request()).await;

    assert!(matches!(result, Err(Error::QuotaExceeded)));
    assert_eq!(fx.chat.calls(), 0);
    assert_eq!(fx.count("user_1").await, DEFAULT_FREE_LIMIT);
}

#[tokio::test]
async fn test_repeated_denials_do_not_mutate_count() {
    let fx = Fixture::new(&[]).await;
    fx.seed("user_1", DEFAULT_FREE_LIMIT).await;

    for _ in 0..3 {
        let result = fx
            .service
            .run(Some("user_1"), GenerationRequest::Video(PromptPayload::new("clownfish")))
            .await;
        assert!(matches!(result, Err(Error::QuotaExceeded)));
    }

    assert_eq!(fx.media.calls(), 0);
    assert_eq!(fx.count("user_1").await, DEFAULT_FREE_LIMIT);
}

#[tokio::test]
async fn test_every_tool_counts_against_the_same_quota() {
    let fx = Fixture::new(&[]).await;

    let requests = vec![
        code_request(),
        GenerationRequest::Conversation(ChatPayload::new(vec![Message::user("hi")])),
        GenerationRequest::Image(ImagePayload {
            prompt: "a horse in the swiss alps".to_string(),
            amount: "2".to_string(),
            resolution: "512x512".to_string(),
        }),
        GenerationRequest::Music(PromptPayload::new("piano solo")),
    ];
    for request in requests {
        fx.service.run(Some("user_1"), request).await.unwrap();
    }
    assert_eq!(fx.count("user_1").await, 4);

    // Video output must be a URL list; the media stub answers with the music shape.
    fx.media.push(Outcome::Ok(json!(["https://cdn.example/clip.mp4"])));
    fx.service
        .run(Some("user_1"), GenerationRequest::Video(PromptPayload::new("clownfish")))
        .await
        .unwrap();
    assert_eq!(fx.count("user_1").await, DEFAULT_FREE_LIMIT);

    let result = fx.service.run(Some("user_1"), code_request()).await;
    assert!(matches!(result, Err(Error::QuotaExceeded)));
}

#[tokio::test]
async fn test_subscribed_caller_is_never_recorded() {
    let fx = Fixture::new(&["pro_1"]).await;
    fx.seed("pro_1", DEFAULT_FREE_LIMIT + 3).await;

    for _ in 0..3 {
        fx.service.run(Some("pro_1"), code_request()).await.unwrap();
    }

    assert_eq!(fx.chat.calls(), 3);
    assert_eq!(fx.count("pro_1").await, DEFAULT_FREE_LIMIT + 3);
}

#[tokio::test]
async fn test_usage_reports_remaining() {
    let fx = Fixture::new(&[]).await;
    fx.service.run(Some("user_1"), code_request()).await.unwrap();

    let usage = fx.service.usage("user_1").await.unwrap();
    assert_eq!(usage.count, 1);
    assert_eq!(usage.remaining, DEFAULT_FREE_LIMIT - 1);
    assert!(!usage.is_pro);
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn test_invalid_resolution_is_rejected_before_upstream() {
    let fx = Fixture::new(&[]).await;

    let result = fx
        .service
        .run(
            Some("user_1"),
            GenerationRequest::Image(ImagePayload {
                prompt: "a cat".to_string(),
                amount: "1".to_string(),
                resolution: "999x999".to_string(),
            }),
        )
        .await;

    assert!(matches!(result, Err(Error::InvalidPayload(_))));
    assert_eq!(fx.images.calls(), 0);
    assert_eq!(fx.count("user_1").await, 0);
}

#[tokio::test]
async fn test_empty_messages_are_rejected() {
    let fx = Fixture::new(&[]).await;

    let result = fx
        .service
        .run(Some("user_1"), GenerationRequest::Conversation(ChatPayload::default()))
        .await;

    assert!(matches!(result, Err(Error::InvalidPayload(_))));
    assert_eq!(fx.chat.calls(), 0);
}

// ============================================================================
// Upstream failures
// ============================================================================

#[tokio::test]
async fn test_empty_upstream_content_is_server_error_and_free() {
    let fx = Fixture::with_chat(
        ScriptedChatProvider::with_fallback(Outcome::Ok(Some("   ".to_string()))),
        &[],
    )
    .await;

    let result = fx.service.run(Some("user_1"), code_request()).await;

    assert!(matches!(result, Err(Error::EmptyUpstreamResult(_))));
    assert_eq!(fx.count("user_1").await, 0);
}

#[tokio::test]
async fn test_persistent_rate_limit_exhausts_retries() {
    let fx = Fixture::with_chat(ScriptedChatProvider::with_fallback(Outcome::RateLimited), &[]).await;

    let result = fx.service.run(Some("user_1"), code_request()).await;

    assert!(matches!(result, Err(Error::UpstreamError(_))));
    assert_eq!(fx.chat.calls(), MAX_RETRIES as usize + 1);
    assert_eq!(fx.count("user_1").await, 0);
}

#[tokio::test]
async fn test_transient_rate_limit_is_charged_once() {
    let chat = ScriptedChatProvider::replying("done");
    chat.push(Outcome::RateLimited);
    chat.push(Outcome::RateLimited);
    let fx = Fixture::with_chat(chat, &[]).await;

    fx.service.run(Some("user_1"), code_request()).await.unwrap();

    assert_eq!(fx.chat.calls(), 3);
    assert_eq!(fx.count("user_1").await, 1);
}

#[tokio::test]
async fn test_media_failure_is_not_retried_or_charged() {
    let fx = Fixture::new(&[]).await;
    fx.media.push(Outcome::RateLimited);

    let result = fx
        .service
        .run(Some("user_1"), GenerationRequest::Music(PromptPayload::new("jazz")))
        .await;

    assert!(matches!(result, Err(Error::UpstreamError(_))));
    assert_eq!(fx.media.calls(), 1);
    assert_eq!(fx.count("user_1").await, 0);
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test]
async fn test_concurrent_requests_from_one_caller_are_all_counted() {
    let fx = Arc::new(Fixture::new(&[]).await);

    let mut handles = Vec::new();
    for _ in 0..4 {
        let fx = fx.clone();
        handles.push(tokio::spawn(async move {
            fx.service.run(Some("user_1"), code_request()).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(fx.count("user_1").await, 4);
}
