//! Upstream proxy call
//!
//! Validated tool payloads are forwarded to injected providers. Chat tools get a
//! tool-specific system instruction prepended and retry on provider rate limits;
//! image and media tools make a single attempt. Every call can be bounded by an
//! overall deadline that includes backoff sleeps.
//!
//! A provider success with no usable content is reported as
//! [`Error::EmptyUpstreamResult`], never as an empty success.

use crate::error::{Error, Result};
use crate::utils::{retry_with_backoff, RetryConfig};
use muse_llm::{
    ChatProvider, CompletionRequest, GeneratedImage, ImageProvider, ImageRequest, ImageSize,
    MediaProvider, MediaRequest, Message,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default system instruction for the code tool
pub const CODE_INSTRUCTION: &str = "You are a code generator. You must answer only in markdown code snippets. Use code comments for explanations.";

/// Default system instruction for the conversation tool
pub const CONVERSATION_INSTRUCTION: &str = "You are a helpful assistant.";

/// Riffusion model version used for music
pub const DEFAULT_MUSIC_VERSION: &str =
    "8cf61ea6c56afd61d8f5b9ffd14d7c216c0a93844ce2d82ac1c9ecc9c7f24e05";

/// Zeroscope model version used for video
pub const DEFAULT_VIDEO_VERSION: &str =
    "9f747673945c62801b13b84701c783929c0ee784e4748ec062204894dda1a351";

/// Upper bound on images per request
pub const DEFAULT_MAX_IMAGES: u32 = 4;

/// Generation tools exposed on the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    /// Free-form chat
    Conversation,
    /// Code-only chat
    Code,
    /// Image generation
    Image,
    /// Music generation
    Music,
    /// Video generation
    Video,
}

impl ToolKind {
    /// All tools
    pub const ALL: [ToolKind; 5] = [
        Self::Conversation,
        Self::Code,
        Self::Image,
        Self::Music,
        Self::Video,
    ];

    /// Wire name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conversation => "conversation",
            Self::Code => "code",
            Self::Image => "image",
            Self::Music => "music",
            Self::Video => "video",
        }
    }

    /// Whether the tool is backed by a chat completion
    #[must_use]
    pub fn is_chat(&self) -> bool {
        matches!(self, Self::Conversation | Self::Code)
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Payloads
// ============================================================================

/// Chat tool body: `{ "messages": [{ "role", "content" }, ...] }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPayload {
    /// Ordered conversation so far
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl ChatPayload {
    /// Payload with the given messages
    #[must_use]
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// Check that at least one message is present
    pub fn validate(&self) -> Result<()> {
        if self.messages.is_empty() {
            return Err(Error::InvalidPayload("Messages are required.".to_string()));
        }
        Ok(())
    }
}

/// Image tool body: `{ "prompt", "amount", "resolution" }`
///
/// `amount` arrives as a numeric string from the dashboard form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    /// Text prompt
    #[serde(default)]
    pub prompt: String,
    /// Number of images, as a decimal string
    #[serde(default)]
    pub amount: String,
    /// One of `256x256`, `512x512`, `1024x1024`
    #[serde(default)]
    pub resolution: String,
}

/// Image request after validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSpec {
    /// Text prompt
    pub prompt: String,
    /// Number of images
    pub amount: u32,
    /// Output size
    pub size: ImageSize,
}

impl ImagePayload {
    /// Validate and convert into an [`ImageSpec`]
    pub fn parse(&self, max_images: u32) -> Result<ImageSpec> {
        if self.prompt.trim().is_empty() {
            return Err(Error::InvalidPayload(
                "Prompt is required and must be a string.".to_string(),
            ));
        }

        let raw_amount = self.amount.trim();
        let amount: u32 = match raw_amount.parse() {
            Ok(amount) => amount,
            // Numeric but fractional or negative
            Err(_) if raw_amount.parse::<f64>().is_ok_and(f64::is_finite) => {
                return Err(Error::InvalidPayload(format!(
                    "Amount must be a whole number between 1 and {}.",
                    max_images
                )));
            }
            Err(_) => {
                return Err(Error::InvalidPayload(
                    "Amount is required and must be a string representation of a number."
                        .to_string(),
                ));
            }
        };
        if amount == 0 || amount > max_images {
            return Err(Error::InvalidPayload(format!(
                "Amount must be between 1 and {}.",
                max_images
            )));
        }

        let size: ImageSize = self
            .resolution
            .parse()
            .map_err(|_| Error::InvalidPayload("Invalid resolution.".to_string()))?;

        Ok(ImageSpec {
            prompt: self.prompt.clone(),
            amount,
            size,
        })
    }
}

/// Music and video body: `{ "prompt" }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptPayload {
    /// Text prompt
    #[serde(default)]
    pub prompt: String,
}

impl PromptPayload {
    /// Payload with the given prompt
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }

    /// Check that the prompt is non-blank
    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(Error::InvalidPayload("Prompt is required.".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Settings
// ============================================================================

/// Per-tool models, instructions and limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSettings {
    /// Chat model for the conversation tool
    pub conversation_model: String,
    /// System instruction for the conversation tool
    pub conversation_instruction: String,
    /// Chat model for the code tool
    pub code_model: String,
    /// System instruction for the code tool
    pub code_instruction: String,
    /// Image model
    pub image_model: String,
    /// Upper bound on `amount`
    pub max_images: u32,
    /// Replicate version for music
    pub music_version: String,
    /// Replicate version for video
    pub video_version: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            conversation_model: "gpt-3.5-turbo".to_string(),
            conversation_instruction: CONVERSATION_INSTRUCTION.to_string(),
            code_model: "gpt-4".to_string(),
            code_instruction: CODE_INSTRUCTION.to_string(),
            image_model: "dall-e-2".to_string(),
            max_images: DEFAULT_MAX_IMAGES,
            music_version: DEFAULT_MUSIC_VERSION.to_string(),
            video_version: DEFAULT_VIDEO_VERSION.to_string(),
        }
    }
}

impl ToolSettings {
    /// Chat model for a chat tool
    #[must_use]
    pub fn model_for(&self, tool: ToolKind) -> Option<&str> {
        match tool {
            ToolKind::Conversation => Some(&self.conversation_model),
            ToolKind::Code => Some(&self.code_model),
            _ => None,
        }
    }

    /// System instruction for a chat tool; blank instructions are skipped
    #[must_use]
    pub fn instruction_for(&self, tool: ToolKind) -> Option<&str> {
        let instruction = match tool {
            ToolKind::Conversation => &self.conversation_instruction,
            ToolKind::Code => &self.code_instruction,
            _ => return None,
        };
        Some(instruction.as_str()).filter(|s| !s.trim().is_empty())
    }
}

// ============================================================================
// Proxy
// ============================================================================

/// Sends validated payloads to the configured providers
pub struct UpstreamProxy {
    chat: Arc<dyn ChatProvider>,
    images: Arc<dyn ImageProvider>,
    media: Arc<dyn MediaProvider>,
    settings: ToolSettings,
    retry: RetryConfig,
    deadline: Option<Duration>,
}

impl UpstreamProxy {
    /// Create a proxy over the given providers with default retry and no deadline
    pub fn new(
        chat: Arc<dyn ChatProvider>,
        images: Arc<dyn ImageProvider>,
        media: Arc<dyn MediaProvider>,
        settings: ToolSettings,
    ) -> Self {
        Self {
            chat,
            images,
            media,
            settings,
            retry: RetryConfig::default(),
            deadline: None,
        }
    }

    /// Set the retry policy for chat tools
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Bound every upstream call (retries included) by `deadline`
    #[must_use]
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Tool settings
    pub fn settings(&self) -> &ToolSettings {
        &self.settings
    }

    /// Retry policy
    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Run a chat tool and return the generated text
    pub async fn chat(&self, tool: ToolKind, caller_id: &str, payload: &ChatPayload) -> Result<String> {
        require_caller(caller_id)?;
        let model = self
            .settings
            .model_for(tool)
            .ok_or_else(|| Error::InvalidPayload(format!("{} is not a chat tool", tool)))?;
        payload.validate()?;

        let mut messages = Vec::with_capacity(payload.messages.len() + 1);
        if let Some(instruction) = self.settings.instruction_for(tool) {
            messages.push(Message::system(instruction));
        }
        messages.extend(payload.messages.iter().cloned());
        let request = CompletionRequest::new(model).with_messages(messages);

        debug!(tool = %tool, caller_id = %caller_id, model = %model, "Sending chat completion");

        let response = self
            .within_deadline(tool, async {
                retry_with_backoff(
                    &self.retry,
                    || self.chat.complete(request.clone()),
                    muse_llm::Error::is_rate_limit,
                )
                .await
                .map_err(|e| {
                    if e.last_error.is_rate_limit() {
                        Error::UpstreamError(format!(
                            "{} still rate limited after {} attempts",
                            self.chat.name(),
                            e.attempts
                        ))
                    } else {
                        Error::from(e.last_error)
                    }
                })
            })
            .await?;

        response
            .text()
            .map(str::to_string)
            .ok_or_else(|| Error::EmptyUpstreamResult(format!("{} returned no message content", tool)))
    }

    /// Generate images
    pub async fn images(&self, caller_id: &str, spec: &ImageSpec) -> Result<Vec<GeneratedImage>> {
        require_caller(caller_id)?;
        let request = ImageRequest {
            model: self.settings.image_model.clone(),
            prompt: spec.prompt.clone(),
            n: spec.amount,
            size: spec.size,
        };

        debug!(caller_id = %caller_id, n = spec.amount, size = %spec.size, "Sending image generation");

        let images = self
            .within_deadline(ToolKind::Image, async {
                self.images
                    .generate_images(request)
                    .await
                    .map_err(single_attempt_error)
            })
            .await?;

        let images: Vec<GeneratedImage> = images.into_iter().filter(GeneratedImage::has_content).collect();
        if images.is_empty() {
            return Err(Error::EmptyUpstreamResult(
                "image provider returned no images".to_string(),
            ));
        }
        Ok(images)
    }

    /// Generate music; the output must carry an `audio` URL
    pub async fn music(&self, caller_id: &str, payload: &PromptPayload) -> Result<Value> {
        require_caller(caller_id)?;
        payload.validate()?;
        let request = MediaRequest::new(
            self.settings.music_version.clone(),
            json!({ "prompt_b": payload.prompt }),
        );

        let output = self.run_media(ToolKind::Music, caller_id, request).await?;
        let has_audio = output
            .get("audio")
            .and_then(Value::as_str)
            .is_some_and(|url| !url.trim().is_empty());
        if !has_audio {
            return Err(Error::EmptyUpstreamResult(
                "music output has no audio".to_string(),
            ));
        }
        Ok(output)
    }

    /// Generate video; the output must carry a non-empty URL
    pub async fn video(&self, caller_id: &str, payload: &PromptPayload) -> Result<Value> {
        require_caller(caller_id)?;
        payload.validate()?;
        let request = MediaRequest::new(
            self.settings.video_version.clone(),
            json!({ "prompt": payload.prompt }),
        );

        let output = self.run_media(ToolKind::Video, caller_id, request).await?;
        if !has_url(&output) {
            return Err(Error::EmptyUpstreamResult(
                "video output has no URL".to_string(),
            ));
        }
        Ok(output)
    }

    async fn run_media(&self, tool: ToolKind, caller_id: &str, request: MediaRequest) -> Result<Value> {
        debug!(tool = %tool, caller_id = %caller_id, version = %request.version, "Running media prediction");
        self.within_deadline(tool, async {
            self.media.run(request).await.map_err(single_attempt_error)
        })
        .await
    }

    async fn within_deadline<T, F>(&self, tool: ToolKind, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, call).await.unwrap_or_else(|_| {
                warn!(tool = %tool, deadline_secs = deadline.as_secs(), "Upstream deadline exceeded");
                Err(Error::UpstreamError(format!(
                    "{} call exceeded {}s deadline",
                    tool,
                    deadline.as_secs()
                )))
            }),
            None => call.await,
        }
    }
}

fn require_caller(caller_id: &str) -> Result<()> {
    if caller_id.trim().is_empty() {
        return Err(Error::Unauthenticated);
    }
    Ok(())
}

/// Media tools make one attempt, so a 429 is just another upstream failure
fn single_attempt_error(err: muse_llm::Error) -> Error {
    if err.is_rate_limit() {
        Error::UpstreamError(err.to_string())
    } else {
        Error::from(err)
    }
}

/// A string URL, or an array whose first element is one
fn has_url(output: &Value) -> bool {
    let url = match output {
        Value::Array(items) => items.first().and_then(Value::as_str),
        other => other.as_str(),
    };
    url.is_some_and(|u| !u.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use muse_llm::mock::{Outcome, ScriptedChatProvider, ScriptedImageProvider, ScriptedMediaProvider};
    use muse_llm::MessageRole;

    fn fast_retry(max_retries: u32) -> RetryConfig {
        RetryConfig::new()
            .with_max_retries(max_retries)
            .with_initial_delay(Duration::from_millis(1))
            .with_max_delay(Duration::from_millis(5))
            .with_max_jitter(Duration::ZERO)
    }

    struct Stubs {
        chat: Arc<ScriptedChatProvider>,
        images: Arc<ScriptedImageProvider>,
        media: Arc<ScriptedMediaProvider>,
    }

    impl Stubs {
        fn new() -> Self {
            Self {
                chat: Arc::new(ScriptedChatProvider::replying("```rust\nfn main() {}\n```")),
                images: Arc::new(ScriptedImageProvider::replying(vec![
                    GeneratedImage::from_url("https://img/1.png"),
                ])),
                media: Arc::new(ScriptedMediaProvider::replying(
                    json!({ "audio": "https://cdn/a.mp3", "spectrogram": "https://cdn/s.png" }),
                )),
            }
        }

        fn proxy(&self) -> UpstreamProxy {
            UpstreamProxy::new(
                self.chat.clone(),
                self.images.clone(),
                self.media.clone(),
                ToolSettings::default(),
            )
            .with_retry(fast_retry(5))
        }
    }

    fn chat_payload() -> ChatPayload {
        ChatPayload::new(vec![Message::user("write hello world")])
    }

    #[test]
    fn test_tool_kind_names() {
        let names: Vec<&str> = ToolKind::ALL.iter().map(ToolKind::as_str).collect();
        assert_eq!(names, vec!["conversation", "code", "image", "music", "video"]);
        assert!(ToolKind::Code.is_chat());
        assert!(!ToolKind::Video.is_chat());
    }

    #[test]
    fn test_image_payload_parse() {
        let payload = ImagePayload {
            prompt: "a horse on mars".to_string(),
            amount: "2".to_string(),
            resolution: "512x512".to_string(),
        };
        let spec = payload.parse(4).unwrap();
        assert_eq!(spec.amount, 2);
        assert_eq!(spec.size, ImageSize::S512);
    }

    #[test]
    fn test_image_payload_rejections() {
        let base = ImagePayload {
            prompt: "p".to_string(),
            amount: "1".to_string(),
            resolution: "256x256".to_string(),
        };

        let bad_resolution = ImagePayload {
            resolution: "999x999".to_string(),
            ..base.clone()
        };
        assert!(matches!(bad_resolution.parse(4), Err(Error::InvalidPayload(_))));

        let bad_amount = ImagePayload {
            amount: "two".to_string(),
            ..base.clone()
        };
        assert!(matches!(bad_amount.parse(4), Err(Error::InvalidPayload(_))));

        let too_many = ImagePayload {
            amount: "5".to_string(),
            ..base.clone()
        };
        assert!(matches!(too_many.parse(4), Err(Error::InvalidPayload(_))));

        let zero = ImagePayload {
            amount: "0".to_string(),
            ..base.clone()
        };
        assert!(matches!(zero.parse(4), Err(Error::InvalidPayload(_))));

        let no_prompt = ImagePayload {
            prompt: "  ".to_string(),
            ..base
        };
        assert!(matches!(no_prompt.parse(4), Err(Error::InvalidPayload(_))));
    }

    #[test]
    fn test_image_amount_messages() {
        let with_amount = |amount: &str| ImagePayload {
            prompt: "p".to_string(),
            amount: amount.to_string(),
            resolution: "256x256".to_string(),
        };

        for fractional in ["1.5", "-1"] {
            match with_amount(fractional).parse(4) {
                Err(Error::InvalidPayload(msg)) => {
                    assert_eq!(msg, "Amount must be a whole number between 1 and 4.")
                }
                other => panic!("unexpected result for {}: {:?}", fractional, other),
            }
        }

        match with_amount("two").parse(4) {
            Err(Error::InvalidPayload(msg)) => assert_eq!(
                msg,
                "Amount is required and must be a string representation of a number."
            ),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_chat_payload_rejects_unknown_role() {
        let result: std::result::Result<ChatPayload, _> =
            serde_json::from_value(json!({ "messages": [{ "role": "tool", "content": "x" }] }));
        assert!(result.is_err());
    }

    #[test]
    fn test_settings_skip_blank_instruction() {
        let settings = ToolSettings {
            conversation_instruction: "   ".to_string(),
            ..ToolSettings::default()
        };
        assert_eq!(settings.instruction_for(ToolKind::Conversation), None);
        assert_eq!(settings.instruction_for(ToolKind::Code), Some(CODE_INSTRUCTION));
        assert_eq!(settings.instruction_for(ToolKind::Image), None);
    }

    #[tokio::test]
    async fn test_chat_prepends_instruction() {
        let stubs = Stubs::new();
        let proxy = stubs.proxy();

        let content = proxy.chat(ToolKind::Code, "user_1", &chat_payload()).await.unwrap();
        assert!(content.contains("fn main"));

        let request = stubs.chat.last_request().unwrap();
        assert_eq!(request.model, "gpt-4");
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, MessageRole::System);
        assert_eq!(request.messages[0].content, CODE_INSTRUCTION);
        assert_eq!(request.messages[1].content, "write hello world");
    }

    #[tokio::test]
    async fn test_chat_retries_rate_limit_then_succeeds() {
        let stubs = Stubs::new();
        stubs.chat.push(Outcome::RateLimited);
        stubs.chat.push(Outcome::RateLimited);
        let proxy = stubs.proxy();

        let result = proxy.chat(ToolKind::Conversation, "user_1", &chat_payload()).await;
        assert!(result.is_ok());
        assert_eq!(stubs.chat.calls(), 3);
    }

    #[tokio::test]
    async fn test_chat_retry_bound() {
        let stubs = Stubs {
            chat: Arc::new(ScriptedChatProvider::with_fallback(Outcome::RateLimited)),
            ..Stubs::new()
        };
        let proxy = stubs.proxy().with_retry(fast_retry(3));

        let result = proxy.chat(ToolKind::Conversation, "user_1", &chat_payload()).await;
        assert!(matches!(result, Err(Error::UpstreamError(_))));
        assert_eq!(stubs.chat.calls(), 4);
    }

    #[tokio::test]
    async fn test_chat_does_not_retry_other_failures() {
        let stubs = Stubs {
            chat: Arc::new(ScriptedChatProvider::with_fallback(Outcome::Fail(500))),
            ..Stubs::new()
        };
        let proxy = stubs.proxy();

        let result = proxy.chat(ToolKind::Code, "user_1", &chat_payload()).await;
        assert!(matches!(result, Err(Error::UpstreamError(_))));
        assert_eq!(stubs.chat.calls(), 1);
    }

    #[tokio::test]
    async fn test_chat_empty_content() {
        let stubs = Stubs {
            chat: Arc::new(ScriptedChatProvider::with_fallback(Outcome::Ok(Some(String::new())))),
            ..Stubs::new()
        };
        let proxy = stubs.proxy();

        let result = proxy.chat(ToolKind::Code, "user_1", &chat_payload()).await;
        assert!(matches!(result, Err(Error::EmptyUpstreamResult(_))));
    }

    #[tokio::test]
    async fn test_chat_requires_caller() {
        let stubs = Stubs::new();
        let proxy = stubs.proxy();

        let result = proxy.chat(ToolKind::Code, "", &chat_payload()).await;
        assert!(matches!(result, Err(Error::Unauthenticated)));
        assert_eq!(stubs.chat.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_cuts_retry_sequence() {
        let stubs = Stubs {
            chat: Arc::new(ScriptedChatProvider::with_fallback(Outcome::RateLimited)),
            ..Stubs::new()
        };
        let retry = RetryConfig::new()
            .with_max_retries(10)
            .with_initial_delay(Duration::from_secs(10))
            .with_max_delay(Duration::from_secs(30))
            .with_max_jitter(Duration::ZERO);
        let proxy = stubs
            .proxy()
            .with_retry(retry)
            .with_deadline(Some(Duration::from_secs(25)));

        let result = proxy.chat(ToolKind::Conversation, "user_1", &chat_payload()).await;
        assert!(matches!(result, Err(Error::UpstreamError(msg)) if msg.contains("deadline")));
        assert!(stubs.chat.calls() < 11);
    }

    #[tokio::test]
    async fn test_images_single_attempt_on_rate_limit() {
        let stubs = Stubs {
            images: Arc::new(ScriptedImageProvider::with_fallback(Outcome::RateLimited)),
            ..Stubs::new()
        };
        let proxy = stubs.proxy();
        let spec = ImageSpec {
            prompt: "p".to_string(),
            amount: 1,
            size: ImageSize::S256,
        };

        let result = proxy.images("user_1", &spec).await;
        assert!(matches!(result, Err(Error::UpstreamError(_))));
        assert_eq!(stubs.images.calls(), 1);
    }

    #[tokio::test]
    async fn test_images_without_urls_are_empty_result() {
        let stubs = Stubs {
            images: Arc::new(ScriptedImageProvider::replying(vec![GeneratedImage {
                url: None,
                b64_json: None,
                revised_prompt: Some("p".to_string()),
            }])),
            ..Stubs::new()
        };
        let proxy = stubs.proxy();
        let spec = ImageSpec {
            prompt: "p".to_string(),
            amount: 1,
            size: ImageSize::S256,
        };

        let result = proxy.images("user_1", &spec).await;
        assert!(matches!(result, Err(Error::EmptyUpstreamResult(_))));
    }

    #[tokio::test]
    async fn test_music_input_and_output_check() {
        let stubs = Stubs::new();
        let proxy = stubs.proxy();

        let output = proxy.music("user_1", &PromptPayload::new("piano")).await.unwrap();
        assert_eq!(output["audio"], "https://cdn/a.mp3");

        let request = stubs.media.last_request().unwrap();
        assert_eq!(request.version, DEFAULT_MUSIC_VERSION);
        assert_eq!(request.input, json!({ "prompt_b": "piano" }));

        stubs.media.push(Outcome::Ok(json!({ "spectrogram": "x" })));
        let result = proxy.music("user_1", &PromptPayload::new("piano")).await;
        assert!(matches!(result, Err(Error::EmptyUpstreamResult(_))));
    }

    #[tokio::test]
    async fn test_video_input_and_output_check() {
        let stubs = Stubs {
            media: Arc::new(ScriptedMediaProvider::replying(json!(["https://cdn/v.mp4"]))),
            ..Stubs::new()
        };
        let proxy = stubs.proxy();

        let output = proxy.video("user_1", &PromptPayload::new("clownfish")).await.unwrap();
        assert_eq!(output, json!(["https://cdn/v.mp4"]));

        let request = stubs.media.last_request().unwrap();
        assert_eq!(request.version, DEFAULT_VIDEO_VERSION);
        assert_eq!(request.input, json!({ "prompt": "clownfish" }));

        stubs.media.push(Outcome::Ok(json!([])));
        let result = proxy.video("user_1", &PromptPayload::new("clownfish")).await;
        assert!(matches!(result, Err(Error::EmptyUpstreamResult(_))));
    }

    #[tokio::test]
    async fn test_media_prompt_required() {
        let stubs = Stubs::new();
        let proxy = stubs.proxy();

        let result = proxy.video("user_1", &PromptPayload::new("")).await;
        assert!(matches!(result, Err(Error::InvalidPayload(_))));
        assert_eq!(stubs.media.calls(), 0);
    }
}
