//! Server configuration types
//!
//! Every section of `config/default.toml` maps onto one struct here.

use muse_core::{RetryConfig, ToolSettings};
use serde::Deserialize;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
    #[serde(default)]
    pub subscriptions: SubscriptionsConfig,
    #[serde(default)]
    pub retry: RetryAppConfig,
    #[serde(default)]
    pub openai: OpenAiAppConfig,
    #[serde(default)]
    pub replicate: ReplicateAppConfig,
}

impl AppConfig {
    /// Per-tool models and instructions for the upstream proxy
    pub fn tool_settings(&self) -> ToolSettings {
        ToolSettings {
            conversation_model: self.openai.conversation_model.clone(),
            conversation_instruction: self.openai.conversation_instruction.clone(),
            code_model: self.openai.code_model.clone(),
            code_instruction: self.openai.code_instruction.clone(),
            image_model: self.openai.image_model.clone(),
            max_images: self.openai.max_images,
            music_version: self.replicate.music_version.clone(),
            video_version: self.replicate.video_version.clone(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Caller id used for every request while auth is disabled
    #[serde(default = "default_dev_caller")]
    pub dev_caller_id: String,
    #[serde(default)]
    pub keys: Vec<ApiKeyConfig>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dev_caller_id: default_dev_caller(),
            keys: Vec::new(),
        }
    }
}

/// A pre-hashed API key bound to a caller
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeyConfig {
    pub caller_id: String,
    /// SHA-256 hex digest of the raw key
    pub key_hash: String,
    #[serde(default)]
    pub label: String,
    /// Keep the entry but reject the key with 401
    #[serde(default)]
    pub revoked: bool,
}

fn default_true() -> bool {
    true
}

fn default_dev_caller() -> String {
    "anonymous".to_string()
}

/// Usage store location
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Free tier
#[derive(Debug, Clone, Deserialize)]
pub struct QuotaConfig {
    #[serde(default = "default_free_limit")]
    pub free_limit: u64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            free_limit: default_free_limit(),
        }
    }
}

fn default_free_limit() -> u64 {
    muse_core::DEFAULT_FREE_LIMIT
}

/// Paid callers bypassing the quota
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionsConfig {
    #[serde(default)]
    pub pro_callers: Vec<String>,
}

/// Chat retry policy (exposed to TOML)
#[derive(Debug, Clone, Deserialize)]
pub struct RetryAppConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_max_jitter_ms")]
    pub max_jitter_ms: u64,
    /// Overall bound on one upstream call in seconds (0 = no limit)
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,
}

impl Default for RetryAppConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_jitter_ms: default_max_jitter_ms(),
            deadline_secs: default_deadline_secs(),
        }
    }
}

impl RetryAppConfig {
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig::new()
            .with_max_retries(self.max_retries)
            .with_initial_delay(Duration::from_millis(self.initial_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
            .with_max_jitter(Duration::from_millis(self.max_jitter_ms))
    }

    pub fn deadline(&self) -> Option<Duration> {
        (self.deadline_secs > 0).then(|| Duration::from_secs(self.deadline_secs))
    }
}

fn default_max_retries() -> u32 {
    5
}
fn default_initial_delay_ms() -> u64 {
    1000
}
fn default_max_delay_ms() -> u64 {
    30_000
}
fn default_max_jitter_ms() -> u64 {
    1000
}
fn default_deadline_secs() -> u64 {
    300
}

/// OpenAI chat and image settings
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiAppConfig {
    #[serde(default = "default_conversation_model")]
    pub conversation_model: String,
    #[serde(default = "default_conversation_instruction")]
    pub conversation_instruction: String,
    #[serde(default = "default_code_model")]
    pub code_model: String,
    #[serde(default = "default_code_instruction")]
    pub code_instruction: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    #[serde(default = "default_max_images")]
    pub max_images: u32,
    #[serde(default = "default_openai_timeout")]
    pub timeout_secs: u64,
}

impl Default for OpenAiAppConfig {
    fn default() -> Self {
        Self {
            conversation_model: default_conversation_model(),
            conversation_instruction: default_conversation_instruction(),
            code_model: default_code_model(),
            code_instruction: default_code_instruction(),
            image_model: default_image_model(),
            max_images: default_max_images(),
            timeout_secs: default_openai_timeout(),
        }
    }
}

fn default_conversation_model() -> String {
    ToolSettings::default().conversation_model
}
fn default_conversation_instruction() -> String {
    muse_core::proxy::CONVERSATION_INSTRUCTION.to_string()
}
fn default_code_model() -> String {
    ToolSettings::default().code_model
}
fn default_code_instruction() -> String {
    muse_core::proxy::CODE_INSTRUCTION.to_string()
}
fn default_image_model() -> String {
    ToolSettings::default().image_model
}
fn default_max_images() -> u32 {
    muse_core::proxy::DEFAULT_MAX_IMAGES
}
fn default_openai_timeout() -> u64 {
    60
}

/// Replicate media settings
#[derive(Debug, Clone, Deserialize)]
pub struct ReplicateAppConfig {
    #[serde(default = "default_music_version")]
    pub music_version: String,
    #[serde(default = "default_video_version")]
    pub video_version: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
    #[serde(default = "default_replicate_timeout")]
    pub timeout_secs: u64,
}

impl Default for ReplicateAppConfig {
    fn default() -> Self {
        Self {
            music_version: default_music_version(),
            video_version: default_video_version(),
            poll_interval_ms: default_poll_interval_ms(),
            max_polls: default_max_polls(),
            timeout_secs: default_replicate_timeout(),
        }
    }
}

fn default_music_version() -> String {
    muse_core::proxy::DEFAULT_MUSIC_VERSION.to_string()
}
fn default_video_version() -> String {
    muse_core::proxy::DEFAULT_VIDEO_VERSION.to_string()
}
fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_max_polls() -> u32 {
    120
}
fn default_replicate_timeout() -> u64 {
    90
}
