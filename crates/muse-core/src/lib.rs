//! Muse Core - Quota-gated generation pipeline
//!
//! This crate provides the request pipeline shared by every generation tool:
//! - Auth: API key store resolving callers to stable ids
//! - Quota: per-caller free-tier usage counters and the gate deciding admission
//! - Subscription: paid-entitlement lookup bypassing the quota
//! - Proxy: validated payloads forwarded to upstream providers with backoff
//! - Pipeline: the composed authenticate → validate → gate → proxy → record flow

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod error;
pub mod pipeline;
pub mod proxy;
pub mod quota;
pub mod subscription;
pub mod utils;

pub use auth::{AuthContext, AuthError, AuthStore};
pub use error::{Error, Result};
pub use pipeline::{CallerUsage, GenerationOutput, GenerationRequest, GenerationService};
pub use proxy::{
    ChatPayload, ImagePayload, ImageSpec, PromptPayload, ToolKind, ToolSettings, UpstreamProxy,
};
pub use quota::{
    MemoryUsageStore, QuotaGate, SqliteUsageStore, UsageRecord, UsageStore, UsageSummary,
    DEFAULT_FREE_LIMIT,
};
pub use subscription::{StaticSubscriptions, SubscriptionChecker};
pub use utils::{retry_with_backoff, RetryConfig, RetryError};
