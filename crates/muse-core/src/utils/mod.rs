//! Utility modules for muse-core
//!
//! - retry: Retry logic with exponential backoff and jitter

mod retry;

pub use retry::{retry_with_backoff, RetryConfig, RetryError};
