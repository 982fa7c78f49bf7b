//! Configuration validation
//!
//! Security checks for production deployments and a sanity check of the retry budget.

use super::config::{AppConfig, ReplicateAppConfig, RetryAppConfig};
use super::loader::environment_name;
use std::time::Duration;
use tracing::{info, warn};

/// Warn about insecure settings when `MUSE_ENV=production`
pub fn validate_production_config(config: &AppConfig) {
    if environment_name().to_lowercase() != "production" {
        return;
    }

    if config.server.host == "0.0.0.0" {
        warn!(
            "SECURITY WARNING: Server is binding to all interfaces (0.0.0.0) in production. \
             Consider binding to 127.0.0.1 and using a reverse proxy."
        );
    }

    if !config.server.auth.enabled {
        warn!(
            caller_id = %config.server.auth.dev_caller_id,
            "SECURITY WARNING: Authentication is DISABLED in production. \
             Every request is billed to the development caller."
        );
    }

    if config.server.auth.enabled && config.server.auth.keys.is_empty() {
        warn!("No API keys configured; every generation request will be rejected with 401");
    }

    if config.database.url.contains(":memory:") {
        warn!("Usage counters are in memory and will reset on restart");
    }
}

/// Check that an exhausted chat retry sequence fits inside the overall deadline
///
/// Returns `false` (and warns) when the worst-case backoff alone would outlast
/// `deadline_secs`, in which case the deadline rather than `max_retries`
/// ends persistent rate limiting.
pub fn validate_retry_budget(config: &RetryAppConfig) -> bool {
    let retry = config.to_retry_config();
    let worst_case = retry.worst_case_sleep();

    match config.deadline() {
        Some(deadline) if worst_case >= deadline => {
            warn!(
                max_retries = retry.max_retries,
                worst_case_sleep_ms = worst_case.as_millis() as u64,
                deadline_ms = deadline.as_millis() as u64,
                "Retry backoff can outlast the upstream deadline"
            );
            false
        }
        deadline => {
            info!(
                max_retries = retry.max_retries,
                worst_case_sleep_ms = worst_case.as_millis() as u64,
                deadline_ms = ?deadline.map(|d| d.as_millis() as u64),
                "Retry budget"
            );
            true
        }
    }
}

/// Check that a Replicate prediction gives up on its own before the overall deadline
///
/// The prediction budget is the HTTP timeout of the `Prefer: wait` create call plus
/// `max_polls` poll intervals. Returns `false` (and warns) when the deadline would
/// cut a run that `max_polls` still allows.
pub fn validate_media_budget(replicate: &ReplicateAppConfig, retry: &RetryAppConfig) -> bool {
    let Some(deadline) = retry.deadline() else {
        return true;
    };
    let budget = Duration::from_secs(replicate.timeout_secs).saturating_add(
        Duration::from_millis(replicate.poll_interval_ms).saturating_mul(replicate.max_polls),
    );

    if budget >= deadline {
        warn!(
            media_budget_ms = budget.as_millis() as u64,
            deadline_ms = deadline.as_millis() as u64,
            "Replicate polling can outlast the upstream deadline; long predictions will end as deadline errors"
        );
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_retry_budget_fits_deadline() {
        assert!(validate_retry_budget(&RetryAppConfig::default()));
    }

    #[test]
    fn test_retry_budget_exceeding_deadline_is_flagged() {
        let mut config = RetryAppConfig::default();
        config.max_retries = 8;
        config.deadline_secs = 60;
        assert!(!validate_retry_budget(&config));
    }

    #[test]
    fn test_disabled_deadline_always_fits() {
        let mut config = RetryAppConfig::default();
        config.max_retries = 20;
        config.deadline_secs = 0;
        assert!(validate_retry_budget(&config));
    }

    #[test]
    fn test_default_media_budget_fits_deadline() {
        assert!(validate_media_budget(
            &ReplicateAppConfig::default(),
            &RetryAppConfig::default()
        ));
    }

    #[test]
    fn test_media_budget_exceeding_deadline_is_flagged() {
        let mut retry = RetryAppConfig::default();
        retry.deadline_secs = 120;
        // 90s create timeout + 120 polls at 1s
        assert!(!validate_media_budget(&ReplicateAppConfig::default(), &retry));

        retry.deadline_secs = 0;
        assert!(validate_media_budget(&ReplicateAppConfig::default(), &retry));
    }
}
