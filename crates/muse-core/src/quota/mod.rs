//! Free-tier quota gate
//!
//! One [`UsageRecord`] per caller counts billed operations. The [`QuotaGate`]
//! decides admission before an upstream call and records consumption after a
//! successful one. Increments are delegated to the store's atomic primitive so
//! concurrent requests from one caller never lose an update.

mod memory;
mod sqlite;


pub use memory::MemoryUsageStore;
pub use sqlite::SqliteUsageStore;

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Free operations granted to callers without a subscription
pub const DEFAULT_FREE_LIMIT: u64 = 5;

/// Persisted usage counter for one caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageRecord {
    /// Caller identifier (unique)
    pub caller_id: String,
    /// Billed operations consumed
    pub count: u64,
    /// First billed operation
    pub created_at: DateTime<Utc>,
    /// Most recent billed operation
    pub updated_at: DateTime<Utc>,
}

/// Storage backend for usage counters
#[async_trait::async_trait]
pub trait UsageStore: Send + Sync {
    /// Look up the record for a caller
    async fn get(&self, caller_id: &str) -> Result<Option<UsageRecord>>;

    /// Atomically create the record with `count = 1` or add one to it.
    /// Returns the new count.
    async fn increment(&self, caller_id: &str) -> Result<u64>;
}

/// Usage as shown on the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UsageSummary {
    /// Billed operations consumed
    pub count: u64,
    /// Free limit
    pub limit: u64,
    /// Free operations left
    pub remaining: u64,
}

/// Admission decision for non-paid callers
#[derive(Clone)]
pub struct QuotaGate {
    store: Arc<dyn UsageStore>,
    free_limit: u64,
}

impl QuotaGate {
    /// Create a gate over `store` allowing `free_limit` operations per caller
    pub fn new(store: Arc<dyn UsageStore>, free_limit: u64) -> Self {
        Self { store, free_limit }
    }

    /// Configured free limit
    pub fn free_limit(&self) -> u64 {
        self.free_limit
    }

    /// Whether `caller_id` may perform another billed operation.
    ///
    /// Read-only. An empty caller id is never within limit; a store failure denies.
    pub async fn is_within_limit(&self, caller_id: &str) -> bool {
        if caller_id.is_empty() {
            return false;
        }

        match self.store.get(caller_id).await {
            Ok(None) => true,
            Ok(Some(record)) => {
                debug!(caller_id = %caller_id, count = record.count, limit = self.free_limit, "Quota checked");
                record.count < self.free_limit
            }
            Err(e) => {
                error!(caller_id = %caller_id, error = %e, "Quota lookup failed, denying");
                false
            }
        }
    }

    /// Record one billed operation. No-op for an empty caller id.
    pub async fn record_usage(&self, caller_id: &str) -> Result<()> {
        if caller_id.is_empty() {
            return Ok(());
        }

        let count = self.store.increment(caller_id).await?;
        info!(caller_id = %caller_id, count, limit = self.free_limit, "Usage recorded");
        Ok(())
    }

    /// Current usage for a caller
    pub async fn usage(&self, caller_id: &str) -> Result<UsageSummary> {
        let count = self
            .store
            .get(caller_id)
            .await?
            .map(|record| record.count)
            .unwrap_or(0);

        Ok(UsageSummary {
            count,
            limit: self.free_limit,
            remaining: self.free_limit.saturating_sub(count),
        })
    }
}
