//! In-process usage store

use super::{UsageRecord, UsageStore};
use crate::error::Result;
use chrono::Utc;
use dashmap::DashMap;

/// Usage counters held in memory (tests, single-node development)
#[derive(Default)]
pub struct MemoryUsageStore {
    records: DashMap<String, UsageRecord>,
}

impl MemoryUsageStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a caller's counter
    pub fn set_count(&self, caller_id: &str, count: u64) {
        let now = Utc::now();
        self.records.insert(
            caller_id.to_string(),
            UsageRecord {
                caller_id: caller_id.to_string(),
                count,
                created_at: now,
                updated_at: now,
            },
        );
    }
}

#[async_trait::async_trait]
impl UsageStore for MemoryUsageStore {
    async fn get(&self, caller_id: &str) -> Result<Option<UsageRecord>> {
        Ok(self.records.get(caller_id).map(|r| r.value().clone()))
    }

    async fn increment(&self, caller_id: &str) -> Result<u64> {
        let now = Utc::now();
        // The entry guard holds the shard lock for the whole update
        let record = self
            .records
            .entry(caller_id.to_string())
            .and_modify(|record| {
                record.count += 1;
                record.updated_at = now;
            })
            .or_insert_with(|| UsageRecord {
                caller_id: caller_id.to_string(),
                count: 1,
                created_at: now,
                updated_at: now,
            });
        Ok(record.count)
    }
}
