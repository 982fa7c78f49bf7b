//! SQLite-backed usage store

use super::{UsageRecord, UsageStore};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Row, Sqlite};
use std::path::Path;
use tracing::debug;

/// Usage counters persisted in the `user_api_limit` table
#[derive(Clone)]
pub struct SqliteUsageStore {
    pool: Pool<Sqlite>,
}

impl SqliteUsageStore {
    /// Open (or create) a database file
    pub async fn from_path(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::Storage(format!("Failed to create directory: {}", e))
                })?;
            }
        }

        let url = format!("sqlite:{}?mode=rwc", path.display());
        Self::connect(&url, 5).await
    }

    /// Connect using a SQLite URL
    pub async fn from_url(url: &str) -> Result<Self> {
        if url.contains(":memory:") {
            return Self::in_memory().await;
        }
        Self::connect(url, 5).await
    }

    /// Private in-memory database (single connection so every query sees the same data)
    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:", 1).await
    }

    /// Wrap an existing pool, running migrations
    pub async fn from_pool(pool: Pool<Sqlite>) -> Result<Self> {
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Self::from_pool(pool).await
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_api_limit (
                caller_id TEXT PRIMARY KEY,
                count INTEGER NOT NULL DEFAULT 0 CHECK (count >= 0),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        debug!("Usage store migrated");
        Ok(())
    }

    /// Underlying pool
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait::async_trait]
impl UsageStore for SqliteUsageStore {
    async fn get(&self, caller_id: &str) -> Result<Option<UsageRecord>> {
        let row = sqlx::query(
            "SELECT caller_id, count, created_at, updated_at FROM user_api_limit WHERE caller_id = ?1",
        )
        .bind(caller_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let count: i64 = row.try_get("count")?;
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;

        Ok(Some(UsageRecord {
            caller_id: row.try_get("caller_id")?,
            count: u64::try_from(count).unwrap_or(0),
            created_at: parse_timestamp(&created_at),
            updated_at: parse_timestamp(&updated_at),
        }))
    }

    async fn increment(&self, caller_id: &str) -> Result<u64> {
        let now = Utc::now().to_rfc3339();
        let count: i64 = sqlx::query_scalar(
            "INSERT INTO user_api_limit (caller_id, count, created_at, updated_at)
             VALUES (?1, 1, ?2, ?2)
             ON CONFLICT(caller_id) DO UPDATE SET
                count = count + 1,
                updated_at = excluded.updated_at
             RETURNING count",
        )
        .bind(caller_id)
        .bind(&now)
        .fetch_one(&self.pool)
        .await?;

        Ok(u64::try_from(count).unwrap_or(0))
    }
}
