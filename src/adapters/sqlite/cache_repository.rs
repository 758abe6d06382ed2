//! SQLite persistence for the gateway response cache.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::adapters::sqlite::parse_datetime;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::{CacheEntry, CacheStore};

#[derive(Clone)]
pub struct SqliteCacheStore {
    pool: SqlitePool,
}

impl SqliteCacheStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CacheRow {
    cache_key: String,
    tier: String,
    response: String,
    created_at: String,
}

impl CacheRow {
    fn into_entry(self) -> DomainResult<(String, CacheEntry)> {
        let tier = self
            .tier
            .parse()
            .map_err(|e| DomainError::Serialization(format!("cache row tier: {e}")))?;
        Ok((
            self.cache_key,
            CacheEntry {
                response: self.response,
                tier,
                created_at: parse_datetime(&self.created_at)?,
            },
        ))
    }
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn load_all(&self) -> DomainResult<Vec<(String, CacheEntry)>> {
        let rows: Vec<CacheRow> =
            sqlx::query_as("SELECT cache_key, tier, response, created_at FROM response_cache")
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(CacheRow::into_entry).collect()
    }

    async fn put(&self, key: &str, entry: &CacheEntry) -> DomainResult<()> {
        // last writer wins
        sqlx::query(
            "INSERT OR REPLACE INTO response_cache (cache_key, tier, response, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(key)
        .bind(entry.tier.as_str())
        .bind(&entry.response)
        .bind(entry.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
