//! Async pool registry (C2).
//!
//! Registry-map mutations are serialized on a single `tokio::sync::Mutex`;
//! engine operations (`execute`, `test_connection`) run against a cloned
//! `Arc<MySqlPool>` and are not serialized by this lock, matching the
//! teacher's pattern of short critical sections around shared maps.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dbmcp_domain::config::PoolConfig;
use dbmcp_domain::error::{Error, Result};
use dbmcp_domain::trace::TraceEvent;
use parking_lot::Mutex as SyncMutex;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::{MySqlPool, Row};
use tokio::sync::Mutex;

use crate::convert::row_to_json;
use crate::key::{PoolKey, ResolvedConnection};

struct PoolEntry {
    pool: MySqlPool,
    created_at: DateTime<Utc>,
    last_used_at: SyncMutex<DateTime<Utc>>,
    pool_size: u32,
    max_overflow: u32,
}

/// A point-in-time snapshot of one pool's utilization, returned by [`PoolRegistry::stats`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct PoolStats {
    pub key: String,
    pub size: u32,
    pub idle: usize,
    pub max_overflow: u32,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
}

/// Registry of per-destination `sqlx` MySQL pools, keyed on the password-free
/// connection tuple.
pub struct PoolRegistry {
    pools: Mutex<HashMap<PoolKey, Arc<PoolEntry>>>,
    config: PoolConfig,
}

impl PoolRegistry {
    pub fn new(config: PoolConfig) -> Self {
        Self {
            pools: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Return (creating if needed) the pool for `conn`. Touches `last_used_at`
    /// on every access, including cache hits.
    pub async fn get_engine(&self, conn: &ResolvedConnection) -> Result<()> {
        self.get_or_create(conn).await.map(|_| ())
    }

    async fn get_or_create(&self, conn: &ResolvedConnection) -> Result<Arc<PoolEntry>> {
        let key = conn.pool_key();

        {
            let pools = self.pools.lock().await;
            if let Some(entry) = pools.get(&key) {
                *entry.last_used_at.lock() = Utc::now();
                return Ok(entry.clone());
            }
        }

        // Evict LRU outside the critical section if we're at capacity, then
        // re-enter and re-check: another task may have raced us to create
        // this same key, or to evict on our behalf.
        let victim = {
            let pools = self.pools.lock().await;
            if pools.len() >= self.config.pool_max_size && !pools.contains_key(&key) {
                pools
                    .iter()
                    .min_by_key(|(_, e)| *e.last_used_at.lock())
                    .map(|(k, _)| k.clone())
            } else {
                None
            }
        };

        if let Some(victim_key) = victim {
            let evicted = {
                let mut pools = self.pools.lock().await;
                pools.remove(&victim_key)
            };
            if let Some(entry) = evicted {
                TraceEvent::PoolEvicted {
                    destination: victim_key.to_string(),
                    reason: "capacity".into(),
                }
                .emit();
                entry.pool.close().await;
            }
        }

        let new_entry = self.build_entry(conn).await?;

        let mut pools = self.pools.lock().await;
        if let Some(existing) = pools.get(&key) {
            *existing.last_used_at.lock() = Utc::now();
            return Ok(existing.clone());
        }
        let entry = Arc::new(new_entry);
        pools.insert(key.clone(), entry.clone());
        TraceEvent::PoolCreated {
            destination: key.to_string(),
            host: conn.host.clone(),
            database: conn.database.clone(),
        }
        .emit();
        Ok(entry)
    }

    async fn build_entry(&self, conn: &ResolvedConnection) -> Result<PoolEntry> {
        let pool = MySqlPoolOptions::new()
            .max_connections(self.config.pool_size + self.config.max_overflow)
            .min_connections(0)
            .acquire_timeout(Duration::from_secs(self.config.pool_timeout_s))
            .max_lifetime(Duration::from_secs(self.config.pool_recycle_s))
            .test_before_acquire(self.config.pre_ping)
            .connect(&conn.to_url())
            .await
            .map_err(|e| Error::Db(e.to_string()))?;

        let now = Utc::now();
        Ok(PoolEntry {
            pool,
            created_at: now,
            last_used_at: SyncMutex::new(now),
            pool_size: self.config.pool_size,
            max_overflow: self.config.max_overflow,
        })
    }

    /// Execute a single read-only statement and return (rows, column order).
    pub async fn execute(
        &self,
        conn: &ResolvedConnection,
        sql: &str,
        params: &[String],
    ) -> Result<(Vec<serde_json::Map<String, serde_json::Value>>, Vec<String>)> {
        let entry = self.get_or_create(conn).await?;
        *entry.last_used_at.lock() = Utc::now();

        let mut query = sqlx::query(sql);
        for p in params {
            query = query.bind(p.clone());
        }

        let mut tx = entry.pool.begin().await.map_err(|e| Error::Db(e.to_string()))?;
        let rows = query
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| Error::Sql(e.to_string()))?;
        tx.commit().await.map_err(|e| Error::Db(e.to_string()))?;

        let mut columns: Vec<String> = Vec::new();
        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let (cols, record) = row_to_json(row);
            if columns.is_empty() {
                columns = cols;
            }
            records.push(record);
        }
        Ok((records, columns))
    }

    /// `SELECT 1` connectivity probe.
    pub async fn test_connection(&self, conn: &ResolvedConnection) -> (bool, String) {
        match self.get_or_create(conn).await {
            Ok(entry) => match sqlx::query("SELECT 1").fetch_one(&entry.pool).await {
                Ok(row) => match row.try_get::<i64, _>(0) {
                    Ok(_) => (true, "ok".into()),
                    Err(e) => (false, e.to_string()),
                },
                Err(e) => (false, e.to_string()),
            },
            Err(e) => (false, e.to_string()),
        }
    }

    /// Dispose every pool.
    pub async fn close_all(&self) {
        let mut pools = self.pools.lock().await;
        for (key, entry) in pools.drain() {
            entry.pool.close().await;
            TraceEvent::PoolEvicted {
                destination: key.to_string(),
                reason: "shutdown".into(),
            }
            .emit();
        }
    }

    /// Snapshot of every pool's utilization.
    pub async fn stats(&self) -> Vec<PoolStats> {
        let pools = self.pools.lock().await;
        pools
            .iter()
            .map(|(key, entry)| PoolStats {
                key: key.to_string(),
                size: entry.pool_size,
                idle: entry.pool.num_idle(),
                max_overflow: entry.max_overflow,
                created_at: entry.created_at,
                last_used_at: *entry.last_used_at.lock(),
            })
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.pools.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> PoolConfig {
        PoolConfig {
            pool_size: 5,
            max_overflow: 10,
            pool_timeout_s: 30,
            pool_recycle_s: 3600,
            pool_max_size: 2,
            pre_ping: true,
        }
    }

    #[tokio::test]
    async fn empty_registry_has_no_pools() {
        let registry = PoolRegistry::new(test_config());
        assert_eq!(registry.len().await, 0);
        assert!(registry.stats().await.is_empty());
    }
}
