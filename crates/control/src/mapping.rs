//! Mapping Store (C3).
//!
//! Cache-first: `loadAll` seeds the cache from the control DB at startup;
//! `get` is cache-only on hit and read-through on miss; `refresh` atomically
//! swaps in a freshly loaded map so a concurrent `get` never observes a
//! partially-populated cache (invariant 10).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dbmcp_domain::error::{Error, Result};
use dbmcp_domain::trace::TraceEvent;
use dbmcp_pool::ResolvedConnection;
use parking_lot::RwLock;
use sqlx::{Row, SqlitePool};

/// A destination record (`DBMapping`, `spec.md` §3).
#[derive(Debug, Clone)]
pub struct DbMapping {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub db_type: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbMapping {
    pub fn resolved_connection(&self) -> ResolvedConnection {
        ResolvedConnection {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            password: self.password.clone(),
            database: self.database.clone(),
        }
    }
}

/// Cache of active `DBMapping` records, read-through from the control DB.
pub struct MappingStore {
    pool: SqlitePool,
    cache: RwLock<Arc<HashMap<String, DbMapping>>>,
}

impl MappingStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            cache: RwLock::new(Arc::new(HashMap::new())),
        }
    }

    /// Seed the cache from the control DB. Call once at startup.
    pub async fn load_all(&self) -> Result<usize> {
        let loaded = self.load_active_map().await?;
        let count = loaded.len();
        *self.cache.write() = Arc::new(loaded);
        TraceEvent::MappingCacheReloaded { count }.emit();
        Ok(count)
    }

    /// Cache-first lookup. On a cache miss, reads through to the control DB
    /// and inserts the result if active; otherwise returns `None`.
    pub async fn get(&self, name: &str) -> Result<Option<DbMapping>> {
        if let Some(hit) = self.cache.read().get(name).cloned() {
            return Ok(Some(hit));
        }

        let row = sqlx::query(
            "SELECT name, host, port, username, password, database, db_type, active, created_at, updated_at \
             FROM db_mapping WHERE name = ? AND active = 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Db(e.to_string()))?;

        let Some(row) = row else { return Ok(None) };
        let mapping = row_to_mapping(&row)?;

        let mut cache = self.cache.write();
        let mut next = (**cache).clone();
        next.insert(mapping.name.clone(), mapping.clone());
        *cache = Arc::new(next);

        Ok(Some(mapping))
    }

    /// Reset the service and reload the cache from scratch.
    ///
    /// Builds the new map before swapping the `Arc`, so a concurrent `get`
    /// sees either the old, fully-populated map or the new one — never a
    /// partial one (invariant 10).
    pub async fn refresh(&self) -> Result<usize> {
        let loaded = self.load_active_map().await?;
        let count = loaded.len();
        *self.cache.write() = Arc::new(loaded);
        TraceEvent::MappingCacheReloaded { count }.emit();
        Ok(count)
    }

    /// All currently cached destination names.
    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.cache.read().keys().cloned().collect();
        names.sort();
        names
    }

    async fn load_active_map(&self) -> Result<HashMap<String, DbMapping>> {
        let rows = sqlx::query(
            "SELECT name, host, port, username, password, database, db_type, active, created_at, updated_at \
             FROM db_mapping WHERE active = 1",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Db(e.to_string()))?;

        let mut map = HashMap::with_capacity(rows.len());
        for row in &rows {
            let mapping = row_to_mapping(row)?;
            map.insert(mapping.name.clone(), mapping);
        }
        Ok(map)
    }
}

fn row_to_mapping(row: &sqlx::sqlite::SqliteRow) -> Result<DbMapping> {
    let created_raw: String = row.try_get("created_at").map_err(|e| Error::Db(e.to_string()))?;
    let updated_raw: String = row.try_get("updated_at").map_err(|e| Error::Db(e.to_string()))?;

    Ok(DbMapping {
        name: row.try_get("name").map_err(|e| Error::Db(e.to_string()))?,
        host: row.try_get("host").map_err(|e| Error::Db(e.to_string()))?,
        port: row.try_get::<i64, _>("port").map_err(|e| Error::Db(e.to_string()))? as u16,
        username: row.try_get("username").map_err(|e| Error::Db(e.to_string()))?,
        password: row.try_get("password").map_err(|e| Error::Db(e.to_string()))?,
        database: row.try_get("database").map_err(|e| Error::Db(e.to_string()))?,
        db_type: row.try_get("db_type").map_err(|e| Error::Db(e.to_string()))?,
        active: row.try_get::<i64, _>("active").map_err(|e| Error::Db(e.to_string()))? != 0,
        created_at: parse_ts(&created_raw)?,
        updated_at: parse_ts(&updated_raw)?,
    })
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Db(format!("invalid timestamp '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn seeded_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::schema::migrate(&pool).await.unwrap();
        sqlx::query(
            "INSERT INTO db_mapping (name, host, port, username, password, database, db_type, active, created_at, updated_at) \
             VALUES ('sales_prod', 'db.internal', 3306, 'svc', 'secret', 'sales', 'mysql', 1, '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO db_mapping (name, host, port, username, password, database, db_type, active, created_at, updated_at) \
             VALUES ('retired', 'old.internal', 3306, 'svc', 'secret', 'archive', 'mysql', 0, '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .unwrap();
        pool
    }

    #[tokio::test]
    async fn load_all_only_seeds_active_destinations() {
        let store = MappingStore::new(seeded_pool().await);
        let count = store.load_all().await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(store.list_names(), vec!["sales_prod".to_string()]);
    }

    #[tokio::test]
    async fn get_is_cache_first_then_read_through() {
        let store = MappingStore::new(seeded_pool().await);
        let hit = store.get("sales_prod").await.unwrap();
        assert!(hit.is_some());
        assert_eq!(hit.unwrap().host, "db.internal");
    }

    #[tokio::test]
    async fn get_inactive_destination_returns_none() {
        let store = MappingStore::new(seeded_pool().await);
        assert!(store.get("retired").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_unknown_destination_returns_none() {
        let store = MappingStore::new(seeded_pool().await);
        assert!(store.get("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn refresh_reloads_the_cache() {
        let pool = seeded_pool().await;
        let store = MappingStore::new(pool.clone());
        store.load_all().await.unwrap();

        sqlx::query(
            "INSERT INTO db_mapping (name, host, port, username, password, database, db_type, active, created_at, updated_at) \
             VALUES ('new_db', 'new.internal', 3306, 'svc', 'secret', 'new', 'mysql', 1, '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let count = store.refresh().await.unwrap();
        assert_eq!(count, 2);
    }
}
