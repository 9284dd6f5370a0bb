use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Control database (DB_host / DB_port / DB_username / DB_password / DB_name)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Stores `db_mapping`, `user_session_log`, `agent_execution_log`,
// `tool_call_log`, `sql_query_log`, `error_log`, `knowledge_graph_log`
// (spec.md §6). SQLite-backed via sqlx, a single durable file, since this
// is operational metadata rather than a tenant analytics destination.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlDbConfig {
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default = "d_port")]
    pub port: u16,
    #[serde(default = "d_username")]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "d_name")]
    pub name: String,
    /// Path to the sqlite database file backing the control DB.
    #[serde(default = "d_sqlite_path")]
    pub sqlite_path: String,
}

impl Default for ControlDbConfig {
    fn default() -> Self {
        Self {
            host: d_host(),
            port: d_port(),
            username: d_username(),
            password: String::new(),
            name: d_name(),
            sqlite_path: d_sqlite_path(),
        }
    }
}

fn d_host() -> String {
    "127.0.0.1".into()
}
fn d_port() -> u16 {
    3306
}
fn d_username() -> String {
    "dbmcp".into()
}
fn d_name() -> String {
    "dbmcp_control".into()
}
fn d_sqlite_path() -> String {
    "dbmcp_control.db".into()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Destination connection pool (DB_POOL_SIZE / DB_MAX_OVERFLOW / ...)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PoolConfig {
    #[serde(default = "d_pool_size")]
    pub pool_size: u32,
    #[serde(default = "d_max_overflow")]
    pub max_overflow: u32,
    #[serde(default = "d_pool_timeout")]
    pub pool_timeout_s: u64,
    #[serde(default = "d_pool_recycle")]
    pub pool_recycle_s: u64,
    /// `DB_POOL_MAX_SIZE` — the Async Pool Registry (C2) LRU cap. The
    /// number of distinct *destinations* cached concurrently, not the
    /// per-engine connection count (that's `pool_size + max_overflow`).
    #[serde(default = "d_pool_max_size")]
    pub pool_max_size: usize,
    #[serde(default = "d_true")]
    pub pre_ping: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            pool_size: d_pool_size(),
            max_overflow: d_max_overflow(),
            pool_timeout_s: d_pool_timeout(),
            pool_recycle_s: d_pool_recycle(),
            pool_max_size: d_pool_max_size(),
            pre_ping: true,
        }
    }
}

fn d_pool_size() -> u32 {
    5
}
fn d_max_overflow() -> u32 {
    10
}
fn d_pool_timeout() -> u64 {
    30
}
fn d_pool_recycle() -> u64 {
    3600
}
fn d_pool_max_size() -> usize {
    20
}
fn d_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_execute_sql_tool_conventions() {
        let cfg = PoolConfig::default();
        assert_eq!(cfg.pool_size, 5);
        assert_eq!(cfg.max_overflow, 10);
        assert_eq!(cfg.pool_recycle_s, 3600);
        assert!(cfg.pre_ping);
    }

    #[test]
    fn pool_max_size_is_the_lru_cap() {
        assert_eq!(PoolConfig::default().pool_max_size, 20);
    }
}
