//! Control-DB schema (C11).
//!
//! SQLite-backed (one durable file — this is operational metadata, not a
//! tenant analytics destination). `migrate` is idempotent: every statement
//! uses `CREATE TABLE IF NOT EXISTS` / `CREATE INDEX IF NOT EXISTS` so it can
//! run on every startup.

use dbmcp_domain::error::{Error, Result};
use sqlx::SqlitePool;

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS db_mapping (
        name        TEXT PRIMARY KEY,
        host        TEXT NOT NULL,
        port        INTEGER NOT NULL,
        username    TEXT NOT NULL,
        password    TEXT NOT NULL,
        database    TEXT NOT NULL,
        db_type     TEXT NOT NULL DEFAULT 'mysql',
        active      INTEGER NOT NULL DEFAULT 1,
        created_at  TEXT NOT NULL,
        updated_at  TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_session_log (
        session_id      TEXT PRIMARY KEY,
        client_ip       TEXT NOT NULL,
        user_agent      TEXT,
        primary_db      TEXT NOT NULL,
        databases_used  TEXT NOT NULL DEFAULT '[]',
        request_count   INTEGER NOT NULL DEFAULT 0,
        success_count   INTEGER NOT NULL DEFAULT 0,
        error_count     INTEGER NOT NULL DEFAULT 0,
        start_time      TEXT NOT NULL,
        last_activity   TEXT NOT NULL,
        end_time        TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS agent_execution_log (
        request_id      TEXT PRIMARY KEY,
        session_id      TEXT NOT NULL,
        db_name         TEXT NOT NULL,
        user_query      TEXT NOT NULL,
        status          TEXT NOT NULL,
        duration_ms     INTEGER NOT NULL,
        plan_steps      INTEGER NOT NULL,
        executed_steps  INTEGER NOT NULL,
        iterations      INTEGER NOT NULL,
        tool_names      TEXT NOT NULL DEFAULT '[]',
        tool_counts     TEXT NOT NULL DEFAULT '{}',
        response_length INTEGER NOT NULL DEFAULT 0,
        has_data        INTEGER NOT NULL DEFAULT 0,
        created_at      TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tool_call_log (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        request_id      TEXT NOT NULL,
        tool_name       TEXT NOT NULL,
        tool_class      TEXT NOT NULL,
        parameters      TEXT NOT NULL DEFAULT '{}',
        duration_ms     INTEGER NOT NULL,
        status          TEXT NOT NULL,
        result_summary  TEXT,
        sql_text        TEXT,
        execution_time_ms INTEGER,
        db_name         TEXT,
        created_at      TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sql_query_log (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        request_id      TEXT NOT NULL,
        query_hash      TEXT NOT NULL,
        query_type      TEXT NOT NULL,
        tables_accessed TEXT NOT NULL DEFAULT '[]',
        execution_time_ms INTEGER NOT NULL,
        rows_returned   INTEGER NOT NULL,
        status          TEXT NOT NULL,
        created_at      TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS error_log (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        request_id      TEXT,
        session_id      TEXT,
        error_code      INTEGER NOT NULL,
        error_type      TEXT NOT NULL,
        message         TEXT NOT NULL,
        component       TEXT NOT NULL,
        function_name   TEXT NOT NULL,
        created_at      TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS knowledge_graph_log (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        request_id      TEXT NOT NULL,
        query           TEXT NOT NULL,
        mode            TEXT NOT NULL,
        top_k           INTEGER NOT NULL,
        response_chars  INTEGER NOT NULL,
        duration_ms     INTEGER NOT NULL,
        status          TEXT NOT NULL,
        created_at      TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_aelog_session_id ON agent_execution_log(session_id)",
    "CREATE INDEX IF NOT EXISTS idx_aelog_created_at ON agent_execution_log(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_aelog_status ON agent_execution_log(status)",
    "CREATE INDEX IF NOT EXISTS idx_tcl_request_id ON tool_call_log(request_id)",
    "CREATE INDEX IF NOT EXISTS idx_tcl_tool_name ON tool_call_log(tool_name)",
    "CREATE INDEX IF NOT EXISTS idx_sql_request_id ON sql_query_log(request_id)",
    "CREATE INDEX IF NOT EXISTS idx_sql_created_at ON sql_query_log(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_err_request_id ON error_log(request_id)",
    "CREATE INDEX IF NOT EXISTS idx_err_session_id ON error_log(session_id)",
    "CREATE INDEX IF NOT EXISTS idx_err_created_at ON error_log(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_kgl_request_id ON knowledge_graph_log(request_id)",
];

pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    for stmt in STATEMENTS {
        sqlx::query(stmt)
            .execute(pool)
            .await
            .map_err(|e| Error::Db(format!("control-db migration failed: {e}")))?;
    }
    Ok(())
}
