//! Telemetry Recorder (C7).
//!
//! Writes `UserSessionLog`, `AgentExecutionLog`, `ToolCallLog`,
//! `SqlQueryLog`, `ErrorLog`, and `KnowledgeGraphLog` rows. Every write
//! failure is logged and swallowed here — telemetry must never alter or
//! fail the user-visible answer (`spec.md` §7, §9).

use chrono::Utc;
use dbmcp_domain::config::TelemetryConfig;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;

pub struct TelemetryRecorder {
    pool: SqlitePool,
    config: TelemetryConfig,
}

/// One tool invocation to be logged via [`TelemetryRecorder::record_tool_call`].
pub struct ToolCallRecord<'a> {
    pub request_id: &'a str,
    pub tool_name: &'a str,
    pub tool_class: ToolClass,
    pub parameters: serde_json::Value,
    pub duration_ms: i64,
    pub status: &'a str,
    pub result_summary: Option<String>,
    pub sql_text: Option<&'a str>,
    pub execution_time_ms: Option<i64>,
    pub db_name: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolClass {
    Sql,
    Schema,
    Knowledge,
}

impl ToolClass {
    fn as_str(self) -> &'static str {
        match self {
            ToolClass::Sql => "sql",
            ToolClass::Schema => "schema",
            ToolClass::Knowledge => "knowledge",
        }
    }
}

/// Outcome fields for [`TelemetryRecorder::record_agent_execution`].
pub struct AgentExecutionRecord<'a> {
    pub request_id: &'a str,
    pub session_id: &'a str,
    pub db_name: &'a str,
    pub user_query: &'a str,
    pub status: &'a str,
    pub duration_ms: i64,
    pub plan_steps: i64,
    pub executed_steps: i64,
    pub iterations: i64,
    pub tool_names: Vec<String>,
    pub tool_counts: serde_json::Value,
    pub response_length: i64,
    pub has_data: bool,
}

impl TelemetryRecorder {
    pub fn new(pool: SqlitePool, config: TelemetryConfig) -> Self {
        Self { pool, config }
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    fn truncate_summary(&self, text: &str) -> String {
        if text.len() <= self.config.result_summary_chars {
            text.to_string()
        } else {
            text.chars().take(self.config.result_summary_chars).collect()
        }
    }

    // ── Session lifecycle ───────────────────────────────────────────

    pub async fn open_session(&self, session_id: &str, client_ip: &str, user_agent: Option<&str>, primary_db: &str) {
        if !self.enabled() {
            return;
        }
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT OR IGNORE INTO user_session_log \
             (session_id, client_ip, user_agent, primary_db, databases_used, request_count, success_count, error_count, start_time, last_activity) \
             VALUES (?, ?, ?, ?, ?, 0, 0, 0, ?, ?)",
        )
        .bind(session_id)
        .bind(client_ip)
        .bind(user_agent)
        .bind(primary_db)
        .bind(serde_json::json!([primary_db]).to_string())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::warn!(error = %e, session_id, "telemetry: failed to open session");
        }
    }

    pub async fn close_session(&self, session_id: &str) {
        if !self.enabled() {
            return;
        }
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query("UPDATE user_session_log SET end_time = ? WHERE session_id = ?")
            .bind(&now)
            .bind(session_id)
            .execute(&self.pool)
            .await;

        if let Err(e) = result {
            tracing::warn!(error = %e, session_id, "telemetry: failed to close session");
        }
    }

    pub async fn record_session_activity(&self, session_id: &str, db_name: &str, success: bool) {
        if !self.enabled() {
            return;
        }
        let now = Utc::now().to_rfc3339();
        let success_inc = if success { 1 } else { 0 };
        let error_inc = if success { 0 } else { 1 };

        let result = sqlx::query(
            "UPDATE user_session_log SET \
             request_count = request_count + 1, \
             success_count = success_count + ?, \
             error_count = error_count + ?, \
             last_activity = ? \
             WHERE session_id = ?",
        )
        .bind(success_inc)
        .bind(error_inc)
        .bind(&now)
        .bind(session_id)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::warn!(error = %e, session_id, db_name, "telemetry: failed to record session activity");
        }
    }

    // ── Per-request records ─────────────────────────────────────────

    pub async fn record_agent_execution(&self, rec: AgentExecutionRecord<'_>) {
        if !self.enabled() {
            return;
        }
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO agent_execution_log \
             (request_id, session_id, db_name, user_query, status, duration_ms, plan_steps, \
              executed_steps, iterations, tool_names, tool_counts, response_length, has_data, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(rec.request_id)
        .bind(rec.session_id)
        .bind(rec.db_name)
        .bind(rec.user_query)
        .bind(rec.status)
        .bind(rec.duration_ms)
        .bind(rec.plan_steps)
        .bind(rec.executed_steps)
        .bind(rec.iterations)
        .bind(serde_json::to_string(&rec.tool_names).unwrap_or_default())
        .bind(rec.tool_counts.to_string())
        .bind(rec.response_length)
        .bind(rec.has_data as i64)
        .bind(&now)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::warn!(error = %e, request_id = rec.request_id, "telemetry: failed to record agent execution");
        }
    }

    pub async fn record_tool_call(&self, rec: ToolCallRecord<'_>) {
        if !self.enabled() {
            return;
        }
        let now = Utc::now().to_rfc3339();
        let summary = rec.result_summary.as_deref().map(|s| self.truncate_summary(s));

        let result = sqlx::query(
            "INSERT INTO tool_call_log \
             (request_id, tool_name, tool_class, parameters, duration_ms, status, result_summary, \
              sql_text, execution_time_ms, db_name, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(rec.request_id)
        .bind(rec.tool_name)
        .bind(rec.tool_class.as_str())
        .bind(rec.parameters.to_string())
        .bind(rec.duration_ms)
        .bind(rec.status)
        .bind(summary)
        .bind(rec.sql_text)
        .bind(rec.execution_time_ms)
        .bind(rec.db_name)
        .bind(&now)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::warn!(error = %e, request_id = rec.request_id, tool = rec.tool_name, "telemetry: failed to record tool call");
        }
    }

    pub async fn record_sql_query(
        &self,
        request_id: &str,
        sql_text: &str,
        query_type: &str,
        tables_accessed: &[String],
        execution_time_ms: i64,
        rows_returned: i64,
        status: &str,
    ) {
        if !self.enabled() {
            return;
        }
        let now = Utc::now().to_rfc3339();
        let hash = hex::encode(Sha256::digest(sql_text.as_bytes()));

        let result = sqlx::query(
            "INSERT INTO sql_query_log \
             (request_id, query_hash, query_type, tables_accessed, execution_time_ms, rows_returned, status, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(request_id)
        .bind(hash)
        .bind(query_type)
        .bind(serde_json::to_string(tables_accessed).unwrap_or_default())
        .bind(execution_time_ms)
        .bind(rows_returned)
        .bind(status)
        .bind(&now)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::warn!(error = %e, request_id, "telemetry: failed to record sql query");
        }
    }

    pub async fn record_error(
        &self,
        request_id: Option<&str>,
        session_id: Option<&str>,
        error_code: i32,
        error_type: &str,
        message: &str,
        component: &str,
        function_name: &str,
    ) {
        if !self.enabled() {
            return;
        }
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO error_log \
             (request_id, session_id, error_code, error_type, message, component, function_name, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(request_id)
        .bind(session_id)
        .bind(error_code)
        .bind(error_type)
        .bind(message)
        .bind(component)
        .bind(function_name)
        .bind(&now)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::warn!(error = %e, component, "telemetry: failed to record error (swallowed)");
        }
    }

    pub async fn record_knowledge_query(
        &self,
        request_id: &str,
        query: &str,
        mode: &str,
        top_k: i64,
        response_chars: i64,
        duration_ms: i64,
        status: &str,
    ) {
        if !self.enabled() {
            return;
        }
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO knowledge_graph_log \
             (request_id, query, mode, top_k, response_chars, duration_ms, status, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(request_id)
        .bind(query)
        .bind(mode)
        .bind(top_k)
        .bind(response_chars)
        .bind(duration_ms)
        .bind(status)
        .bind(&now)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::warn!(error = %e, request_id, "telemetry: failed to record knowledge query");
        }
    }

    /// Count of `tool_call_log` rows for a request — used by invariant 7
    /// (`AgentExecutionLog.tool_call_count == COUNT(ToolCallLog)`).
    pub async fn tool_call_count(&self, request_id: &str) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tool_call_log WHERE request_id = ?")
            .bind(request_id)
            .fetch_one(&self.pool)
            .await
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::schema::migrate(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn disabled_recorder_never_touches_the_db() {
        let recorder = TelemetryRecorder::new(pool().await, TelemetryConfig { enabled: false, result_summary_chars: 500 });
        recorder.open_session("s1", "127.0.0.1", None, "sales_prod").await;
        assert_eq!(recorder.tool_call_count("r1").await, 0);
    }

    #[tokio::test]
    async fn tool_call_count_matches_written_rows() {
        let recorder = TelemetryRecorder::new(pool().await, TelemetryConfig { enabled: true, result_summary_chars: 500 });
        recorder
            .record_tool_call(ToolCallRecord {
                request_id: "r1",
                tool_name: "execute_sql",
                tool_class: ToolClass::Sql,
                parameters: serde_json::json!({"sql": "SELECT 1"}),
                duration_ms: 12,
                status: "success",
                result_summary: Some("1 row".into()),
                sql_text: Some("SELECT 1"),
                execution_time_ms: Some(12),
                db_name: Some("sales_prod"),
            })
            .await;
        recorder
            .record_tool_call(ToolCallRecord {
                request_id: "r1",
                tool_name: "get_table_schema",
                tool_class: ToolClass::Schema,
                parameters: serde_json::json!({"table": "orders"}),
                duration_ms: 5,
                status: "success",
                result_summary: None,
                sql_text: None,
                execution_time_ms: None,
                db_name: Some("sales_prod"),
            })
            .await;

        assert_eq!(recorder.tool_call_count("r1").await, 2);
    }

    #[tokio::test]
    async fn truncate_summary_respects_configured_length() {
        let recorder = TelemetryRecorder::new(pool().await, TelemetryConfig { enabled: true, result_summary_chars: 5 });
        assert_eq!(recorder.truncate_summary("abcdefgh"), "abcde");
        assert_eq!(recorder.truncate_summary("ab"), "ab");
    }

    #[tokio::test]
    async fn errors_survive_missing_control_db() {
        // A closed pool simulates "control DB unavailable mid-request":
        // every recorder call must return without panicking.
        let p = pool().await;
        p.close().await;
        let recorder = TelemetryRecorder::new(p, TelemetryConfig { enabled: true, result_summary_chars: 500 });
        recorder.open_session("s1", "127.0.0.1", None, "sales_prod").await;
        recorder
            .record_error(Some("r1"), Some("s1"), 3000, "DbConnectionError", "boom", "pool", "get_engine")
            .await;
    }
}
