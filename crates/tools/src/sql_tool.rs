//! SQL Tool (C5).
//!
//! The seven-step pipeline from `spec.md` §4.5: trim/reject empty, resolve
//! the destination, validate in strict mode, sanitize the LIMIT, execute
//! and time it, map database errors to the stable catalogue, and always
//! emit a `ToolCallLog` + `SQLQueryLog` via the Telemetry Recorder.

use std::sync::OnceLock;
use std::time::Instant;

use dbmcp_domain::envelope::{ErrorCode, ToolEnvelope, ToolError};
use regex::Regex;

use crate::context::ToolContext;
use crate::params::resolve_connection_args;
use crate::validator;

pub struct SqlTool;

impl SqlTool {
    pub fn name(&self) -> &'static str {
        "execute_sql"
    }

    pub fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name(),
            "description": "Execute a validated, read-only SELECT against the current destination.",
            "parameters": {
                "type": "object",
                "properties": {
                    "sql": {"type": "string"},
                    "limit": {"type": "integer"},
                    "host": {"type": "string"},
                    "port": {"type": "integer"},
                    "user": {"type": "string"},
                    "password": {"type": "string"},
                    "database": {"type": "string"}
                },
                "required": ["sql"]
            }
        })
    }

    pub async fn invoke(&self, ctx: &ToolContext, args: &serde_json::Value) -> ToolEnvelope {
        let raw_sql = args.get("sql").and_then(|v| v.as_str()).unwrap_or("").trim().to_string();
        if raw_sql.is_empty() {
            return ToolEnvelope::error(ToolError::new(ErrorCode::InvalidParams, "sql must not be empty"));
        }

        let conn = match resolve_connection_args(ctx, args) {
            Some(c) => c,
            None => {
                return ToolEnvelope::error(ToolError::new(
                    ErrorCode::MissingRequiredParam,
                    "no destination connection available for this request",
                ))
            }
        };

        let validation = validator::validate(&raw_sql, true);
        if !validation.ok {
            let reason = validation.reason.unwrap_or_else(|| "rejected".to_string());
            self.record_failure(ctx, args, &raw_sql, &conn, 0, &reason).await;
            return ToolEnvelope::error(ToolError::new(ErrorCode::SqlValidationError, reason));
        }

        let limit = validator::sanitize_limit(args.get("limit").and_then(|v| v.as_u64()).map(|n| n as u32));
        let final_sql = inject_limit(&raw_sql, limit);

        let start = Instant::now();
        let result = ctx.pools.execute(&conn, &final_sql, &[]).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok((rows, columns)) => {
                let row_count = rows.len();
                self.record_success(ctx, args, &final_sql, &conn, duration_ms as i64, row_count as i64).await;
                ToolEnvelope::success(
                    rows.into_iter().map(serde_json::Value::Object).collect(),
                    columns,
                    format!("{row_count} row(s)"),
                )
                .with_execution_time(duration_ms)
            }
            Err(e) => {
                let lower = e.to_string().to_lowercase();
                let code = if lower.contains("timeout") {
                    ErrorCode::DbTimeout
                } else if lower.contains("connection") {
                    ErrorCode::DbConnectionError
                } else {
                    ErrorCode::DbQueryError
                };
                self.record_failure(ctx, args, &final_sql, &conn, duration_ms as i64, &e.to_string()).await;
                ToolEnvelope::error(ToolError::new(code, e.to_string()))
            }
        }
    }

    async fn record_success(&self, ctx: &ToolContext, args: &serde_json::Value, sql: &str, conn: &dbmcp_pool::ResolvedConnection, duration_ms: i64, rows: i64) {
        let request_id = ctx.request_id().unwrap_or_default();
        ctx.telemetry
            .record_tool_call(dbmcp_control::ToolCallRecord {
                request_id: &request_id,
                tool_name: self.name(),
                tool_class: dbmcp_control::ToolClass::Sql,
                parameters: sanitized_params(args),
                duration_ms,
                status: "success",
                result_summary: Some(format!("{rows} row(s)")),
                sql_text: Some(&truncate(sql, 2000)),
                execution_time_ms: Some(duration_ms),
                db_name: Some(&conn.database),
            })
            .await;
        ctx.telemetry
            .record_sql_query(&request_id, sql, &query_type(sql), &tables_accessed(sql), duration_ms, rows, "success")
            .await;
    }

    async fn record_failure(&self, ctx: &ToolContext, args: &serde_json::Value, sql: &str, conn: &dbmcp_pool::ResolvedConnection, duration_ms: i64, message: &str) {
        let request_id = ctx.request_id().unwrap_or_default();
        ctx.telemetry
            .record_tool_call(dbmcp_control::ToolCallRecord {
                request_id: &request_id,
                tool_name: self.name(),
                tool_class: dbmcp_control::ToolClass::Sql,
                parameters: sanitized_params(args),
                duration_ms,
                status: "error",
                result_summary: Some(message.to_string()),
                sql_text: Some(&truncate(sql, 2000)),
                execution_time_ms: Some(duration_ms),
                db_name: Some(&conn.database),
            })
            .await;
        ctx.telemetry
            .record_sql_query(&request_id, sql, &query_type(sql), &tables_accessed(sql), duration_ms, 0, "error")
            .await;
    }
}

fn sanitized_params(args: &serde_json::Value) -> serde_json::Value {
    let mut v = args.clone();
    if let Some(obj) = v.as_object_mut() {
        obj.remove("password");
    }
    v
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

fn limit_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bLIMIT\s+\d+").unwrap())
}

/// Append `LIMIT <n>` unless the statement already contains one
/// (invariant 8: idempotent with respect to an existing LIMIT).
fn inject_limit(sql: &str, limit: u32) -> String {
    if limit_regex().is_match(sql) {
        sql.to_string()
    } else {
        format!("{} LIMIT {}", sql.trim_end_matches(';').trim_end(), limit)
    }
}

fn from_join_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(?:FROM|JOIN)\s+`?([a-zA-Z_][a-zA-Z0-9_]*)`?").unwrap())
}

/// Heuristic table extraction: identifiers following `FROM`/`JOIN`.
fn tables_accessed(sql: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut tables = Vec::new();
    for cap in from_join_regex().captures_iter(sql) {
        let name = cap[1].to_string();
        if seen.insert(name.clone()) {
            tables.push(name);
        }
    }
    tables
}

/// Heuristic query-type classification (`spec.md` §3, §4.5).
fn query_type(sql: &str) -> &'static str {
    let upper = sql.to_uppercase();
    let join_count = upper.matches(" JOIN ").count();
    let has_group_by = upper.contains(" GROUP BY ");
    let nested_select = upper.matches("SELECT").count() > 1;

    if nested_select {
        "subquery"
    } else if has_group_by {
        "aggregation"
    } else if join_count > 0 {
        "join"
    } else {
        "simple"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inject_limit_appends_when_absent() {
        assert_eq!(inject_limit("SELECT * FROM orders", 50), "SELECT * FROM orders LIMIT 50");
    }

    #[test]
    fn inject_limit_is_idempotent_when_present() {
        let sql = "SELECT * FROM orders LIMIT 10";
        assert_eq!(inject_limit(sql, 50), sql);
    }

    #[test]
    fn tables_accessed_from_from_and_join() {
        let sql = "SELECT * FROM orders o JOIN customers c ON o.customer_id = c.id";
        assert_eq!(tables_accessed(sql), vec!["orders".to_string(), "customers".to_string()]);
    }

    #[test]
    fn query_type_classification() {
        assert_eq!(query_type("SELECT * FROM t"), "simple");
        assert_eq!(query_type("SELECT * FROM a JOIN b ON a.id=b.id"), "join");
        assert_eq!(query_type("SELECT a, COUNT(*) FROM t GROUP BY a"), "aggregation");
        assert_eq!(query_type("SELECT * FROM (SELECT 1) t"), "subquery");
    }
}
