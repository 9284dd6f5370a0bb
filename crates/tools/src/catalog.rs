//! Catalog Tool (C4).
//!
//! Reads `information_schema` through the Async Pool Registry (C2) and
//! renders either an all-tables summary or a single table's column/index
//! detail as human-readable text (`spec.md` §4.4).

use std::time::Instant;

use dbmcp_domain::envelope::{ErrorCode, ToolEnvelope, ToolError};
use dbmcp_pool::ResolvedConnection;

use crate::context::ToolContext;
use crate::params::resolve_connection_args;

const MAX_SUGGESTIONS: usize = 10;

pub struct CatalogTool;

impl CatalogTool {
    pub fn name(&self) -> &'static str {
        "get_table_schema"
    }

    pub fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name(),
            "description": "Return schema text for one table, or a summary of all tables in the current destination.",
            "parameters": {
                "type": "object",
                "properties": {
                    "table_name": {"type": "string", "description": "Table to describe; omit for a summary of all tables."},
                    "host": {"type": "string"},
                    "port": {"type": "integer"},
                    "user": {"type": "string"},
                    "password": {"type": "string"},
                    "database": {"type": "string"}
                }
            }
        })
    }

    pub async fn invoke(&self, ctx: &ToolContext, args: &serde_json::Value) -> ToolEnvelope {
        let table_name = args.get("table_name").and_then(|v| v.as_str()).unwrap_or("").trim().to_string();

        let conn = match resolve_connection_args(ctx, args) {
            Some(c) => c,
            None => {
                return ToolEnvelope::error(ToolError::new(
                    ErrorCode::MissingRequiredParam,
                    "no destination connection available for this request",
                ))
            }
        };

        let start = Instant::now();
        let result = if table_name.is_empty() {
            self.summarize_all(ctx, &conn).await
        } else {
            self.describe_one(ctx, &conn, &table_name).await
        };

        let duration_ms = start.elapsed().as_millis() as i64;
        let (status, summary) = match &result {
            Ok(text) => ("success", Some(text.chars().take(200).collect::<String>())),
            Err(e) => ("error", Some(e.message.clone())),
        };
        ctx.telemetry
            .record_tool_call(dbmcp_control::ToolCallRecord {
                request_id: ctx.request_id().as_deref().unwrap_or(""),
                tool_name: self.name(),
                tool_class: dbmcp_control::ToolClass::Schema,
                parameters: sanitized_params(args),
                duration_ms,
                status,
                result_summary: summary,
                sql_text: None,
                execution_time_ms: Some(duration_ms),
                db_name: Some(&conn.database),
            })
            .await;

        match result {
            Ok(text) => ToolEnvelope::success_text(text),
            Err(err) => ToolEnvelope::error(err),
        }
    }

    async fn summarize_all(&self, ctx: &ToolContext, conn: &ResolvedConnection) -> Result<String, ToolError> {
        let sql = "SELECT TABLE_NAME, TABLE_COMMENT, ENGINE, TABLE_ROWS \
                   FROM information_schema.TABLES \
                   WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE' \
                   ORDER BY TABLE_NAME";
        let (rows, _) = ctx
            .pools
            .execute(conn, sql, &[conn.database.clone()])
            .await
            .map_err(map_db_error)?;

        if rows.is_empty() {
            return Ok(format!("No base tables found in database '{}'.", conn.database));
        }

        let mut out = format!("Tables in '{}':\n", conn.database);
        for row in &rows {
            let name = row.get("TABLE_NAME").and_then(|v| v.as_str()).unwrap_or("?");
            let comment = row.get("TABLE_COMMENT").and_then(|v| v.as_str()).unwrap_or("");
            let engine = row.get("ENGINE").and_then(|v| v.as_str()).unwrap_or("?");
            let table_rows = row.get("TABLE_ROWS").map(|v| v.to_string()).unwrap_or_else(|| "?".into());
            if comment.is_empty() {
                out.push_str(&format!("- {name} ({engine}, ~{table_rows} rows)\n"));
            } else {
                out.push_str(&format!("- {name}: {comment} ({engine}, ~{table_rows} rows)\n"));
            }
        }
        Ok(out)
    }

    async fn describe_one(&self, ctx: &ToolContext, conn: &ResolvedConnection, table_name: &str) -> Result<String, ToolError> {
        let (all_tables, _) = ctx
            .pools
            .execute(
                conn,
                "SELECT TABLE_NAME FROM information_schema.TABLES WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE'",
                &[conn.database.clone()],
            )
            .await
            .map_err(map_db_error)?;

        let names: Vec<String> = all_tables
            .iter()
            .filter_map(|r| r.get("TABLE_NAME").and_then(|v| v.as_str()).map(|s| s.to_string()))
            .collect();

        let exact = names.iter().find(|n| n.eq_ignore_ascii_case(table_name)).cloned();
        let Some(exact) = exact else {
            let fragment = table_name.to_lowercase();
            let suggestions: Vec<&String> = names
                .iter()
                .filter(|n| n.to_lowercase().contains(&fragment))
                .take(MAX_SUGGESTIONS)
                .collect();
            return if suggestions.is_empty() {
                Ok(format!("Table '{table_name}' not found and no similar names exist in '{}'.", conn.database))
            } else {
                let list = suggestions.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ");
                Ok(format!("Table '{table_name}' not found. Did you mean: {list}?"))
            };
        };

        let (columns, _) = ctx
            .pools
            .execute(
                conn,
                "SELECT COLUMN_NAME, COLUMN_TYPE, IS_NULLABLE, COLUMN_DEFAULT, COLUMN_COMMENT, EXTRA, ORDINAL_POSITION \
                 FROM information_schema.COLUMNS WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? ORDER BY ORDINAL_POSITION",
                &[conn.database.clone(), exact.clone()],
            )
            .await
            .map_err(map_db_error)?;

        let (indexes, _) = ctx
            .pools
            .execute(
                conn,
                "SELECT COLUMN_NAME FROM information_schema.STATISTICS \
                 WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND INDEX_NAME = 'PRIMARY'",
                &[conn.database.clone(), exact.clone()],
            )
            .await
            .map_err(map_db_error)?;

        let primary: std::collections::HashSet<String> = indexes
            .iter()
            .filter_map(|r| r.get("COLUMN_NAME").and_then(|v| v.as_str()).map(|s| s.to_string()))
            .collect();

        let mut out = format!("Table: {exact}\n");
        for col in &columns {
            let name = col.get("COLUMN_NAME").and_then(|v| v.as_str()).unwrap_or("?");
            let ty = col.get("COLUMN_TYPE").and_then(|v| v.as_str()).unwrap_or("?");
            let nullable = col.get("IS_NULLABLE").and_then(|v| v.as_str()).unwrap_or("YES");
            let extra = col.get("EXTRA").and_then(|v| v.as_str()).unwrap_or("");
            let comment = col.get("COLUMN_COMMENT").and_then(|v| v.as_str()).unwrap_or("");

            let mut marks = Vec::new();
            if primary.contains(name) {
                marks.push("主键");
            }
            if nullable == "NO" {
                marks.push("非空");
            }
            if !extra.is_empty() {
                marks.push(extra);
            }
            let mark_str = if marks.is_empty() { String::new() } else { format!(" [{}]", marks.join(", ")) };
            if comment.is_empty() {
                out.push_str(&format!("  {name} {ty}{mark_str}\n"));
            } else {
                out.push_str(&format!("  {name} {ty}{mark_str} -- {comment}\n"));
            }
        }
        out.push_str(&format!("{} columns\n", columns.len()));
        Ok(out)
    }
}

fn map_db_error(e: dbmcp_domain::error::Error) -> ToolError {
    ToolError::from(e)
}

fn sanitized_params(args: &serde_json::Value) -> serde_json::Value {
    let mut v = args.clone();
    if let Some(obj) = v.as_object_mut() {
        obj.remove("password");
    }
    v
}
