//! Knowledge Tool (C6).
//!
//! A single external call: POST `{query, mode, top_k}` to the configured
//! retrieval endpoint, bearer-authed if a key is present (`spec.md` §4.6).

use std::time::{Duration, Instant};

use dbmcp_domain::config::KnowledgeConfig;
use dbmcp_domain::envelope::{ErrorCode, ToolEnvelope, ToolError};
use serde::Deserialize;

use crate::context::ToolContext;

pub struct KnowledgeTool {
    config: KnowledgeConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct KnowledgeResponse {
    response: Option<serde_json::Value>,
    result: Option<serde_json::Value>,
}

impl KnowledgeTool {
    pub fn new(config: KnowledgeConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_s))
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    pub fn name(&self) -> &'static str {
        "query_knowledge_graph"
    }

    pub fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name(),
            "description": "Query the semantic knowledge-graph retrieval service for a natural-language answer.",
            "parameters": {
                "type": "object",
                "properties": {
                    "query": {"type": "string"},
                    "mode": {"type": "string"},
                    "top_k": {"type": "integer"}
                },
                "required": ["query"]
            }
        })
    }

    pub async fn invoke(&self, ctx: &ToolContext, args: &serde_json::Value) -> ToolEnvelope {
        let query = args.get("query").and_then(|v| v.as_str()).unwrap_or("").trim().to_string();
        if query.is_empty() {
            return ToolEnvelope::error(ToolError::new(ErrorCode::InvalidParams, "query must not be empty"));
        }
        let mode = args
            .get("mode")
            .and_then(|v| v.as_str())
            .unwrap_or(&self.config.default_mode)
            .to_string();
        let top_k = args.get("top_k").and_then(|v| v.as_u64()).unwrap_or(self.config.default_top_k as u64) as u32;

        let Some(api_url) = &self.config.api_url else {
            return ToolEnvelope::error(ToolError::new(ErrorCode::MissingDbConfig, "knowledge retrieval endpoint is not configured"));
        };

        let start = Instant::now();
        let mut request = self.client.post(api_url).json(&serde_json::json!({
            "query": query,
            "mode": mode,
            "top_k": top_k,
        }));
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let outcome = request.send().await;
        let duration_ms = start.elapsed().as_millis() as i64;

        let result = match outcome {
            Ok(resp) if resp.status().is_success() => match resp.json::<KnowledgeResponse>().await {
                Ok(body) => {
                    let text = body
                        .response
                        .or(body.result)
                        .map(|v| match v {
                            serde_json::Value::String(s) => s,
                            other => other.to_string(),
                        })
                        .unwrap_or_default();
                    Ok(text)
                }
                Err(e) => Err(ToolError::new(ErrorCode::Unknown, format!("malformed knowledge-service response: {e}"))),
            },
            Ok(resp) => Err(ToolError::new(
                ErrorCode::Unknown,
                format!("knowledge service returned status {}", resp.status()),
            )),
            Err(e) if e.is_timeout() => Err(ToolError::new(ErrorCode::Timeout, "knowledge service request timed out")),
            Err(e) if e.is_connect() => Err(ToolError::new(ErrorCode::Unknown, format!("could not reach knowledge service: {e}"))),
            Err(e) => Err(ToolError::new(ErrorCode::Unknown, e.to_string())),
        };

        let (status, summary, response_chars) = match &result {
            Ok(text) => ("success", Some(text.chars().take(200).collect::<String>()), text.chars().count() as i64),
            Err(e) => ("error", Some(e.message.clone()), 0),
        };

        let request_id = ctx.request_id().unwrap_or_default();
        ctx.telemetry
            .record_tool_call(dbmcp_control::ToolCallRecord {
                request_id: &request_id,
                tool_name: self.name(),
                tool_class: dbmcp_control::ToolClass::Knowledge,
                parameters: args.clone(),
                duration_ms,
                status,
                result_summary: summary,
                sql_text: None,
                execution_time_ms: Some(duration_ms),
                db_name: None,
            })
            .await;
        ctx.telemetry
            .record_knowledge_query(&request_id, &query, &mode, top_k as i64, response_chars, duration_ms, status)
            .await;

        match result {
            Ok(text) => ToolEnvelope::success_text(text).with_execution_time(duration_ms as u64),
            Err(err) => ToolEnvelope::error(err),
        }
    }
}
