//! Planner (C8.a).
//!
//! A single strict-JSON LLM call producing `{ "steps": [string, ...] }`
//! (`spec.md` §4.7). On provider failure: emit `ErrorLog(PLAN_ERROR)`,
//! set `final_response`, and skip straight to termination.

use std::sync::Arc;

use dbmcp_control::TelemetryRecorder;
use dbmcp_domain::tool::Message;
use dbmcp_providers::{ChatRequest, LlmProvider};

use crate::state::PlanState;

const SYSTEM_PROMPT: &str = r#"You are the planning stage of a SQL-analytics agent. You have three tools available to the execution stage: get_table_schema (catalog lookup), execute_sql (read-only SELECT), and query_knowledge_graph (semantic lookup for business-definition questions).

Produce a short ordered plan of natural-language steps that together answer the user's question. Confirm table and column names with the catalog tool before emitting SQL. Prefer the fewest steps that fully answer the question.

Respond with a single JSON object of the exact shape {"steps": ["step one", "step two", ...]} and nothing else."#;

pub struct Planner {
    provider: Arc<dyn LlmProvider>,
    telemetry: Arc<TelemetryRecorder>,
}

impl Planner {
    pub fn new(provider: Arc<dyn LlmProvider>, telemetry: Arc<TelemetryRecorder>) -> Self {
        Self { provider, telemetry }
    }

    /// Produce the initial plan for `state.user_input`, or terminate `state`
    /// with a fallback response on provider failure.
    pub async fn plan(&self, state: &mut PlanState, request_id: &str) {
        let req = ChatRequest {
            messages: vec![Message::system(SYSTEM_PROMPT), Message::user(state.user_input.clone())],
            json_mode: true,
            ..Default::default()
        };

        match self.provider.chat(&req).await {
            Ok(resp) => match parse_plan(&resp.content) {
                Some(steps) if !steps.is_empty() => {
                    state.plan = steps;
                    state.step_index = 0;
                }
                _ => {
                    self.record_error(request_id, "planner returned no usable steps").await;
                    state.final_response = Some("I couldn't form a plan for that question.".to_string());
                }
            },
            Err(e) => {
                self.record_error(request_id, &e.to_string()).await;
                state.final_response = Some("I ran into a problem planning how to answer that question.".to_string());
            }
        }
    }

    async fn record_error(&self, request_id: &str, message: &str) {
        self.telemetry
            .record_error(
                Some(request_id),
                None,
                dbmcp_domain::envelope::ErrorCode::PlanError.code(),
                dbmcp_domain::envelope::ErrorCode::PlanError.name(),
                message,
                "planner",
                "plan",
            )
            .await;
    }
}

fn parse_plan(content: &str) -> Option<Vec<String>> {
    let value: serde_json::Value = serde_json::from_str(content.trim()).ok()?;
    let steps = value.get("steps")?.as_array()?;
    Some(steps.iter().filter_map(|s| s.as_str().map(|s| s.to_string())).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plan_extracts_steps() {
        let json = r#"{"steps": ["look up schema", "run count query"]}"#;
        assert_eq!(parse_plan(json), Some(vec!["look up schema".to_string(), "run count query".to_string()]));
    }

    #[test]
    fn parse_plan_rejects_malformed_json() {
        assert_eq!(parse_plan("not json"), None);
    }

    #[test]
    fn parse_plan_rejects_missing_steps_key() {
        assert_eq!(parse_plan(r#"{"other": []}"#), None);
    }
}
