//! Step Executor (C8.b) — the tool-calling sub-agent.
//!
//! For the current step, formats a per-step prompt highlighting it within
//! the full numbered plan, then runs a bounded tool-calling loop against
//! the LLM provider until it produces a final assistant message
//! (`spec.md` §4.8). This sub-agent is the only component that resolves
//! the request-scoped destination and passes it implicitly into the tools.

use std::sync::Arc;

use dbmcp_control::TelemetryRecorder;
use dbmcp_domain::envelope::ErrorCode;
use dbmcp_domain::tool::{ContentPart, Message, MessageContent, Role, ToolDefinition};
use dbmcp_providers::{ChatRequest, LlmProvider};
use dbmcp_tools::{ToolContext, ToolSet};

const SYSTEM_PROMPT: &str = "You are the execution stage of a SQL-analytics agent. Carry out exactly the highlighted step using the available tools, then report the result in one or two sentences.";

// Bound on how many tool round-trips a single plan step may take before
// this executor gives up and reports whatever it has. The outer spec
// bounds deliberation iterations (MAX_ITERATIONS), not sub-agent tool
// round-trips within one step; this cap is a defensive addition.
const MAX_SUB_AGENT_ROUNDS: usize = 6;

pub struct StepExecutor {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolSet>,
    telemetry: Arc<TelemetryRecorder>,
}

pub enum StepOutcome {
    Success { result_text: String, tool_names: Vec<String> },
    Failure { error_text: String, tool_names: Vec<String> },
}

impl StepExecutor {
    pub fn new(provider: Arc<dyn LlmProvider>, tools: Arc<ToolSet>, telemetry: Arc<TelemetryRecorder>) -> Self {
        Self { provider, tools, telemetry }
    }

    pub async fn run_step(&self, ctx: &ToolContext, request_id: &str, plan: &[String], step_index: usize) -> StepOutcome {
        let prompt = format_step_prompt(plan, step_index);
        let tool_defs: Vec<ToolDefinition> = self
            .tools
            .schemas()
            .into_iter()
            .filter_map(|s| {
                Some(ToolDefinition {
                    name: s.get("name")?.as_str()?.to_string(),
                    description: s.get("description").and_then(|d| d.as_str()).unwrap_or("").to_string(),
                    parameters: s.get("parameters").cloned().unwrap_or(serde_json::json!({})),
                })
            })
            .collect();

        let mut messages = vec![Message::system(SYSTEM_PROMPT), Message::user(prompt)];
        let mut tool_names: Vec<String> = Vec::new();

        for _ in 0..MAX_SUB_AGENT_ROUNDS {
            let req = ChatRequest {
                messages: messages.clone(),
                tools: tool_defs.clone(),
                ..Default::default()
            };

            let resp = match self.provider.chat(&req).await {
                Ok(r) => r,
                Err(e) => {
                    self.record_exec_error(request_id, &e.to_string()).await;
                    return StepOutcome::Failure { error_text: format!("⚠️ 执行出错: {e}"), tool_names };
                }
            };

            if resp.tool_calls.is_empty() {
                return StepOutcome::Success { result_text: resp.content, tool_names };
            }

            messages.push(Message {
                role: Role::Assistant,
                content: MessageContent::Parts(
                    resp.tool_calls
                        .iter()
                        .map(|tc| ContentPart::ToolUse {
                            id: tc.call_id.clone(),
                            name: tc.tool_name.clone(),
                            input: tc.arguments.clone(),
                        })
                        .collect(),
                ),
            });

            for call in &resp.tool_calls {
                tool_names.push(call.tool_name.clone());
                let envelope = match self.tools.dispatch(&call.tool_name, ctx, call.arguments.clone()).await {
                    Some(env) => env,
                    None => {
                        self.record_exec_error(request_id, &format!("unknown tool '{}'", call.tool_name)).await;
                        return StepOutcome::Failure {
                            error_text: format!("⚠️ 执行出错: unknown tool '{}'", call.tool_name),
                            tool_names,
                        };
                    }
                };
                messages.push(Message::tool_result(call.call_id.clone(), envelope.to_json_string()));
            }
        }

        self.record_exec_error(request_id, "sub-agent exceeded its tool-call round limit").await;
        StepOutcome::Failure {
            error_text: "⚠️ 执行出错: exceeded tool-call round limit".to_string(),
            tool_names,
        }
    }

    async fn record_exec_error(&self, request_id: &str, message: &str) {
        self.telemetry
            .record_error(Some(request_id), None, ErrorCode::ExecError.code(), ErrorCode::ExecError.name(), message, "executor", "run_step")
            .await;
    }
}

fn format_step_prompt(plan: &[String], step_index: usize) -> String {
    let mut out = String::from("Full plan:\n");
    for (i, step) in plan.iter().enumerate() {
        if i == step_index {
            out.push_str(&format!(">>> {}. {} <<<  (current step)\n", i + 1, step));
        } else {
            out.push_str(&format!("    {}. {}\n", i + 1, step));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_step_prompt_highlights_current_step() {
        let plan = vec!["look up schema".to_string(), "run query".to_string()];
        let prompt = format_step_prompt(&plan, 1);
        assert!(prompt.contains(">>> 2. run query <<<"));
        assert!(prompt.contains("    1. look up schema"));
    }
}
