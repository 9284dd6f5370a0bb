//! Replanner (C8.c).
//!
//! Decides, after each step, whether to terminate with a response or
//! replace the remaining plan (`spec.md` §4.9). `Act` is a sealed sum
//! type: the LLM is instructed to emit JSON discriminated by the presence
//! of `response` vs `steps`, and parsing picks the variant accordingly.

use std::sync::Arc;

use dbmcp_control::TelemetryRecorder;
use dbmcp_domain::envelope::ErrorCode;
use dbmcp_domain::tool::Message;
use dbmcp_providers::{ChatRequest, LlmProvider};

use crate::state::PlanState;

const SYSTEM_PROMPT: &str = r#"You are the replanning stage of a SQL-analytics agent. Given the original question, the current plan, progress so far, and any errors, decide one of two things:

1. If you have enough information to answer the user's question, respond with {"response": "<final answer text>"}.
2. If more steps are needed, respond with {"steps": ["step one", "step two", ...]} — a full replacement plan, not an addendum.

Respond with exactly one JSON object of one of those two shapes and nothing else."#;

/// The Replanner's decision (`spec.md` §9 "Planner/Replanner as sum types").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Act {
    Response { text: String },
    Plan { steps: Vec<String> },
}

pub struct Replanner {
    provider: Arc<dyn LlmProvider>,
    telemetry: Arc<TelemetryRecorder>,
    max_iterations: usize,
}

impl Replanner {
    pub fn new(provider: Arc<dyn LlmProvider>, telemetry: Arc<TelemetryRecorder>, max_iterations: usize) -> Self {
        Self { provider, telemetry, max_iterations }
    }

    /// Apply the Replanner's decision to `state` in place.
    pub async fn replan(&self, state: &mut PlanState, request_id: &str) {
        if state.past_steps.len() >= self.max_iterations {
            dbmcp_domain::trace::TraceEvent::ControllerIterationCap {
                request_id: request_id.to_string(),
                iterations: state.past_steps.len(),
            }
            .emit();
            state.final_response = Some(fallback_response(state));
            return;
        }

        let req = ChatRequest {
            messages: vec![Message::system(SYSTEM_PROMPT), Message::user(replan_prompt(state))],
            json_mode: true,
            ..Default::default()
        };

        match self.provider.chat(&req).await {
            Ok(resp) => match parse_act(&resp.content) {
                Some(Act::Response { text }) => state.final_response = Some(text),
                Some(Act::Plan { steps }) if !steps.is_empty() => {
                    state.plan = steps;
                    state.step_index = 0;
                }
                _ => state.final_response = Some(fallback_response(state)),
            },
            Err(e) => {
                self.telemetry
                    .record_error(Some(request_id), None, ErrorCode::ReplanError.code(), ErrorCode::ReplanError.name(), &e.to_string(), "replanner", "replan")
                    .await;
                state.final_response = Some(fallback_response(state));
            }
        }
    }
}

fn replan_prompt(state: &PlanState) -> String {
    let mut out = format!(
        "Original question: {}\n\nCurrent plan ({}/{} steps done):\n",
        state.user_input,
        state.step_index,
        state.plan.len()
    );
    for (i, step) in state.plan.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, step));
    }
    out.push_str("\nCompleted steps:\n");
    for (task, result) in &state.past_steps {
        out.push_str(&format!("- {task} => {result}\n"));
    }
    if !state.errors.is_empty() {
        out.push_str("\nErrors encountered:\n");
        for err in &state.errors {
            out.push_str(&format!("- {err}\n"));
        }
    }
    out
}

fn parse_act(content: &str) -> Option<Act> {
    let value: serde_json::Value = serde_json::from_str(content.trim()).ok()?;
    if let Some(text) = value.get("response").and_then(|v| v.as_str()) {
        return Some(Act::Response { text: text.to_string() });
    }
    if let Some(steps) = value.get("steps").and_then(|v| v.as_array()) {
        return Some(Act::Plan {
            steps: steps.iter().filter_map(|s| s.as_str().map(|s| s.to_string())).collect(),
        });
    }
    None
}

/// Synthesize a fallback answer from whatever progress exists
/// (`spec.md` §4.9, §7 "exceeding MAX_ITERATIONS").
fn fallback_response(state: &PlanState) -> String {
    if state.past_steps.is_empty() {
        return "I wasn't able to make progress on that question.".to_string();
    }
    let mut out = format!("I reached my iteration limit ({} steps) before fully answering. Here's what I found:\n", state.past_steps.len());
    for (task, result) in &state.past_steps {
        out.push_str(&format!("- {task}: {result}\n"));
    }
    if !state.errors.is_empty() {
        out.push_str(&format!("\n{} step(s) encountered errors along the way.", state.errors.len()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_act_response_variant() {
        let json = r#"{"response": "there are 42 orders"}"#;
        assert_eq!(parse_act(json), Some(Act::Response { text: "there are 42 orders".to_string() }));
    }

    #[test]
    fn parse_act_plan_variant() {
        let json = r#"{"steps": ["query again"]}"#;
        assert_eq!(parse_act(json), Some(Act::Plan { steps: vec!["query again".to_string()] }));
    }

    #[test]
    fn parse_act_rejects_neither_shape() {
        assert_eq!(parse_act(r#"{"other": 1}"#), None);
    }

    #[test]
    fn fallback_response_lists_past_steps() {
        let mut state = PlanState::new("how many orders?");
        state.past_steps.push(("look up schema".into(), "found orders table".into()));
        let text = fallback_response(&state);
        assert!(text.contains("look up schema"));
        assert!(text.contains("found orders table"));
    }
}
