//! Plan–Execute–Replan controller (C8).
//!
//! Drives `Planner -> Executor -> Replanner -> (Executor | end)` bounded by
//! `MAX_ITERATIONS` and the outer `2*MAX_ITERATIONS + 10` scheduler-step
//! backstop (`spec.md` §4.9 state-machine table).

use std::sync::Arc;

use dbmcp_control::TelemetryRecorder;
use dbmcp_providers::LlmProvider;
use dbmcp_tools::{ToolContext, ToolSet};

use crate::executor::{StepExecutor, StepOutcome};
use crate::plan::Planner;
use crate::replan::Replanner;
use crate::state::PlanState;

pub struct Controller {
    planner: Planner,
    executor: StepExecutor,
    replanner: Replanner,
    scheduler_step_cap: usize,
}

/// Outcome of one full `data_agent` deliberation.
pub struct ControllerResult {
    pub final_response: String,
    pub plan_steps: usize,
    pub executed_steps: usize,
    pub iterations: usize,
    pub tool_names: Vec<String>,
    pub tool_counts: std::collections::HashMap<String, u32>,
}

impl Controller {
    pub fn new(provider: Arc<dyn LlmProvider>, tools: Arc<ToolSet>, telemetry: Arc<TelemetryRecorder>, max_iterations: usize, scheduler_step_cap: usize) -> Self {
        Self {
            planner: Planner::new(provider.clone(), telemetry.clone()),
            executor: StepExecutor::new(provider.clone(), tools, telemetry.clone()),
            replanner: Replanner::new(provider, telemetry, max_iterations),
            scheduler_step_cap,
        }
    }

    pub async fn run(&self, user_input: impl Into<String>, ctx: &ToolContext, request_id: &str) -> ControllerResult {
        let mut state = PlanState::new(user_input);

        self.planner.plan(&mut state, request_id).await;

        let mut all_tool_names: Vec<String> = Vec::new();
        let mut scheduler_steps: usize = 0;
        while state.final_response.is_none() && !state.is_terminal() {
            if scheduler_steps >= self.scheduler_step_cap {
                // Outer safety valve: guarantees termination even if the
                // iteration-count check in `replan` is somehow bypassed.
                state.final_response = Some("I had to stop early after too many internal steps.".to_string());
                break;
            }
            scheduler_steps += 1;

            let step = state.plan[state.step_index].clone();
            match self.executor.run_step(ctx, request_id, &state.plan, state.step_index).await {
                StepOutcome::Success { result_text, tool_names } => {
                    all_tool_names.extend(tool_names);
                    state.past_steps.push((step, result_text));
                }
                StepOutcome::Failure { error_text, tool_names } => {
                    all_tool_names.extend(tool_names);
                    state.past_steps.push((step, error_text.clone()));
                    state.errors.push(error_text);
                }
            }
            state.step_index += 1;

            scheduler_steps += 1;
            self.replanner.replan(&mut state, request_id).await;
        }

        let mut tool_counts = std::collections::HashMap::new();
        for name in &all_tool_names {
            *tool_counts.entry(name.clone()).or_insert(0u32) += 1;
        }

        let final_response = state.final_response.unwrap_or_else(|| "I wasn't able to produce an answer.".to_string());
        ControllerResult {
            final_response,
            plan_steps: state.plan.len(),
            executed_steps: state.step_index,
            iterations: state.past_steps.len(),
            tool_names: all_tool_names,
            tool_counts,
        }
    }
}
