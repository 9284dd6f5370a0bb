//! Per-request plan state (`spec.md` §3, "Plan state").
//!
//! Opaque to the caller: created on `data_agent` entry, destroyed on
//! return. `step_index <= plan.len()` always; `past_steps.len()` is the
//! iteration count and only grows.

#[derive(Debug, Clone, Default)]
pub struct PlanState {
    pub user_input: String,
    pub plan: Vec<String>,
    pub step_index: usize,
    pub past_steps: Vec<(String, String)>,
    pub errors: Vec<String>,
    pub final_response: Option<String>,
}

impl PlanState {
    pub fn new(user_input: impl Into<String>) -> Self {
        Self {
            user_input: user_input.into(),
            ..Default::default()
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.final_response.is_some() || self.plan.is_empty() || self.step_index >= self.plan.len()
    }
}
