use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LLM provider (LLM_MODEL / LLM_API_KEY / LLM_BASE_URL)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// The gateway talks to exactly one OpenAI-compatible chat endpoint; the
// Planner, Executor sub-agent, and Replanner (C8) all share it. Unlike the
// teacher's multi-provider router, this spec has no provider fallback or
// tiering requirement, so only a single `ProviderConfig` is carried.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "d_model")]
    pub model: String,
    /// Env var holding the bearer API key. Resolved at startup.
    #[serde(default = "d_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "d_base_url")]
    pub base_url: String,
    #[serde(default = "d_timeout_ms")]
    pub request_timeout_ms: u64,
    /// The deliberation bound (`spec.md` §4.9): max (step + replan) cycles
    /// before the Replanner synthesizes a fallback response.
    #[serde(default = "d_max_iterations")]
    pub max_iterations: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: d_model(),
            api_key_env: d_api_key_env(),
            base_url: d_base_url(),
            request_timeout_ms: d_timeout_ms(),
            max_iterations: d_max_iterations(),
        }
    }
}

impl LlmConfig {
    /// The outer scheduler-step backstop from `spec.md` §4.9: `2 * MAX_ITERATIONS + 10`.
    pub fn scheduler_step_cap(&self) -> usize {
        2 * self.max_iterations + 10
    }
}

fn d_model() -> String {
    "gpt-4o-mini".into()
}
fn d_api_key_env() -> String {
    "LLM_API_KEY".into()
}
fn d_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn d_timeout_ms() -> u64 {
    30_000
}
fn d_max_iterations() -> usize {
    15
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduler_step_cap_matches_formula() {
        let cfg = LlmConfig { max_iterations: 15, ..LlmConfig::default() };
        assert_eq!(cfg.scheduler_step_cap(), 40);
    }

    #[test]
    fn default_max_iterations_is_fifteen() {
        assert_eq!(LlmConfig::default().max_iterations, 15);
    }
}
