use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Knowledge-graph retrieval service (LIGHTRAG_API_URL / LIGHTRAG_API_KEY)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "d_mode")]
    pub default_mode: String,
    #[serde(default = "d_top_k")]
    pub default_top_k: u32,
    #[serde(default = "d_timeout_s")]
    pub timeout_s: u64,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            api_key: None,
            default_mode: d_mode(),
            default_top_k: d_top_k(),
            timeout_s: d_timeout_s(),
        }
    }
}

fn d_mode() -> String {
    "mix".into()
}
fn d_top_k() -> u32 {
    10
}
fn d_timeout_s() -> u64 {
    30
}
