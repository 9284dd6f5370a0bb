use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Telemetry recorder (ANALYTICS_ENABLED)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "d_true")]
    pub enabled: bool,
    /// Characters kept of a SQL/tool-result summary before truncation
    /// (`ToolCallLog.result_summary`, `spec.md` §3).
    #[serde(default = "d_summary_chars")]
    pub result_summary_chars: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            result_summary_chars: d_summary_chars(),
        }
    }
}

fn d_true() -> bool {
    true
}
fn d_summary_chars() -> usize {
    500
}
