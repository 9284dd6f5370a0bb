use serde::Serialize;

/// Ephemeral operational log events, emitted across all dbmcp crates for
/// operators tailing stdout. Distinct from the durable, queryable rows the
/// Telemetry Recorder (`dbmcp-control::telemetry`) writes to the control
/// database: this is log noise, that is the audited record.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    PoolCreated {
        destination: String,
        host: String,
        database: String,
    },
    PoolEvicted {
        destination: String,
        reason: String,
    },
    MappingCacheReloaded {
        count: usize,
    },
    SseConnected {
        client_ip: String,
        destination: String,
        session_id: String,
        is_new: bool,
        ref_count: u32,
    },
    SseDisconnected {
        client_ip: String,
        destination: String,
        session_id: String,
        ref_count: u32,
    },
    ControllerIterationCap {
        request_id: String,
        iterations: usize,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "dbmcp_event");
    }
}
