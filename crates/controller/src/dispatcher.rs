//! Request Dispatcher / `data_agent` (C9).
//!
//! The single externally-exposed operation (`spec.md` §4.10). Binds the
//! request-scoped context, delegates to the controller (C8), and always
//! records completion — success or error — before returning.

use std::time::Instant;

use dbmcp_control::{AgentExecutionRecord, TelemetryRecorder};
use dbmcp_domain::envelope::{ErrorCode, ToolEnvelope, ToolError};
use dbmcp_pool::ResolvedConnection;
use dbmcp_tools::context::{self, RequestContext};
use dbmcp_tools::ToolContext;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::controller::Controller;

pub struct Dispatcher<'a> {
    pub controller: &'a Controller,
    pub tool_ctx: &'a ToolContext,
    pub telemetry: &'a TelemetryRecorder,
}

impl<'a> Dispatcher<'a> {
    /// Run one `data_agent` invocation bound to `session_id`/`destination`.
    /// `cancel` fires when the owning event-stream connection disconnects.
    pub async fn data_agent(
        &self,
        query: &str,
        session_id: &str,
        destination: &str,
        connection: ResolvedConnection,
        cancel: CancellationToken,
    ) -> ToolEnvelope {
        let request_id = Uuid::new_v4().to_string();
        let ctx = RequestContext {
            request_id: request_id.clone(),
            session_id: session_id.to_string(),
            destination: destination.to_string(),
            connection,
        };

        let start = Instant::now();
        let outcome = context::scope(ctx, self.run_with_cancellation(query, &request_id, session_id, destination, cancel)).await;
        let duration_ms = start.elapsed().as_millis() as i64;

        match outcome {
            RunOutcome::Completed(result) => {
                self.telemetry
                    .record_agent_execution(AgentExecutionRecord {
                        request_id: &request_id,
                        session_id,
                        db_name: destination,
                        user_query: query,
                        status: "success",
                        duration_ms,
                        plan_steps: result.plan_steps as i64,
                        executed_steps: result.executed_steps as i64,
                        iterations: result.iterations as i64,
                        tool_names: result.tool_names.clone(),
                        tool_counts: serde_json::to_value(&result.tool_counts).unwrap_or_else(|_| serde_json::json!({})),
                        response_length: result.final_response.chars().count() as i64,
                        has_data: !result.final_response.is_empty(),
                    })
                    .await;
                self.telemetry.record_session_activity(session_id, destination, true).await;
                ToolEnvelope::success_text(result.final_response).with_execution_time(duration_ms as u64)
            }
            RunOutcome::Cancelled => {
                self.telemetry
                    .record_agent_execution(AgentExecutionRecord {
                        request_id: &request_id,
                        session_id,
                        db_name: destination,
                        user_query: query,
                        status: "error",
                        duration_ms,
                        plan_steps: 0,
                        executed_steps: 0,
                        iterations: 0,
                        tool_names: vec![],
                        tool_counts: serde_json::json!({}),
                        response_length: 0,
                        has_data: false,
                    })
                    .await;
                self.telemetry.record_session_activity(session_id, destination, false).await;
                self.telemetry
                    .record_error(
                        Some(&request_id),
                        Some(session_id),
                        ErrorCode::ClientCancelled.code(),
                        ErrorCode::ClientCancelled.name(),
                        "client disconnected before the request completed",
                        "dispatcher",
                        "data_agent",
                    )
                    .await;
                ToolEnvelope::error(ToolError::new(ErrorCode::ClientCancelled, "request cancelled by client disconnect"))
            }
        }
    }

    async fn run_with_cancellation(&self, query: &str, request_id: &str, _session_id: &str, _destination: &str, cancel: CancellationToken) -> RunOutcome {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => RunOutcome::Cancelled,
            result = self.controller.run(query.to_string(), self.tool_ctx, request_id) => RunOutcome::Completed(result),
        }
    }
}

enum RunOutcome {
    Completed(crate::controller::ControllerResult),
    Cancelled,
}

/// Rejects a `data_agent` call with no bound destination
/// (`spec.md` §4.10, "rejects with an instructive message if absent").
pub fn missing_destination_error() -> ToolEnvelope {
    ToolEnvelope::error(ToolError::new(
        ErrorCode::MissingRequiredParam,
        "no destination is bound to this connection; reconnect with ?db=<name>",
    ))
}
