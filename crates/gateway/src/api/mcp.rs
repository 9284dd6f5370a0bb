//! Stream Transport & Middleware (C10).
//!
//! `GET /sse?db=<destination>` opens a long-lived event stream speaking
//! JSON-RPC 2.0 framing, mirroring the upstream MCP SSE transport
//! (`mcp.server.sse.SseServerTransport` in `server.py`): the first event sent
//! is an `endpoint` event naming the companion `POST /messages?session_id=...`
//! URL the client must use for its half of the conversation. The only tool
//! reachable over this transport is `data_agent`, taking one string argument
//! `query` and returning a string (`spec.md` §6).
//!
//! A transport-level middleware concern — parsing `db`, resolving it through
//! the Mapping Store (C3), and binding the request-scoped context — lives in
//! [`sse_connect`] itself rather than a separate `axum::middleware` layer,
//! since the resolved connection must flow into the same task that owns the
//! SSE stream.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json};
use dbmcp_control::ControlDb;
use dbmcp_domain::envelope::{ErrorCode, ToolEnvelope, ToolError};
use dbmcp_sessions::{SessionKey, SessionRegistry};
use dbmcp_tools::context::RequestContext;
use dbmcp_pool::ResolvedConnection;
use futures_util::stream::Stream;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::state::AppState;

const PROTOCOL_VERSION: &str = "2024-11-05";
const TOOL_NAME: &str = "data_agent";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// JSON-RPC framing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize)]
struct RpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Serialize)]
struct RpcErrorBody {
    code: i32,
    message: String,
}

impl RpcResponse {
    fn ok(id: Value, result: Value) -> Self {
        Self { jsonrpc: "2.0", id, result: Some(result), error: None }
    }

    fn err(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self { jsonrpc: "2.0", id, result: None, error: Some(RpcErrorBody { code, message: message.into() }) }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Transport session registry (routes POST /messages to the right stream)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Keyed on a fresh per-connection id handed out by `GET /sse`, distinct
/// from the ref-counted *analytics* `session_id` in [`SessionRegistry`]:
/// two duplicate SSE connections share one analytics session but each still
/// needs its own inbound channel for message routing.
#[derive(Default)]
pub struct TransportRegistry {
    inboxes: Mutex<HashMap<String, mpsc::UnboundedSender<RpcRequest>>>,
}

impl TransportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, transport_session_id: String, tx: mpsc::UnboundedSender<RpcRequest>) {
        self.inboxes.lock().insert(transport_session_id, tx);
    }

    fn deregister(&self, transport_session_id: &str) {
        self.inboxes.lock().remove(transport_session_id);
    }

    fn route(&self, transport_session_id: &str, req: RpcRequest) -> Result<(), ()> {
        match self.inboxes.lock().get(transport_session_id) {
            Some(tx) => tx.send(req).map_err(|_| ()),
            None => Err(()),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /sse
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct SseQuery {
    pub db: Option<String>,
}

pub async fn sse_connect(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(q): Query<SseQuery>,
) -> impl IntoResponse {
    let Some(destination) = q.db.filter(|d| !d.is_empty()) else {
        return error_stream(dbmcp_controller::dispatcher::missing_destination_error()).into_response();
    };

    let mapping = match state.control.mappings.get(&destination).await {
        Ok(Some(m)) => m,
        Ok(None) => {
            return error_stream(ToolEnvelope::error(ToolError::new(
                ErrorCode::MissingDbConfig,
                format!("unknown or inactive destination '{destination}'"),
            )))
            .into_response()
        }
        Err(e) => return error_stream(ToolEnvelope::error(ToolError::from(e))).into_response(),
    };
    let connection = mapping.resolved_connection();

    let client_ip = addr.ip().to_string();
    let key = SessionKey::new(client_ip.clone(), destination.clone());
    let acquired = state.sessions.acquire(key.clone(), || Uuid::new_v4().to_string());
    if acquired.is_new {
        state
            .control
            .telemetry
            .open_session(&acquired.session_id, &client_ip, None, &destination)
            .await;
    }

    let transport_session_id = Uuid::new_v4().to_string();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<RpcRequest>();
    state.mcp_sessions.register(transport_session_id.clone(), inbound_tx);
    let cancel = CancellationToken::new();

    let guard = ConnectionGuard {
        sessions: state.sessions.clone(),
        mcp_sessions: state.mcp_sessions.clone(),
        control: state.control.clone(),
        key,
        transport_session_id: transport_session_id.clone(),
    };

    let stream = transport_stream(
        state,
        transport_session_id,
        acquired.session_id,
        destination,
        connection,
        inbound_rx,
        cancel,
        guard,
    );

    Sse::new(stream).keep_alive(KeepAlive::default()).into_response()
}

fn error_stream(envelope: ToolEnvelope) -> Sse<impl Stream<Item = Result<Event, std::convert::Infallible>>> {
    let stream = futures_util::stream::once(async move {
        Ok::<_, std::convert::Infallible>(Event::default().event("error").data(envelope.to_json_string()))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Drops the transport-level registration and releases the analytics
/// session's ref-count when the SSE stream is dropped (client disconnect,
/// or the stream running to completion). `close_session`'s control-DB write
/// is async, so it is spawned rather than awaited from `Drop`.
struct ConnectionGuard {
    sessions: Arc<SessionRegistry>,
    mcp_sessions: Arc<TransportRegistry>,
    control: Arc<ControlDb>,
    key: SessionKey,
    transport_session_id: String,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.mcp_sessions.deregister(&self.transport_session_id);
        if let Some(released) = self.sessions.release(&self.key) {
            if released.closed {
                let control = self.control.clone();
                tokio::spawn(async move {
                    control.telemetry.close_session(&released.session_id).await;
                });
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn transport_stream(
    state: AppState,
    transport_session_id: String,
    analytics_session_id: String,
    destination: String,
    connection: ResolvedConnection,
    mut inbound_rx: mpsc::UnboundedReceiver<RpcRequest>,
    cancel: CancellationToken,
    guard: ConnectionGuard,
) -> impl Stream<Item = Result<Event, std::convert::Infallible>> {
    async_stream::stream! {
        let _guard = guard;

        // MCP SSE handshake: tell the client where to POST its requests.
        yield Ok(Event::default()
            .event("endpoint")
            .data(format!("/messages?session_id={transport_session_id}")));

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                maybe_req = inbound_rx.recv() => {
                    let Some(req) = maybe_req else { break };
                    let id = req.id.clone().unwrap_or(Value::Null);
                    match req.method.as_str() {
                        "initialize" => {
                            yield Ok(Event::default().event("message").data(
                                serde_json::to_string(&RpcResponse::ok(id, initialize_result())).unwrap_or_default(),
                            ));
                        }
                        "notifications/initialized" => {
                            // No response for a notification.
                        }
                        "tools/list" => {
                            yield Ok(Event::default().event("message").data(
                                serde_json::to_string(&RpcResponse::ok(id, tools_list_result())).unwrap_or_default(),
                            ));
                        }
                        "tools/call" => {
                            let response = handle_tools_call(
                                &state,
                                &analytics_session_id,
                                &destination,
                                &connection,
                                &cancel,
                                id,
                                req.params,
                            ).await;
                            yield Ok(Event::default().event("message").data(
                                serde_json::to_string(&response).unwrap_or_default(),
                            ));
                        }
                        other => {
                            yield Ok(Event::default().event("message").data(
                                serde_json::to_string(&RpcResponse::err(id, -32601, format!("unknown method '{other}'"))).unwrap_or_default(),
                            ));
                        }
                    }
                }
            }
        }
    }
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": { "tools": {} },
        "serverInfo": { "name": "dbmcp-gateway", "version": env!("CARGO_PKG_VERSION") },
    })
}

fn tools_list_result() -> Value {
    json!({
        "tools": [{
            "name": TOOL_NAME,
            "description": "Answer a natural-language question about the bound data source.",
            "inputSchema": {
                "type": "object",
                "properties": { "query": { "type": "string" } },
                "required": ["query"],
            },
        }],
    })
}

async fn handle_tools_call(
    state: &AppState,
    analytics_session_id: &str,
    destination: &str,
    connection: &ResolvedConnection,
    cancel: &CancellationToken,
    id: Value,
    params: Value,
) -> RpcResponse {
    let name = params.get("name").and_then(|v| v.as_str()).unwrap_or("");
    if name != TOOL_NAME {
        return RpcResponse::err(id, -32602, format!("unknown tool '{name}'"));
    }
    let query = params
        .get("arguments")
        .and_then(|a| a.get("query"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    let dispatcher = dbmcp_controller::Dispatcher {
        controller: &state.controller,
        tool_ctx: &dbmcp_tools::ToolContext::new(state.pools.clone(), state.control.telemetry.clone()),
        telemetry: &state.control.telemetry,
    };

    let envelope = dispatcher
        .data_agent(&query, analytics_session_id, destination, connection.clone(), cancel.clone())
        .await;

    RpcResponse::ok(id, tool_result_envelope(&envelope))
}

fn tool_result_envelope(envelope: &ToolEnvelope) -> Value {
    let (text, is_error) = match envelope {
        ToolEnvelope::Success { message, .. } => (message.clone(), false),
        ToolEnvelope::Error { error, .. } => (error.message.clone(), true),
    };
    json!({
        "content": [{ "type": "text", "text": text }],
        "isError": is_error,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /messages?session_id=...
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    pub session_id: String,
}

pub async fn post_message(
    State(state): State<AppState>,
    Query(q): Query<MessagesQuery>,
    Json(req): Json<RpcRequest>,
) -> impl IntoResponse {
    match state.mcp_sessions.route(&q.session_id, req) {
        Ok(()) => (axum::http::StatusCode::ACCEPTED, Json(json!({"status": "accepted"}))),
        Err(()) => (
            axum::http::StatusCode::NOT_FOUND,
            Json(json!({"error": format!("no open SSE connection for session_id '{}'", q.session_id)})),
        ),
    }
}

// This module never constructs a `RequestContext` directly — that binding
// happens inside `Dispatcher::data_agent` (C9), which owns the task-local
// scope for the duration of one `data_agent` call.
#[allow(dead_code)]
fn _context_is_bound_by_dispatcher(_: RequestContext) {}
