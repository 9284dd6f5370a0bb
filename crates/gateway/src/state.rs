use std::sync::Arc;

use dbmcp_control::ControlDb;
use dbmcp_controller::Controller;
use dbmcp_domain::config::Config;
use dbmcp_pool::PoolRegistry;
use dbmcp_sessions::SessionRegistry;
use dbmcp_tools::ToolSet;

use crate::api::mcp::TransportRegistry;

/// Shared application state passed to all API handlers.
///
/// Deliberately small: a single tenant-agnostic service with one exposed
/// tool (`data_agent`), so there is no per-feature store sprawl — just the
/// pieces each component (C1–C11) needs.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    /// Async Pool Registry (C2) — per-destination `sqlx` MySQL pools.
    pub pools: Arc<PoolRegistry>,
    /// Control DB (C11): connection pool + Mapping Store (C3) + Telemetry Recorder (C7).
    pub control: Arc<ControlDb>,
    /// The three abstract tools (C4, C5, C6) reachable from a plan step.
    pub tools: Arc<ToolSet>,
    /// Plan–Execute–Replan controller (C8).
    pub controller: Arc<Controller>,
    /// Analytics-session ref-counting for duplicate `/sse` connections (C10).
    pub sessions: Arc<SessionRegistry>,
    /// Routes `POST /messages?session_id=...` frames to their owning `/sse` stream (C10).
    pub mcp_sessions: Arc<TransportRegistry>,

    /// SHA-256 hash of the API bearer token (read once at startup).
    /// `None` = dev mode (no auth enforced on the management routes).
    pub api_token_hash: Option<Vec<u8>>,
}
