//! HTTP management routes (`spec.md` §6): `GET /`, `GET /health`, `GET /refresh`.

use axum::extract::State;
use axum::response::Json;
use serde_json::{json, Value};

use crate::state::AppState;

fn inventory(state: &AppState) -> Value {
    let available_databases = state.control.mappings.list_names();
    let total = available_databases.len();
    json!({
        "message": "dbmcp gateway: connect to GET /sse?db=<destination_name> to start a session",
        "endpoints": {
            "sse": "/sse?db=<destination_name>",
            "messages": "/messages?session_id=<id>",
            "health": "/health",
            "refresh": "/refresh",
        },
        "available_databases": available_databases,
        "total": total,
        "usage": "open an SSE connection, call tools/list, then tools/call \"data_agent\" with {\"query\": \"...\"}",
    })
}

pub async fn index(State(state): State<AppState>) -> Json<Value> {
    Json(inventory(&state))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "dbmcp-gateway" }))
}

pub async fn refresh(State(state): State<AppState>) -> Json<Value> {
    match state.control.mappings.refresh().await {
        Ok(_) => Json(inventory(&state)),
        Err(e) => Json(json!({ "error": e.to_string() })),
    }
}
