pub mod auth;
pub mod management;
pub mod mcp;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the full API router.
///
/// Routes are split into **public** (no auth required) and **protected**
/// (gated behind the bearer-token middleware).
///
/// The streaming transport (`/sse`, `/messages`) stays public: a client has
/// no session yet at connect time, and per-destination credentials never
/// cross this boundary, only a `query` string does. `/refresh` forces a
/// control-DB reload and sits behind auth alongside `/`.
///
/// `state` is needed to wire up the auth middleware at build time.
pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/sse", get(mcp::sse_connect))
        .route("/messages", post(mcp::post_message))
        .route("/health", get(management::health));

    let protected = Router::new()
        .route("/", get(management::index))
        .route("/refresh", get(management::refresh))
        // Apply API auth middleware to all protected routes.
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::require_api_token,
        ));

    public
        .merge(protected)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
