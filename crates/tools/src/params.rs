//! Shared parameter-defaulting rule used by C4 and C5: an explicit
//! `(host, port, user, password, database)` tuple wins; otherwise the
//! request-scoped destination is used (`spec.md` §4.4, §4.5).

use dbmcp_pool::ResolvedConnection;

use crate::context::{current, ToolContext};

pub fn resolve_connection_args(_ctx: &ToolContext, args: &serde_json::Value) -> Option<ResolvedConnection> {
    let explicit = explicit_connection(args);
    explicit.or_else(|| current().map(|c| c.connection))
}

fn explicit_connection(args: &serde_json::Value) -> Option<ResolvedConnection> {
    let host = args.get("host").and_then(|v| v.as_str())?;
    if host.is_empty() {
        return None;
    }
    let port = args.get("port").and_then(|v| v.as_u64()).unwrap_or(3306) as u16;
    let username = args.get("user").and_then(|v| v.as_str()).unwrap_or("").to_string();
    let password = args.get("password").and_then(|v| v.as_str()).unwrap_or("").to_string();
    let database = args.get("database").and_then(|v| v.as_str()).unwrap_or("").to_string();

    Some(ResolvedConnection {
        host: host.to_string(),
        port,
        username,
        password,
        database,
    })
}
