//! Request-scoped context (`spec.md` §5, §9).
//!
//! The destination name, resolved connection tuple, analytics `session_id`,
//! and `request_id` are carried on a task-local so the sub-agent (the only
//! component allowed to resolve them) can pass them implicitly into C4/C5.
//! A child task spawned from a request inherits the parent's context;
//! unrelated connections never see it. Tools never read ambient module
//! state directly — they take a `ToolContext` parameter instead (§9
//! re-architecture note).

use std::sync::Arc;

use dbmcp_control::TelemetryRecorder;
use dbmcp_pool::{PoolRegistry, ResolvedConnection};

tokio::task_local! {
    static REQUEST: RequestContext;
}

/// Per-request identity, bound for the lifetime of one `data_agent` call.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub session_id: String,
    pub destination: String,
    pub connection: ResolvedConnection,
}

/// Run `f` with `ctx` bound as the task-local request context.
pub async fn scope<F, T>(ctx: RequestContext, f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    REQUEST.scope(ctx, f).await
}

/// The request context bound by an ancestor task's [`scope`] call, if any.
pub fn current() -> Option<RequestContext> {
    REQUEST.try_with(|ctx| ctx.clone()).ok()
}

/// Everything a `Tool::invoke` needs: the shared pool registry, the
/// telemetry recorder, and (implicitly, via [`current`]) the request
/// context. Destination parameters explicitly passed to a tool call take
/// precedence over the request-scoped default (§4.4, §4.5 "defaulting
/// rule").
#[derive(Clone)]
pub struct ToolContext {
    pub pools: Arc<PoolRegistry>,
    pub telemetry: Arc<TelemetryRecorder>,
}

impl ToolContext {
    pub fn new(pools: Arc<PoolRegistry>, telemetry: Arc<TelemetryRecorder>) -> Self {
        Self { pools, telemetry }
    }

    /// Resolve the connection tuple to use for this call: the explicit
    /// override if given, else the request-scoped one.
    pub fn resolve_connection(&self, explicit: Option<ResolvedConnection>) -> Option<ResolvedConnection> {
        explicit.or_else(|| current().map(|c| c.connection))
    }

    pub fn request_id(&self) -> Option<String> {
        current().map(|c| c.request_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RequestContext {
        RequestContext {
            request_id: "r1".into(),
            session_id: "s1".into(),
            destination: "sales_prod".into(),
            connection: ResolvedConnection {
                host: "db.internal".into(),
                port: 3306,
                username: "svc".into(),
                password: "secret".into(),
                database: "sales".into(),
            },
        }
    }

    #[tokio::test]
    async fn no_context_outside_scope() {
        assert!(current().is_none());
    }

    #[tokio::test]
    async fn context_visible_inside_scope() {
        scope(sample(), async {
            assert_eq!(current().unwrap().destination, "sales_prod");
        })
        .await;
    }

    #[tokio::test]
    async fn explicit_override_wins_over_request_scoped() {
        scope(sample(), async {
            let explicit = ResolvedConnection {
                host: "other.internal".into(),
                port: 3306,
                username: "svc".into(),
                password: "secret".into(),
                database: "other".into(),
            };
            let ctx = ToolContext {
                pools: Arc::new(PoolRegistry::new(dbmcp_domain::config::PoolConfig::default())),
                telemetry: Arc::new(dummy_recorder().await),
            };
            let resolved = ctx.resolve_connection(Some(explicit)).unwrap();
            assert_eq!(resolved.host, "other.internal");
        })
        .await;
    }

    async fn dummy_recorder() -> TelemetryRecorder {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();
        dbmcp_control::schema::migrate(&pool).await.unwrap();
        TelemetryRecorder::new(pool, dbmcp_domain::config::TelemetryConfig::default())
    }
}
