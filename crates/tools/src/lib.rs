//! The three externally-callable tools (`spec.md` §4.4–§4.6) plus the SQL
//! Validator (C1) they share and the request-scoped context (§9) they're
//! invoked through.
//!
//! Re-architected per §9's note: tools never reach into ambient module
//! state. Each `invoke` takes an explicit [`context::ToolContext`]; the
//! request-scoped destination is resolved through [`context::current`]
//! only as the *default*, never as a hidden global.

pub mod catalog;
pub mod context;
pub mod knowledge;
mod params;
pub mod sql_tool;
pub mod validator;

pub use catalog::CatalogTool;
pub use context::{RequestContext, ToolContext};
pub use knowledge::KnowledgeTool;
pub use sql_tool::SqlTool;

use async_trait::async_trait;
use dbmcp_domain::envelope::ToolEnvelope;

/// Common shape the Planner/Executor sub-agent (C8) dispatches through.
/// `CatalogTool`/`SqlTool`/`KnowledgeTool` each implement this alongside
/// their own inherent `invoke` (kept for direct callers/tests).
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn schema(&self) -> serde_json::Value;
    async fn invoke(&self, ctx: &ToolContext, args: serde_json::Value) -> ToolEnvelope;
}

#[async_trait]
impl Tool for CatalogTool {
    fn name(&self) -> &'static str {
        CatalogTool::name(self)
    }
    fn schema(&self) -> serde_json::Value {
        CatalogTool::schema(self)
    }
    async fn invoke(&self, ctx: &ToolContext, args: serde_json::Value) -> ToolEnvelope {
        CatalogTool::invoke(self, ctx, &args).await
    }
}

#[async_trait]
impl Tool for SqlTool {
    fn name(&self) -> &'static str {
        SqlTool::name(self)
    }
    fn schema(&self) -> serde_json::Value {
        SqlTool::schema(self)
    }
    async fn invoke(&self, ctx: &ToolContext, args: serde_json::Value) -> ToolEnvelope {
        SqlTool::invoke(self, ctx, &args).await
    }
}

#[async_trait]
impl Tool for KnowledgeTool {
    fn name(&self) -> &'static str {
        KnowledgeTool::name(self)
    }
    fn schema(&self) -> serde_json::Value {
        KnowledgeTool::schema(self)
    }
    async fn invoke(&self, ctx: &ToolContext, args: serde_json::Value) -> ToolEnvelope {
        KnowledgeTool::invoke(self, ctx, &args).await
    }
}

/// The fixed three-tool registry the sub-agent (C8.b) calls through.
pub struct ToolSet {
    pub catalog: CatalogTool,
    pub sql: SqlTool,
    pub knowledge: KnowledgeTool,
}

impl ToolSet {
    pub fn new(knowledge_config: dbmcp_domain::config::KnowledgeConfig) -> Self {
        Self {
            catalog: CatalogTool,
            sql: SqlTool,
            knowledge: KnowledgeTool::new(knowledge_config),
        }
    }

    pub fn schemas(&self) -> Vec<serde_json::Value> {
        vec![self.catalog.schema(), self.sql.schema(), self.knowledge.schema()]
    }

    pub async fn dispatch(&self, tool_name: &str, ctx: &ToolContext, args: serde_json::Value) -> Option<ToolEnvelope> {
        match tool_name {
            name if name == self.catalog.name() => Some(Tool::invoke(&self.catalog, ctx, args).await),
            name if name == self.sql.name() => Some(Tool::invoke(&self.sql, ctx, args).await),
            name if name == self.knowledge.name() => Some(Tool::invoke(&self.knowledge, ctx, args).await),
            _ => None,
        }
    }
}
