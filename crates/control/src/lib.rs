pub mod mapping;
pub mod schema;
pub mod telemetry;

pub use mapping::{DbMapping, MappingStore};
pub use telemetry::{AgentExecutionRecord, ToolCallRecord, ToolClass, TelemetryRecorder};

use std::sync::Arc;

use dbmcp_domain::config::{ControlDbConfig, TelemetryConfig};
use dbmcp_domain::error::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Bootstraps the SQLite-backed control database: opens the pool, runs the
/// idempotent schema migration, and wires the Mapping Store and Telemetry
/// Recorder over the same connection pool.
pub struct ControlDb {
    pub pool: SqlitePool,
    pub mappings: Arc<MappingStore>,
    pub telemetry: Arc<TelemetryRecorder>,
}

impl ControlDb {
    pub async fn connect(config: &ControlDbConfig, telemetry: TelemetryConfig) -> Result<Self> {
        let opts = SqliteConnectOptions::from_str(&config.sqlite_path)
            .map_err(|e| Error::Db(format!("invalid control-db path '{}': {e}", config.sqlite_path)))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .map_err(|e| Error::Db(format!("failed to open control db: {e}")))?;

        schema::migrate(&pool).await?;

        let mappings = Arc::new(MappingStore::new(pool.clone()));
        mappings.load_all().await?;

        let telemetry = Arc::new(TelemetryRecorder::new(pool.clone(), telemetry));

        Ok(Self { pool, mappings, telemetry })
    }
}
