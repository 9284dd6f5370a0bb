use clap::{Parser, Subcommand};

/// dbmcp-gateway — a multi-tenant SQL-analytics gateway exposing a single
/// natural-language tool over a streaming RPC transport.
#[derive(Debug, Parser)]
#[command(name = "dbmcp-gateway", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the gateway server (default when no subcommand is given).
    Serve,
    /// Print version information.
    Version,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path specified by `DBMCP_CONFIG` (or
/// `config.toml` by default). Returns the parsed [`Config`] and the path
/// that was used.
pub fn load_config() -> anyhow::Result<(dbmcp_domain::config::Config, String)> {
    let config_path =
        std::env::var("DBMCP_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        dbmcp_domain::config::Config::default()
    };

    Ok((config, config_path))
}
