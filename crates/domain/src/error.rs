/// Shared error type used across all dbmcp crates.
///
/// This is the internal `?`-propagation error. The public, client-facing
/// error shape is [`crate::envelope::ToolError`]; `From<Error> for ToolError`
/// maps every variant below onto the stable code catalogue.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("provider {provider}: {message}")]
    Provider { provider: String, message: String },

    #[error("database: {0}")]
    Db(String),

    #[error("sql: {0}")]
    Sql(String),

    #[error("validation: {0}")]
    Validation(String),

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
