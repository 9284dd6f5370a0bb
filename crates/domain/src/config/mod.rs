mod control_db;
mod knowledge;
mod llm;
mod observability;
mod server;
mod telemetry;

pub use control_db::*;
pub use knowledge::*;
pub use llm::*;
pub use observability::*;
pub use server::*;
pub use telemetry::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub control_db: ControlDbConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.port".into(),
                message: "port must be greater than 0".into(),
            });
        }
        if self.server.host.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.host".into(),
                message: "host must not be empty".into(),
            });
        }
        if self.server.workers == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.workers".into(),
                message: "workers must be greater than 0".into(),
            });
        }

        // CORS: warn if wildcard is used.
        if self.server.cors.allowed_origins.len() == 1 && self.server.cors.allowed_origins[0] == "*"
        {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "server.cors.allowed_origins".into(),
                message: "wildcard \"*\" allows all origins (not recommended for production)".into(),
            });
        }

        if let Some(rl) = &self.server.rate_limit {
            if rl.requests_per_second == 0 {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: "server.rate_limit.requests_per_second".into(),
                    message: "requests_per_second must be greater than 0".into(),
                });
            }
            if rl.burst_size == 0 {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: "server.rate_limit.burst_size".into(),
                    message: "burst_size must be greater than 0".into(),
                });
            }
        }

        // Control DB.
        if self.control_db.host.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "control_db.host".into(),
                message: "host must not be empty".into(),
            });
        }
        if self.control_db.username.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "control_db.username".into(),
                message: "username must not be empty".into(),
            });
        }
        if self.control_db.sqlite_path.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "control_db.sqlite_path".into(),
                message: "sqlite_path must not be empty".into(),
            });
        }

        // Pool.
        if self.pool.pool_size == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "pool.pool_size".into(),
                message: "pool_size must be greater than 0".into(),
            });
        }
        if self.pool.pool_max_size == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "pool.pool_max_size".into(),
                message: "pool_max_size must be greater than 0".into(),
            });
        }
        if self.pool.pool_timeout_s == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "pool.pool_timeout_s".into(),
                message: "pool_timeout_s must be greater than 0".into(),
            });
        }

        // LLM.
        if self.llm.model.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "llm.model".into(),
                message: "model must not be empty".into(),
            });
        }
        if !self.llm.base_url.starts_with("http://") && !self.llm.base_url.starts_with("https://") {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "llm.base_url".into(),
                message: format!(
                    "base_url must start with http:// or https:// (got \"{}\")",
                    self.llm.base_url
                ),
            });
        }
        if self.llm.max_iterations == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "llm.max_iterations".into(),
                message: "max_iterations must be greater than 0".into(),
            });
        }
        if std::env::var(&self.llm.api_key_env).is_err() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "llm.api_key_env".into(),
                message: format!(
                    "environment variable \"{}\" is not set — LLM calls will fail",
                    self.llm.api_key_env
                ),
            });
        }

        // Knowledge.
        if let Some(url) = &self.knowledge.api_url {
            if !url.is_empty() && !url.starts_with("http://") && !url.starts_with("https://") {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: "knowledge.api_url".into(),
                    message: format!("api_url must start with http:// or https:// (got \"{url}\")"),
                });
            }
        } else {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "knowledge.api_url".into(),
                message: "no knowledge-graph retrieval endpoint configured — the knowledge tool will always fail".into(),
            });
        }

        errors
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            server: ServerConfig { port: 8000, host: "0.0.0.0".into(), ..ServerConfig::default() },
            control_db: ControlDbConfig::default(),
            pool: PoolConfig::default(),
            llm: LlmConfig {
                base_url: "https://api.openai.com/v1".into(),
                ..LlmConfig::default()
            },
            knowledge: KnowledgeConfig {
                api_url: Some("https://lightrag.internal/query".into()),
                ..KnowledgeConfig::default()
            },
            telemetry: TelemetryConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }

    fn find_issue<'a>(issues: &'a [ConfigError], field_prefix: &str) -> Option<&'a ConfigError> {
        issues.iter().find(|e| e.field.starts_with(field_prefix))
    }

    #[test]
    fn valid_config_passes() {
        let issues = valid_config().validate();
        let errors: Vec<_> = issues.iter().filter(|e| e.severity == ConfigSeverity::Error).collect();
        assert!(errors.is_empty(), "expected no errors, got: {errors:?}");
    }

    #[test]
    fn server_port_zero_is_error() {
        let mut cfg = valid_config();
        cfg.server.port = 0;
        let issue = find_issue(&cfg.validate(), "server.port").expect("expected error");
        assert_eq!(issue.severity, ConfigSeverity::Error);
    }

    #[test]
    fn server_host_empty_is_error() {
        let mut cfg = valid_config();
        cfg.server.host = String::new();
        let issue = find_issue(&cfg.validate(), "server.host").expect("expected error");
        assert_eq!(issue.severity, ConfigSeverity::Error);
    }

    #[test]
    fn cors_wildcard_is_warning() {
        let mut cfg = valid_config();
        cfg.server.cors.allowed_origins = vec!["*".into()];
        let issue = find_issue(&cfg.validate(), "server.cors.allowed_origins").expect("expected warning");
        assert_eq!(issue.severity, ConfigSeverity::Warning);
    }

    #[test]
    fn rate_limit_zero_rps_is_error() {
        let mut cfg = valid_config();
        cfg.server.rate_limit = Some(RateLimitConfig { requests_per_second: 0, burst_size: 10 });
        let issue = find_issue(&cfg.validate(), "server.rate_limit.requests_per_second").expect("expected error");
        assert_eq!(issue.severity, ConfigSeverity::Error);
    }

    #[test]
    fn control_db_host_empty_is_error() {
        let mut cfg = valid_config();
        cfg.control_db.host = String::new();
        let issue = find_issue(&cfg.validate(), "control_db.host").expect("expected error");
        assert_eq!(issue.severity, ConfigSeverity::Error);
    }

    #[test]
    fn pool_size_zero_is_error() {
        let mut cfg = valid_config();
        cfg.pool.pool_size = 0;
        let issue = find_issue(&cfg.validate(), "pool.pool_size").expect("expected error");
        assert_eq!(issue.severity, ConfigSeverity::Error);
    }

    #[test]
    fn pool_max_size_zero_is_error() {
        let mut cfg = valid_config();
        cfg.pool.pool_max_size = 0;
        let issue = find_issue(&cfg.validate(), "pool.pool_max_size").expect("expected error");
        assert_eq!(issue.severity, ConfigSeverity::Error);
    }

    #[test]
    fn llm_base_url_invalid_scheme_is_error() {
        let mut cfg = valid_config();
        cfg.llm.base_url = "ftp://example.com".into();
        let issue = find_issue(&cfg.validate(), "llm.base_url").expect("expected error");
        assert_eq!(issue.severity, ConfigSeverity::Error);
    }

    #[test]
    fn llm_max_iterations_zero_is_error() {
        let mut cfg = valid_config();
        cfg.llm.max_iterations = 0;
        let issue = find_issue(&cfg.validate(), "llm.max_iterations").expect("expected error");
        assert_eq!(issue.severity, ConfigSeverity::Error);
    }

    #[test]
    fn knowledge_api_url_missing_is_warning() {
        let mut cfg = valid_config();
        cfg.knowledge.api_url = None;
        let issue = find_issue(&cfg.validate(), "knowledge.api_url").expect("expected warning");
        assert_eq!(issue.severity, ConfigSeverity::Warning);
    }

    #[test]
    fn knowledge_api_url_invalid_scheme_is_error() {
        let mut cfg = valid_config();
        cfg.knowledge.api_url = Some("ws://bad".into());
        let issue = find_issue(&cfg.validate(), "knowledge.api_url").expect("expected error");
        assert_eq!(issue.severity, ConfigSeverity::Error);
    }

    #[test]
    fn config_error_display_format() {
        let err = ConfigError {
            severity: ConfigSeverity::Error,
            field: "server.port".into(),
            message: "port must be greater than 0".into(),
        };
        assert_eq!(format!("{err}"), "[ERROR] server.port: port must be greater than 0");
    }
}
