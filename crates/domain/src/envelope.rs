//! The public error taxonomy and response envelope shapes returned to tool
//! callers. Numeric codes mirror the stable catalogue in
//! `original_source/db_mcp/errors.py`'s `ErrorCode` enum, grouped the way
//! `spec.md` §6 describes.
use serde::{Deserialize, Serialize};

use crate::error::Error;

macro_rules! error_codes {
    ($($name:ident = $val:expr),* $(,)?) => {
        /// Stable, symbolic error codes. The integer value is part of the
        /// external contract — never renumber an existing variant.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum ErrorCode {
            $($name),*
        }

        impl ErrorCode {
            pub fn code(self) -> i32 {
                match self {
                    $(ErrorCode::$name => $val),*
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $(ErrorCode::$name => stringify!($name)),*
                }
            }
        }
    };
}

error_codes! {
    // 1000-1099 generic
    Unknown = 1000,
    InvalidParams = 1001,
    MissingRequiredParam = 1002,
    Timeout = 1003,

    // 2000-2099 auth
    AuthError = 2000,

    // 3000-3099 db
    DbConnectionError = 3000,
    DbQueryError = 3001,
    DbTimeout = 3002,
    DbConfigError = 3003,
    DbEngineError = 3004,

    // 4000-4099 SQL safety
    SqlInjection = 4000,
    SqlInvalidStatement = 4001,
    SqlValidationError = 4002,
    SqlStructureError = 4003,

    // 5000-5099 configuration
    MissingDbConfig = 5000,
    InvalidDbConfig = 5001,

    // 6000-6099 controller
    AgentError = 6000,
    LlmError = 6001,
    ToolExecutionError = 6002,
    PlanError = 6003,
    ExecError = 6004,
    ReplanError = 6005,
    ClientCancelled = 6006,
}

/// Detail payload attached to an error envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolErrorDetail {
    pub code: i32,
    pub code_name: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// The public-surface error carried inside a [`ToolEnvelope::Error`] variant.
#[derive(Debug, Clone)]
pub struct ToolError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ToolError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), details: None }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn to_detail(&self) -> ToolErrorDetail {
        ToolErrorDetail {
            code: self.code.code(),
            code_name: self.code.name(),
            message: self.message.clone(),
            details: self.details.clone(),
        }
    }
}

impl From<Error> for ToolError {
    fn from(err: Error) -> Self {
        match err {
            Error::Timeout(msg) => ToolError::new(ErrorCode::Timeout, msg),
            Error::Db(msg) => {
                let lower = msg.to_lowercase();
                let code = if lower.contains("timeout") {
                    ErrorCode::DbTimeout
                } else if lower.contains("connection") {
                    ErrorCode::DbConnectionError
                } else {
                    ErrorCode::DbQueryError
                };
                ToolError::new(code, msg)
            }
            Error::Sql(msg) => ToolError::new(ErrorCode::SqlValidationError, msg),
            Error::Validation(msg) => ToolError::new(ErrorCode::InvalidParams, msg),
            Error::Config(msg) => ToolError::new(ErrorCode::InvalidDbConfig, msg),
            Error::Http(msg) => ToolError::new(ErrorCode::Unknown, msg),
            Error::Provider { provider, message } => {
                ToolError::new(ErrorCode::LlmError, format!("{provider}: {message}"))
            }
            other => ToolError::new(ErrorCode::Unknown, other.to_string()),
        }
    }
}

/// Uniform success/error JSON wrapper returned by every tool (`spec.md` §6).
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ToolEnvelope {
    Success {
        success: bool,
        data: Vec<serde_json::Value>,
        columns: Vec<String>,
        row_count: usize,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        execution_time: Option<u64>,
    },
    Error {
        success: bool,
        error: ToolErrorDetail,
        data: Vec<serde_json::Value>,
        columns: Vec<String>,
        row_count: usize,
    },
}

impl ToolEnvelope {
    pub fn success(
        data: Vec<serde_json::Value>,
        columns: Vec<String>,
        message: impl Into<String>,
    ) -> Self {
        let row_count = data.len();
        ToolEnvelope::Success {
            success: true,
            data,
            columns,
            row_count,
            message: message.into(),
            execution_time: None,
        }
    }

    pub fn success_text(message: impl Into<String>) -> Self {
        ToolEnvelope::Success {
            success: true,
            data: vec![],
            columns: vec![],
            row_count: 0,
            message: message.into(),
            execution_time: None,
        }
    }

    pub fn with_execution_time(mut self, ms: u64) -> Self {
        if let ToolEnvelope::Success { execution_time, .. } = &mut self {
            *execution_time = Some(ms);
        }
        self
    }

    pub fn error(err: ToolError) -> Self {
        ToolEnvelope::Error {
            success: false,
            error: err.to_detail(),
            data: vec![],
            columns: vec![],
            row_count: 0,
        }
    }

    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"success":false,"error":{"code":1000,"code_name":"Unknown","message":"envelope serialization failed"},"data":[],"columns":[],"row_count":0}"#.to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_round_trips_row_count() {
        let env = ToolEnvelope::success(
            vec![serde_json::json!({"cnt": 1})],
            vec!["cnt".to_string()],
            "ok",
        );
        let json = env.to_json_string();
        assert!(json.contains("\"row_count\":1"));
        assert!(json.contains("\"success\":true"));
    }

    #[test]
    fn error_envelope_carries_code_name() {
        let env = ToolEnvelope::error(ToolError::new(ErrorCode::SqlValidationError, "no writes"));
        let json = env.to_json_string();
        assert!(json.contains("\"code_name\":\"SqlValidationError\""));
        assert!(json.contains("\"success\":false"));
    }

    #[test]
    fn db_error_maps_timeout_substring() {
        let err: ToolError = Error::Db("connection timeout after 5s".into()).into();
        assert_eq!(err.code.code(), ErrorCode::DbTimeout.code());
    }
}
