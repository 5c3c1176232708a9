//! Error types for the Trino MCP server.
//!
//! This module defines the driver and connection-level error type using
//! `thiserror`. Tool-level failures (the messages an agent sees) live in
//! [`crate::tools::error::ToolError`]; this type is what those wrap.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum TrinoError {
    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("{message}")]
    Query {
        message: String,
        /// Trino error name, e.g. "TABLE_NOT_FOUND"
        error_name: Option<String>,
    },

    #[error("Timeout: {operation} exceeded {elapsed_ms}ms")]
    Timeout { operation: String, elapsed_ms: u64 },

    #[error("unknown connection: {name}")]
    ConnectionNotFound { name: String },

    #[error("{message}")]
    InvalidConfig { message: String },

    #[error("connection manager is closed")]
    Closed,

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl TrinoError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a query error, optionally tagged with the Trino error name.
    pub fn query(message: impl Into<String>, error_name: Option<String>) -> Self {
        Self::Query {
            message: message.into(),
            error_name,
        }
    }

    pub fn timeout(operation: impl Into<String>, elapsed_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_ms,
        }
    }

    pub fn connection_not_found(name: impl Into<String>) -> Self {
        Self::ConnectionNotFound { name: name.into() }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout { .. })
    }
}

/// Convert reqwest errors raised while talking to the coordinator.
impl From<reqwest::Error> for TrinoError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TrinoError::timeout("HTTP request", 0)
        } else if err.is_connect() {
            TrinoError::connection(
                format!("Cannot reach Trino coordinator: {}", err),
                "Check that TRINO_HOST and TRINO_PORT point to a running coordinator",
            )
        } else if err.is_decode() {
            TrinoError::internal(format!("Failed to decode Trino response: {}", err))
        } else if let Some(status) = err.status() {
            match status.as_u16() {
                401 | 403 => TrinoError::connection(
                    format!("Authentication rejected ({})", status),
                    "Verify TRINO_USER and TRINO_PASSWORD",
                ),
                _ => TrinoError::connection(
                    format!("Unexpected HTTP status {}", status),
                    "Check the coordinator logs",
                ),
            }
        } else {
            TrinoError::connection(
                format!("HTTP error: {}", err),
                "Check network connectivity and TLS settings",
            )
        }
    }
}

/// Result type alias for driver and manager operations.
pub type TrinoResult<T> = Result<T, TrinoError>;

/// Build suggestion data as JSON value.
fn suggestion_data(suggestion: Option<&str>) -> Option<serde_json::Value> {
    suggestion.map(|s| serde_json::json!({ "suggestion": s }))
}

/// Convert TrinoError to MCP ErrorData.
///
/// Only used where a protocol-level error is unavoidable; tool failures are
/// reported as error results instead.
impl From<TrinoError> for rmcp::ErrorData {
    fn from(err: TrinoError) -> Self {
        match &err {
            TrinoError::InvalidConfig { .. } => {
                rmcp::ErrorData::invalid_params(err.to_string(), suggestion_data(err.suggestion()))
            }
            TrinoError::ConnectionNotFound { .. } => rmcp::ErrorData::resource_not_found(
                err.to_string(),
                suggestion_data(Some("Call trino_list_connections to see configured names")),
            ),
            TrinoError::Query { message, error_name } => {
                let msg = match error_name {
                    Some(name) => format!("{} ({})", message, name),
                    None => message.clone(),
                };
                rmcp::ErrorData::invalid_params(msg, None)
            }
            TrinoError::Timeout { .. } => rmcp::ErrorData::internal_error(
                err.to_string(),
                suggestion_data(Some("Consider increasing timeout_seconds")),
            ),
            TrinoError::Connection { suggestion, .. } => {
                rmcp::ErrorData::internal_error(err.to_string(), suggestion_data(Some(suggestion)))
            }
            TrinoError::Closed | TrinoError::Internal { .. } => {
                rmcp::ErrorData::internal_error(err.to_string(), None)
            }
        }
    }
}
