//! Domain failures of a tool invocation.
//!
//! Every variant renders to the exact message an agent sees; the prefix
//! identifies the kind of failure. These never become protocol errors: the
//! pipeline turns them into error [`ToolResult`](super::ToolResult)s.

use crate::error::TrinoError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("{0} parameter is required")]
    MissingParameter(&'static str),

    #[error("internal error: invalid input type: {0}")]
    InvalidInput(String),

    #[error(
        "Write operations are not allowed in trino_query (read-only). \
         Use trino_execute for INSERT, UPDATE, DELETE, DDL and other write statements."
    )]
    ReadOnly,

    #[error("Query rejected: {0}")]
    Rejected(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("Explain failed: {0}")]
    Explain(String),

    #[error("Failed to list {what}: {message}")]
    List { what: &'static str, message: String },

    #[error("Failed to describe table: {0}")]
    Describe(String),

    #[error("middleware error: {0}")]
    Middleware(String),

    #[error("transformer error: {0}")]
    Transformer(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl ToolError {
    pub fn list(what: &'static str, err: impl ToString) -> Self {
        Self::List {
            what,
            message: err.to_string(),
        }
    }

    /// Coarse category, used for metrics and logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingParameter(_) => "input",
            Self::InvalidInput(_) | Self::Internal(_) => "internal",
            Self::ReadOnly | Self::Rejected(_) => "policy",
            Self::Connection(_) | Self::Cancelled => "connectivity",
            Self::Query(_)
            | Self::Execution(_)
            | Self::Explain(_)
            | Self::List { .. }
            | Self::Describe(_) => "execution",
            Self::Middleware(_) | Self::Transformer(_) => "pipeline",
        }
    }
}

impl From<TrinoError> for ToolError {
    /// Failures to obtain an executor. Statement failures are mapped by each
    /// handler to its own prefix.
    fn from(err: TrinoError) -> Self {
        Self::Connection(err.to_string())
    }
}
