//! `query` and `execute` tools.
//!
//! `query` refuses statements the classifier marks as writes and points the
//! agent at `trino_execute`; `execute` runs anything the interceptors let
//! through.

use crate::db::{ConnectionManager, with_deadline};
use crate::extensions::{InterceptorChain, ToolContext};
use crate::models::QueryOptions;
use crate::tools::error::ToolError;
use crate::tools::format::{OutputFormat, QueryOutput, format_result};
use crate::tools::names::ToolName;
use crate::tools::progress::{
    QUERY_PROGRESS_TOTAL, complete_message, executing_message, formatting_message,
};
use crate::tools::result::ToolResult;
use crate::tools::sql_validator::is_write_sql;
use crate::tools::toolkit::ToolkitConfig;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Input for `query` and `execute`.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct QueryInput {
    /// SQL statement to run
    #[serde(default)]
    pub sql: String,
    /// Maximum rows to return. Default: 1000, max: 10000
    #[serde(default)]
    pub limit: Option<i64>,
    /// Statement timeout in seconds. Default: 120, max: 300
    #[serde(default)]
    pub timeout_seconds: Option<i64>,
    /// Output format: json (default), csv or markdown
    #[serde(default)]
    pub format: OutputFormat,
    /// Connection name from trino_list_connections. Omit for the default.
    #[serde(default)]
    pub connection: String,
}

/// Handler for `query` and `execute`.
pub struct QueryToolHandler {
    manager: Arc<ConnectionManager>,
    config: ToolkitConfig,
}

impl QueryToolHandler {
    pub fn new(manager: Arc<ConnectionManager>, config: ToolkitConfig) -> Self {
        Self { manager, config }
    }

    /// Read-only statements only.
    pub async fn query(
        &self,
        ctx: &ToolContext,
        interceptors: &InterceptorChain,
        input: QueryInput,
    ) -> Result<ToolResult, ToolError> {
        if input.sql.trim().is_empty() {
            return Err(ToolError::MissingParameter("sql"));
        }
        if is_write_sql(&input.sql) {
            return Err(ToolError::ReadOnly);
        }

        let sql = interceptors
            .apply(ctx, input.sql.clone(), ToolName::Query)
            .await
            .map_err(|e| ToolError::Rejected(e.message))?;
        // A rewrite must not smuggle a write past the gate.
        if sql != input.sql && is_write_sql(&sql) {
            return Err(ToolError::ReadOnly);
        }

        self.run(ctx, &sql, &input, ToolError::Query).await
    }

    /// Any statement, subject only to the interceptors.
    pub async fn execute(
        &self,
        ctx: &ToolContext,
        interceptors: &InterceptorChain,
        input: QueryInput,
    ) -> Result<ToolResult, ToolError> {
        if input.sql.trim().is_empty() {
            return Err(ToolError::MissingParameter("sql"));
        }

        let sql = interceptors
            .apply(ctx, input.sql.clone(), ToolName::Execute)
            .await
            .map_err(|e| ToolError::Rejected(e.message))?;

        self.run(ctx, &sql, &input, ToolError::Execution).await
    }

    async fn run(
        &self,
        ctx: &ToolContext,
        sql: &str,
        input: &QueryInput,
        failure: fn(String) -> ToolError,
    ) -> Result<ToolResult, ToolError> {
        let options = QueryOptions {
            limit: self.config.clamp_limit(input.limit),
            timeout: self.config.clamp_timeout(input.timeout_seconds),
        };
        ctx.set("limit", options.limit);
        ctx.set("timeout_ms", options.timeout.as_millis() as u64);

        let client = self.manager.client(&input.connection).await?;

        ctx.report_progress(1.0, Some(QUERY_PROGRESS_TOTAL), executing_message())
            .await;
        debug!(tool = %ctx.tool, connection = %input.connection, limit = options.limit, "Running statement");

        let result = with_deadline("query", options.timeout, client.query(sql, options))
            .await
            .map_err(|e| failure(e.to_string()))?;

        ctx.report_progress(
            2.0,
            Some(QUERY_PROGRESS_TOTAL),
            formatting_message(result.rows.len()),
        )
        .await;

        info!(
            tool = %ctx.tool,
            connection = %input.connection,
            row_count = result.stats.row_count,
            truncated = result.stats.truncated,
            duration_ms = result.stats.duration_ms,
            "Statement executed"
        );

        let text = format_result(&result, input.format);
        let output = QueryOutput::from(&result);

        ctx.report_progress(3.0, Some(QUERY_PROGRESS_TOTAL), complete_message())
            .await;

        Ok(ToolResult::success(text).with_structured(&output))
    }
}
