//! Built-in extensions, toggled by [`ExtensionsConfig`](super::ExtensionsConfig).

use super::{ExtensionError, Middleware, QueryInterceptor, ResultTransformer, ToolContext};
use crate::tools::error::ToolError;
use crate::tools::names::ToolName;
use crate::tools::result::ToolResult;
use crate::tools::sql_validator::is_write_sql;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

/// Rejects write statements in every SQL tool, `execute` included.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOnlyInterceptor;

#[async_trait]
impl QueryInterceptor for ReadOnlyInterceptor {
    fn name(&self) -> &str {
        "readonly"
    }

    async fn intercept(
        &self,
        _ctx: &ToolContext,
        sql: String,
        _tool: ToolName,
    ) -> Result<String, ExtensionError> {
        if is_write_sql(&sql) {
            return Err(ExtensionError::new(
                "write operations are disabled (read-only mode)",
            ));
        }
        Ok(sql)
    }
}

/// Logs every SQL statement and passes it through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryLogInterceptor;

#[async_trait]
impl QueryInterceptor for QueryLogInterceptor {
    fn name(&self) -> &str {
        "querylog"
    }

    async fn intercept(
        &self,
        ctx: &ToolContext,
        sql: String,
        tool: ToolName,
    ) -> Result<String, ExtensionError> {
        info!(
            tool = %tool,
            request_id = %ctx.request_id,
            connection = %ctx.connection(),
            sql = %sql,
            "SQL statement"
        );
        Ok(sql)
    }
}

/// Appends an actionable hint to error results.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorHintMiddleware;

impl ErrorHintMiddleware {
    /// Hint for an error message, if one applies.
    pub fn hint_for(message: &str) -> Option<&'static str> {
        let lower = message.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

        if has(&["read-only", "read-only mode"]) {
            None
        } else if has(&["unknown connection"]) {
            Some("Call trino_list_connections to see the configured connection names.")
        } else if has(&["does not exist", "table_not_found", "schema_not_found", "catalog_not_found", "cannot be resolved"]) {
            Some(
                "Use trino_list_catalogs, trino_list_schemas and trino_list_tables to find the exact names, \
                 and trino_describe_table to see column names.",
            )
        } else if has(&["syntax", "mismatched input", "extraneous input"]) {
            Some("Check the SQL syntax. Trino uses ANSI SQL; quote identifiers with double quotes.")
        } else if has(&["access denied", "permission", "authentication", "unauthorized"]) {
            Some("The configured Trino user lacks permission for this operation.")
        } else if has(&["timeout", "timed out", "exceeded"]) {
            Some("Narrow the query (filters, LIMIT) or raise timeout_seconds.")
        } else if has(&["connection failed", "cannot reach", "connection refused"]) {
            Some("The Trino coordinator is unreachable. Check the host, port and TLS settings.")
        } else {
            None
        }
    }
}

#[async_trait]
impl Middleware for ErrorHintMiddleware {
    fn name(&self) -> &str {
        "error_hints"
    }

    async fn after(
        &self,
        _ctx: &ToolContext,
        mut result: ToolResult,
        _error: Option<&ToolError>,
    ) -> Result<ToolResult, ExtensionError> {
        if result.is_error {
            if let Some(hint) = Self::hint_for(&result.text()) {
                result.append_text(&format!("\n\nHint: {}", hint));
            }
        }
        Ok(result)
    }
}

/// Logs start and finish of each tool.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingMiddleware;

#[async_trait]
impl Middleware for LoggingMiddleware {
    fn name(&self) -> &str {
        "logging"
    }

    async fn before(&self, ctx: &ToolContext) -> Result<(), ExtensionError> {
        info!(
            tool = %ctx.tool,
            request_id = %ctx.request_id,
            connection = %ctx.connection(),
            "Tool started"
        );
        Ok(())
    }

    async fn after(
        &self,
        ctx: &ToolContext,
        result: ToolResult,
        error: Option<&ToolError>,
    ) -> Result<ToolResult, ExtensionError> {
        let duration_ms = ctx.elapsed().as_millis() as u64;
        match error {
            Some(e) => warn!(
                tool = %ctx.tool,
                request_id = %ctx.request_id,
                duration_ms = duration_ms,
                kind = e.kind(),
                error = %e,
                "Tool failed"
            ),
            None => info!(
                tool = %ctx.tool,
                request_id = %ctx.request_id,
                duration_ms = duration_ms,
                is_error = result.is_error,
                "Tool finished"
            ),
        }
        Ok(result)
    }
}

/// Receives counters and timings from [`MetricsMiddleware`].
pub trait MetricsCollector: Send + Sync {
    fn increment(&self, name: &str);
    fn record_duration(&self, name: &str, duration: Duration);
}

/// Collector keeping everything in memory.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    counters: Mutex<HashMap<String, u64>>,
    durations: Mutex<HashMap<String, Vec<Duration>>>,
}

impl InMemoryMetrics {
    /// Copy of all counters.
    pub fn counters(&self) -> HashMap<String, u64> {
        self.counters
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Copy of all recorded durations.
    pub fn durations(&self) -> HashMap<String, Vec<Duration>> {
        self.durations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.counters
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .copied()
            .unwrap_or(0)
    }
}

impl MetricsCollector for InMemoryMetrics {
    fn increment(&self, name: &str) {
        *self
            .counters
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(name.to_string())
            .or_insert(0) += 1;
    }

    fn record_duration(&self, name: &str, duration: Duration) {
        self.durations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(name.to_string())
            .or_default()
            .push(duration);
    }
}

/// Records per-tool call and error counts plus durations.
///
/// Counter names: `tool.<name>.calls`, `tool.<name>.errors`,
/// `tool.<name>.errors.<kind>`; durations under `tool.<name>`.
pub struct MetricsMiddleware {
    collector: Arc<dyn MetricsCollector>,
}

impl MetricsMiddleware {
    pub fn new(collector: Arc<dyn MetricsCollector>) -> Self {
        Self { collector }
    }
}

#[async_trait]
impl Middleware for MetricsMiddleware {
    fn name(&self) -> &str {
        "metrics"
    }

    async fn after(
        &self,
        ctx: &ToolContext,
        result: ToolResult,
        error: Option<&ToolError>,
    ) -> Result<ToolResult, ExtensionError> {
        let base = format!("tool.{}", ctx.tool);
        self.collector.increment(&format!("{}.calls", base));
        if result.is_error {
            self.collector.increment(&format!("{}.errors", base));
        }
        if let Some(e) = error {
            self.collector
                .increment(&format!("{}.errors.{}", base, e.kind()));
        }
        self.collector.record_duration(&base, ctx.elapsed());
        Ok(result)
    }
}

/// Appends tool, connection and elapsed time to successful results.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionMetadataTransformer;

#[async_trait]
impl ResultTransformer for ExecutionMetadataTransformer {
    fn name(&self) -> &str {
        "metadata"
    }

    async fn transform(
        &self,
        ctx: &ToolContext,
        tool: ToolName,
        mut result: ToolResult,
    ) -> Result<ToolResult, ExtensionError> {
        let connection = match ctx.connection() {
            "" => "default",
            name => name,
        };
        result.append_text(&format!(
            "\n\n---\n*tool: {} | connection: {} | elapsed: {}ms*",
            tool.mcp_name(),
            connection,
            ctx.elapsed().as_millis()
        ));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(tool: ToolName) -> ToolContext {
        ToolContext::new(tool, json!({"connection": "staging"}))
    }

    #[tokio::test]
    async fn test_readonly_rejects_writes_in_execute() {
        let err = ReadOnlyInterceptor
            .intercept(&ctx(ToolName::Execute), "DELETE FROM t".into(), ToolName::Execute)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "write operations are disabled (read-only mode)");

        let ok = ReadOnlyInterceptor
            .intercept(&ctx(ToolName::Execute), "SELECT 1".into(), ToolName::Execute)
            .await
            .unwrap();
        assert_eq!(ok, "SELECT 1");
    }

    #[tokio::test]
    async fn test_querylog_passes_through() {
        let sql = QueryLogInterceptor
            .intercept(&ctx(ToolName::Query), "SELECT 1".into(), ToolName::Query)
            .await
            .unwrap();
        assert_eq!(sql, "SELECT 1");
    }

    #[test]
    fn test_hints() {
        assert!(
            ErrorHintMiddleware::hint_for("Query failed: line 1:15: Table 'a.b.c' does not exist")
                .unwrap()
                .contains("trino_list_tables")
        );
        assert!(
            ErrorHintMiddleware::hint_for("Query failed: line 1:1: mismatched input 'SELEC'")
                .unwrap()
                .contains("syntax")
        );
        assert!(
            ErrorHintMiddleware::hint_for("Connection error: unknown connection: x")
                .unwrap()
                .contains("trino_list_connections")
        );
        assert!(ErrorHintMiddleware::hint_for(&ToolError::ReadOnly.to_string()).is_none());
        assert!(ErrorHintMiddleware::hint_for("something odd").is_none());
    }

    #[tokio::test]
    async fn test_error_hint_only_touches_errors() {
        let c = ctx(ToolName::Query);
        let ok = ErrorHintMiddleware
            .after(&c, ToolResult::success("Table does not exist in docs"), None)
            .await
            .unwrap();
        assert_eq!(ok.text(), "Table does not exist in docs");

        let err = ErrorHintMiddleware
            .after(&c, ToolResult::error("Query failed: Table 'x' does not exist"), None)
            .await
            .unwrap();
        assert!(err.text().contains("\n\nHint: "));
    }

    #[tokio::test]
    async fn test_metrics_middleware_counts() {
        let metrics = Arc::new(InMemoryMetrics::default());
        let middleware = MetricsMiddleware::new(metrics.clone());
        let c = ctx(ToolName::Query);

        middleware.after(&c, ToolResult::success("ok"), None).await.unwrap();
        let failure = ToolError::Query("boom".into());
        middleware
            .after(&c, ToolResult::error(failure.to_string()), Some(&failure))
            .await
            .unwrap();

        assert_eq!(metrics.counter("tool.query.calls"), 2);
        assert_eq!(metrics.counter("tool.query.errors"), 1);
        assert_eq!(metrics.counter("tool.query.errors.execution"), 1);
        assert_eq!(metrics.durations()["tool.query"].len(), 2);
    }

    #[test]
    fn test_metrics_copies_are_detached() {
        let metrics = InMemoryMetrics::default();
        metrics.increment("a");
        let mut copy = metrics.counters();
        copy.insert("a".to_string(), 100);
        assert_eq!(metrics.counter("a"), 1);
    }

    #[tokio::test]
    async fn test_metadata_footer() {
        let result = ExecutionMetadataTransformer
            .transform(&ctx(ToolName::ListCatalogs), ToolName::ListCatalogs, ToolResult::success("- `hive`"))
            .await
            .unwrap();
        let text = result.text();
        assert!(text.starts_with("- `hive`\n\n---\n"));
        assert!(text.contains("tool: trino_list_catalogs"));
        assert!(text.contains("connection: staging"));
    }
}
