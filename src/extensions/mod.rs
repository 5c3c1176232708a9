//! Extension points around tool invocations.
//!
//! - [`Middleware`]: `before`/`after` hooks around every tool
//! - [`QueryInterceptor`]: rewrites or rejects SQL for `query`, `execute`, `explain`
//! - [`ResultTransformer`]: post-processes successful results
//!
//! Ordering for one call, outermost first: global middleware, per-tool
//! middleware, per-registration middleware, interceptors, handler. `after`
//! hooks unwind in reverse, then transformers run in insertion order.

pub mod builtin;
pub mod context;

pub use builtin::{
    ErrorHintMiddleware, ExecutionMetadataTransformer, InMemoryMetrics, LoggingMiddleware,
    MetricsCollector, MetricsMiddleware, QueryLogInterceptor, ReadOnlyInterceptor,
};
pub use context::ToolContext;

use crate::tools::error::ToolError;
use crate::tools::names::ToolName;
use crate::tools::result::ToolResult;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Failure raised by an extension hook.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ExtensionError {
    pub message: String,
}

impl ExtensionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait Middleware: Send + Sync {
    fn name(&self) -> &str;

    /// Runs before the handler. An error aborts the invocation.
    async fn before(&self, _ctx: &ToolContext) -> Result<(), ExtensionError> {
        Ok(())
    }

    /// Runs after the handler, whether it succeeded or not.
    ///
    /// `error` is the handler failure, if any; `result` is then the error
    /// result built from it.
    async fn after(
        &self,
        _ctx: &ToolContext,
        result: ToolResult,
        _error: Option<&ToolError>,
    ) -> Result<ToolResult, ExtensionError> {
        Ok(result)
    }
}

#[async_trait]
pub trait QueryInterceptor: Send + Sync {
    fn name(&self) -> &str;

    /// Return the SQL to run, or an error to reject the statement.
    async fn intercept(
        &self,
        ctx: &ToolContext,
        sql: String,
        tool: ToolName,
    ) -> Result<String, ExtensionError>;
}

#[async_trait]
pub trait ResultTransformer: Send + Sync {
    fn name(&self) -> &str;

    async fn transform(
        &self,
        ctx: &ToolContext,
        tool: ToolName,
        result: ToolResult,
    ) -> Result<ToolResult, ExtensionError>;
}

/// Ordered middleware list.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    items: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        self.items.push(middleware);
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Arc<dyn Middleware>> + ExactSizeIterator {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.items.iter().map(|m| m.name().to_string()).collect()
    }
}

impl From<Vec<Arc<dyn Middleware>>> for MiddlewareChain {
    fn from(items: Vec<Arc<dyn Middleware>>) -> Self {
        Self { items }
    }
}

/// Ordered interceptor list; each receives the previous one's output.
#[derive(Clone, Default)]
pub struct InterceptorChain {
    items: Vec<Arc<dyn QueryInterceptor>>,
}

impl InterceptorChain {
    pub fn push(&mut self, interceptor: Arc<dyn QueryInterceptor>) {
        self.items.push(interceptor);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Fold the chain over `sql`. Non-SQL tools pass through untouched.
    pub async fn apply(
        &self,
        ctx: &ToolContext,
        sql: String,
        tool: ToolName,
    ) -> Result<String, ExtensionError> {
        if !tool.is_sql_tool() {
            return Ok(sql);
        }
        let mut sql = sql;
        for interceptor in &self.items {
            sql = interceptor.intercept(ctx, sql, tool).await?;
        }
        Ok(sql)
    }
}

/// Ordered transformer list.
#[derive(Clone, Default)]
pub struct TransformerChain {
    items: Vec<Arc<dyn ResultTransformer>>,
}

impl TransformerChain {
    pub fn push(&mut self, transformer: Arc<dyn ResultTransformer>) {
        self.items.push(transformer);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub async fn apply(
        &self,
        ctx: &ToolContext,
        tool: ToolName,
        result: ToolResult,
    ) -> Result<ToolResult, ExtensionError> {
        let mut result = result;
        for transformer in &self.items {
            result = transformer.transform(ctx, tool, result).await?;
        }
        Ok(result)
    }
}

/// Every extension installed on a toolkit.
#[derive(Clone, Default)]
pub struct Extensions {
    pub middleware: MiddlewareChain,
    pub tool_middleware: HashMap<ToolName, MiddlewareChain>,
    pub interceptors: InterceptorChain,
    pub transformers: TransformerChain,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_middleware(&mut self, middleware: Arc<dyn Middleware>) {
        self.middleware.push(middleware);
    }

    pub fn add_tool_middleware(&mut self, tool: ToolName, middleware: Arc<dyn Middleware>) {
        self.tool_middleware.entry(tool).or_default().push(middleware);
    }

    pub fn add_interceptor(&mut self, interceptor: Arc<dyn QueryInterceptor>) {
        self.interceptors.push(interceptor);
    }

    pub fn add_transformer(&mut self, transformer: Arc<dyn ResultTransformer>) {
        self.transformers.push(transformer);
    }

    /// Global, then per-tool, then per-registration middleware.
    pub fn effective_middleware(
        &self,
        tool: ToolName,
        registration: &MiddlewareChain,
    ) -> MiddlewareChain {
        let items: Vec<Arc<dyn Middleware>> = self
            .middleware
            .iter()
            .chain(self.tool_middleware.get(&tool).into_iter().flat_map(|c| c.iter()))
            .chain(registration.iter())
            .cloned()
            .collect();
        items.into()
    }

    /// Install the built-in extensions selected by `config`.
    ///
    /// Returns the metrics collector when metrics are enabled.
    pub fn install_builtin(&mut self, config: &ExtensionsConfig) -> Option<Arc<InMemoryMetrics>> {
        if config.logging {
            self.add_middleware(Arc::new(LoggingMiddleware));
        }
        let metrics = config.metrics.then(|| Arc::new(InMemoryMetrics::default()));
        if let Some(metrics) = &metrics {
            let collector = Arc::clone(metrics) as Arc<dyn MetricsCollector>;
            self.add_middleware(Arc::new(MetricsMiddleware::new(collector)));
        }
        if config.errors {
            self.add_middleware(Arc::new(ErrorHintMiddleware));
        }
        if config.querylog {
            self.add_interceptor(Arc::new(QueryLogInterceptor));
        }
        if config.readonly {
            self.add_interceptor(Arc::new(ReadOnlyInterceptor));
        }
        if config.metadata {
            self.add_transformer(Arc::new(ExecutionMetadataTransformer));
        }
        metrics
    }
}

/// Toggles for the built-in extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExtensionsConfig {
    /// Reject write SQL in every SQL tool
    pub readonly: bool,
    /// Append actionable hints to error results
    pub errors: bool,
    pub logging: bool,
    pub metrics: bool,
    pub querylog: bool,
    /// Footer with tool, connection and elapsed time
    pub metadata: bool,
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self {
            readonly: true,
            errors: true,
            logging: false,
            metrics: false,
            querylog: false,
            metadata: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Named(&'static str);

    #[async_trait]
    impl Middleware for Named {
        fn name(&self) -> &str {
            self.0
        }
    }

    struct Suffix(&'static str);

    #[async_trait]
    impl QueryInterceptor for Suffix {
        fn name(&self) -> &str {
            "suffix"
        }
        async fn intercept(
            &self,
            _ctx: &ToolContext,
            sql: String,
            _tool: ToolName,
        ) -> Result<String, ExtensionError> {
            Ok(format!("{}{}", sql, self.0))
        }
    }

    #[test]
    fn test_effective_middleware_order() {
        let mut ext = Extensions::new();
        ext.add_middleware(Arc::new(Named("global")));
        ext.add_tool_middleware(ToolName::Query, Arc::new(Named("per-tool")));
        ext.add_tool_middleware(ToolName::Explain, Arc::new(Named("other-tool")));
        let registration: MiddlewareChain = vec![Arc::new(Named("registration")) as Arc<dyn Middleware>].into();

        let chain = ext.effective_middleware(ToolName::Query, &registration);
        assert_eq!(chain.names(), vec!["global", "per-tool", "registration"]);
    }

    #[tokio::test]
    async fn test_interceptor_fold() {
        let mut chain = InterceptorChain::default();
        chain.push(Arc::new(Suffix(" /* a */")));
        chain.push(Arc::new(Suffix(" /* b */")));
        let ctx = ToolContext::new(ToolName::Query, json!({}));

        let sql = chain.apply(&ctx, "SELECT 1".into(), ToolName::Query).await.unwrap();
        assert_eq!(sql, "SELECT 1 /* a */ /* b */");
    }

    #[tokio::test]
    async fn test_interceptors_skip_non_sql_tools() {
        let mut chain = InterceptorChain::default();
        chain.push(Arc::new(Suffix("!")));
        let ctx = ToolContext::new(ToolName::ListTables, json!({}));
        let out = chain.apply(&ctx, "x".into(), ToolName::ListTables).await.unwrap();
        assert_eq!(out, "x");
    }

    #[test]
    fn test_builtin_defaults() {
        let mut ext = Extensions::new();
        let metrics = ext.install_builtin(&ExtensionsConfig::default());
        assert!(metrics.is_none());
        assert_eq!(ext.middleware.names(), vec!["error_hints"]);
        assert_eq!(ext.interceptors.len(), 1);
        assert!(ext.transformers.is_empty());
    }

    #[test]
    fn test_builtin_all_enabled() {
        let config = ExtensionsConfig {
            readonly: true,
            errors: true,
            logging: true,
            metrics: true,
            querylog: true,
            metadata: true,
        };
        let mut ext = Extensions::new();
        assert!(ext.install_builtin(&config).is_some());
        assert_eq!(ext.middleware.names(), vec!["logging", "metrics", "error_hints"]);
        assert_eq!(ext.interceptors.len(), 2);
        assert_eq!(ext.transformers.len(), 1);
    }
}
