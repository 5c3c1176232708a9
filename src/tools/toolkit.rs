//! The toolkit: tool registry, per-tool overrides and dispatch.

use crate::db::ConnectionManager;
use crate::error::{TrinoError, TrinoResult};
use crate::extensions::{Extensions, MiddlewareChain, ToolContext};
use crate::models::{DEFAULT_QUERY_TIMEOUT_SECS, DEFAULT_ROW_LIMIT, MAX_QUERY_TIMEOUT_SECS, MAX_ROW_LIMIT};
use crate::semantic::SemanticProvider;
use crate::tools::connections::ConnectionsToolHandler;
use crate::tools::error::ToolError;
use crate::tools::explain::ExplainToolHandler;
use crate::tools::input::{ToolInput, input_schema};
use crate::tools::names::{ToolAnnotations, ToolIcon, ToolName};
use crate::tools::pipeline;
use crate::tools::progress::ProgressNotifier;
use crate::tools::query::QueryToolHandler;
use crate::tools::result::ToolResult;
use crate::tools::schema::SchemaToolHandler;
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Row limit and timeout knobs.
///
/// Values at or below zero fall back to the built-in defaults when the
/// toolkit is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ToolkitConfig {
    pub default_limit: i64,
    pub max_limit: i64,
    /// Seconds
    pub default_timeout: i64,
    /// Seconds
    pub max_timeout: i64,
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_ROW_LIMIT,
            max_limit: MAX_ROW_LIMIT,
            default_timeout: DEFAULT_QUERY_TIMEOUT_SECS,
            max_timeout: MAX_QUERY_TIMEOUT_SECS,
        }
    }
}

impl ToolkitConfig {
    /// Replace non-positive values with defaults and keep each default
    /// within its maximum.
    pub fn normalized(self) -> Self {
        let pick = |value: i64, fallback: i64| if value <= 0 { fallback } else { value };
        let max_limit = pick(self.max_limit, MAX_ROW_LIMIT);
        let max_timeout = pick(self.max_timeout, MAX_QUERY_TIMEOUT_SECS);
        Self {
            default_limit: pick(self.default_limit, DEFAULT_ROW_LIMIT).min(max_limit),
            max_limit,
            default_timeout: pick(self.default_timeout, DEFAULT_QUERY_TIMEOUT_SECS).min(max_timeout),
            max_timeout,
        }
    }

    /// Requested limit bounded to `[1, max_limit]`; missing or non-positive
    /// requests get `default_limit`.
    pub fn clamp_limit(&self, requested: Option<i64>) -> usize {
        let limit = match requested {
            Some(n) if n > 0 => n.min(self.max_limit),
            _ => self.default_limit,
        };
        limit.max(1) as usize
    }

    /// Requested timeout in seconds bounded to `max_timeout`; missing or
    /// non-positive requests get `default_timeout`.
    pub fn clamp_timeout(&self, requested_secs: Option<i64>) -> Duration {
        let secs = match requested_secs {
            Some(n) if n > 0 => n.min(self.max_timeout),
            _ => self.default_timeout,
        };
        Duration::from_secs(secs.max(0) as u64).max(Duration::from_millis(1))
    }

    pub fn default_timeout(&self) -> Duration {
        self.clamp_timeout(None)
    }
}

/// Everything an MCP binding needs to advertise one tool.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub tool: ToolName,
    /// e.g. `trino_query`
    pub name: String,
    pub title: String,
    pub description: String,
    pub annotations: ToolAnnotations,
    pub icons: Vec<ToolIcon>,
    pub input_schema: Map<String, JsonValue>,
}

pub struct ToolkitBuilder {
    manager: Arc<ConnectionManager>,
    config: ToolkitConfig,
    semantic: Option<Arc<dyn SemanticProvider>>,
    extensions: Extensions,
    descriptions: HashMap<ToolName, String>,
    annotations: HashMap<ToolName, ToolAnnotations>,
    icons: HashMap<ToolName, Vec<ToolIcon>>,
}

impl ToolkitBuilder {
    pub fn config(mut self, config: ToolkitConfig) -> Self {
        self.config = config;
        self
    }

    pub fn semantic_provider(mut self, provider: Arc<dyn SemanticProvider>) -> Self {
        self.semantic = Some(provider);
        self
    }

    pub fn extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn description(mut self, tool: ToolName, description: impl Into<String>) -> Self {
        self.descriptions.insert(tool, description.into());
        self
    }

    pub fn annotations(mut self, tool: ToolName, annotations: ToolAnnotations) -> Self {
        self.annotations.insert(tool, annotations);
        self
    }

    pub fn icons(mut self, tool: ToolName, icons: Vec<ToolIcon>) -> Self {
        self.icons.insert(tool, icons);
        self
    }

    pub fn build(self) -> Toolkit {
        let config = self.config.normalized();
        Toolkit {
            query: QueryToolHandler::new(Arc::clone(&self.manager), config),
            explain: ExplainToolHandler::new(Arc::clone(&self.manager), config),
            schema: SchemaToolHandler::new(Arc::clone(&self.manager), self.semantic.clone(), config),
            connections: ConnectionsToolHandler::new(Arc::clone(&self.manager)),
            manager: self.manager,
            config,
            semantic: self.semantic,
            extensions: self.extensions,
            descriptions: self.descriptions,
            annotations: self.annotations,
            icons: self.icons,
            registered: BTreeMap::new(),
        }
    }
}

/// Dispatches the eight Trino tools through the extension pipeline.
pub struct Toolkit {
    manager: Arc<ConnectionManager>,
    config: ToolkitConfig,
    semantic: Option<Arc<dyn SemanticProvider>>,
    pub(crate) extensions: Extensions,
    descriptions: HashMap<ToolName, String>,
    annotations: HashMap<ToolName, ToolAnnotations>,
    icons: HashMap<ToolName, Vec<ToolIcon>>,
    /// Registered tools with their per-registration middleware
    registered: BTreeMap<ToolName, MiddlewareChain>,
    query: QueryToolHandler,
    explain: ExplainToolHandler,
    schema: SchemaToolHandler,
    connections: ConnectionsToolHandler,
}

impl Toolkit {
    pub fn builder(manager: Arc<ConnectionManager>) -> ToolkitBuilder {
        ToolkitBuilder {
            manager,
            config: ToolkitConfig::default(),
            semantic: None,
            extensions: Extensions::default(),
            descriptions: HashMap::new(),
            annotations: HashMap::new(),
            icons: HashMap::new(),
        }
    }

    pub fn config(&self) -> &ToolkitConfig {
        &self.config
    }

    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Register every tool without extra middleware.
    pub fn register_all(&mut self) {
        for tool in ToolName::ALL {
            self.register(tool, MiddlewareChain::new());
        }
    }

    /// Register one tool. `middleware` runs innermost, around this tool only.
    /// Registering again replaces the previous registration.
    pub fn register(&mut self, tool: ToolName, middleware: MiddlewareChain) {
        self.registered.insert(tool, middleware);
    }

    pub fn is_registered(&self, tool: ToolName) -> bool {
        self.registered.contains_key(&tool)
    }

    pub fn registered_tools(&self) -> Vec<ToolName> {
        self.registered.keys().copied().collect()
    }

    pub fn description(&self, tool: ToolName) -> &str {
        self.descriptions
            .get(&tool)
            .map(String::as_str)
            .unwrap_or_else(|| tool.default_description())
    }

    pub fn annotations(&self, tool: ToolName) -> ToolAnnotations {
        self.annotations
            .get(&tool)
            .cloned()
            .unwrap_or_else(|| tool.default_annotations())
    }

    pub fn icons(&self, tool: ToolName) -> Vec<ToolIcon> {
        self.icons
            .get(&tool)
            .cloned()
            .unwrap_or_else(|| tool.default_icons())
    }

    /// Definitions of the registered tools, in [`ToolName`] order.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.registered
            .keys()
            .map(|&tool| ToolDefinition {
                tool,
                name: tool.mcp_name(),
                title: tool.title().to_string(),
                description: self.description(tool).to_string(),
                annotations: self.annotations(tool),
                icons: self.icons(tool),
                input_schema: input_schema(tool),
            })
            .collect()
    }

    /// Invoke a registered tool. Domain failures come back as error results.
    pub async fn call(
        &self,
        tool: ToolName,
        args: JsonValue,
        progress: Option<Arc<dyn ProgressNotifier>>,
    ) -> ToolResult {
        let Some(registration) = self.registered.get(&tool) else {
            return ToolResult::error(
                ToolError::Internal(format!("tool not registered: {}", tool)).to_string(),
            );
        };
        pipeline::run(self, tool, registration, args, progress).await
    }

    /// Route a decoded input to its handler.
    pub(crate) async fn dispatch(
        &self,
        ctx: &ToolContext,
        input: ToolInput,
    ) -> Result<ToolResult, ToolError> {
        let interceptors = &self.extensions.interceptors;
        match input {
            ToolInput::Query(input) => self.query.query(ctx, interceptors, input).await,
            ToolInput::Execute(input) => self.query.execute(ctx, interceptors, input).await,
            ToolInput::Explain(input) => self.explain.explain(ctx, interceptors, input).await,
            ToolInput::ListCatalogs(input) => self.schema.list_catalogs(ctx, input).await,
            ToolInput::ListSchemas(input) => self.schema.list_schemas(ctx, input).await,
            ToolInput::ListTables(input) => self.schema.list_tables(ctx, input).await,
            ToolInput::DescribeTable(input) => self.schema.describe_table(ctx, input).await,
            ToolInput::ListConnections(input) => self.connections.list_connections(input),
        }
    }

    /// Close the connection manager, then the semantic provider.
    ///
    /// Both are always attempted; the manager's error wins.
    pub async fn close(&self) -> TrinoResult<()> {
        let manager_result = self.manager.close().await;
        let semantic_result = match &self.semantic {
            Some(provider) => provider.close().await.map_err(|e| {
                warn!(provider = provider.name(), error = %e, "Failed to close semantic provider");
                TrinoError::internal(e.to_string())
            }),
            None => Ok(()),
        };
        info!("Toolkit closed");
        manager_result.and(semantic_result)
    }
}

impl std::fmt::Debug for Toolkit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolkit")
            .field("config", &self.config)
            .field("registered", &self.registered_tools())
            .field("semantic", &self.semantic.as_ref().map(|p| p.name().to_string()))
            .finish_non_exhaustive()
    }
}
