//! MCP service implementation using rmcp.
//!
//! `TrinoService` implements [`ServerHandler`] by hand on top of the
//! [`Toolkit`]: tools are listed from the toolkit's registry and every call is
//! routed through the toolkit's pipeline, so middleware, interceptors and
//! transformers apply to MCP traffic exactly as they do to direct calls.

use crate::tools::error::ToolError;
use crate::tools::progress::ProgressNotifier;
use crate::tools::{ToolContent, ToolDefinition, ToolName, ToolResult, Toolkit};
use async_trait::async_trait;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, ListToolsResult,
    PaginatedRequestParam, ProgressNotificationParam, ProgressToken, ProtocolVersion,
    ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::{Peer, RequestContext};
use rmcp::{ErrorData as McpError, RoleServer, ServerHandler};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{debug, info};

const INSTRUCTIONS: &str = "Trino tools for exploring and querying Trino clusters.\n\
\n\
## Workflow\n\
1. `trino_list_catalogs`, then `trino_list_schemas` and `trino_list_tables` to find data\n\
2. `trino_describe_table` for columns, types and business metadata\n\
3. `trino_query` for read-only SQL; `trino_explain` to check a plan first\n\
4. `trino_execute` only for INSERT, UPDATE, DELETE and DDL\n\
\n\
## Multiple clusters\n\
Call `trino_list_connections` and pass a name as `connection`. Omit it for the default.\n\
\n\
## SQL\n\
Use fully qualified names (`catalog.schema.table`). Results are capped by `limit`.";

/// Forwards toolkit progress to the MCP client as progress notifications.
struct PeerProgress {
    peer: Peer<RoleServer>,
    token: ProgressToken,
}

#[async_trait]
impl ProgressNotifier for PeerProgress {
    async fn notify(&self, progress: f64, total: Option<f64>, message: Option<String>) {
        let param = ProgressNotificationParam {
            progress_token: self.token.clone(),
            progress,
            total,
            message,
        };
        if let Err(e) = self.peer.notify_progress(param).await {
            debug!(error = %e, "Dropped progress notification");
        }
    }
}

#[derive(Clone)]
pub struct TrinoService {
    toolkit: Arc<Toolkit>,
}

impl TrinoService {
    pub fn new(toolkit: Arc<Toolkit>) -> Self {
        Self { toolkit }
    }

    pub fn toolkit(&self) -> &Arc<Toolkit> {
        &self.toolkit
    }

    /// rmcp tool descriptors for the registered tools.
    pub fn tools(&self) -> Vec<Tool> {
        self.toolkit
            .tool_definitions()
            .into_iter()
            .map(to_mcp_tool)
            .collect()
    }

    /// Resolve an MCP tool name to a registered tool.
    pub fn resolve_tool(&self, name: &str) -> Result<ToolName, McpError> {
        let tool: ToolName = name
            .parse()
            .map_err(|e: String| McpError::invalid_params(e, None))?;
        if !self.toolkit.is_registered(tool) {
            return Err(McpError::invalid_params(
                format!("tool not registered: {}", name),
                None,
            ));
        }
        Ok(tool)
    }
}

fn to_mcp_tool(def: ToolDefinition) -> Tool {
    // Field sets differ between rmcp releases; go through the wire format.
    let annotations = serde_json::to_value(&def.annotations)
        .ok()
        .and_then(|v| serde_json::from_value(v).ok());
    let icons = serde_json::to_value(&def.icons)
        .ok()
        .and_then(|v| serde_json::from_value(v).ok());

    Tool {
        name: def.name.into(),
        title: Some(def.title),
        description: Some(def.description.into()),
        input_schema: Arc::new(def.input_schema),
        output_schema: None,
        annotations,
        icons,
        meta: None,
    }
}

/// Convert a toolkit result into rmcp's shape.
pub fn to_call_tool_result(result: ToolResult) -> CallToolResult {
    let content = result
        .content
        .into_iter()
        .map(|item| match item {
            ToolContent::Text { text } => Content::text(text),
        })
        .collect();
    CallToolResult {
        content,
        is_error: Some(result.is_error),
        meta: None,
        structured_content: result.structured_content,
    }
}

impl ServerHandler for TrinoService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "mcp-trino".to_owned(),
                title: Some("Trino MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: self.tools(),
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let tool = self.resolve_tool(request.name.as_ref())?;
        let args = request
            .arguments
            .map(JsonValue::Object)
            .unwrap_or(JsonValue::Null);

        let progress: Option<Arc<dyn ProgressNotifier>> =
            context.meta.get_progress_token().map(|token| {
                Arc::new(PeerProgress {
                    peer: context.peer.clone(),
                    token,
                }) as Arc<dyn ProgressNotifier>
            });

        let result = tokio::select! {
            result = self.toolkit.call(tool, args, progress) => result,
            _ = context.ct.cancelled() => {
                info!(tool = %tool, "Tool call cancelled by client");
                ToolResult::error(ToolError::Cancelled.to_string())
            }
        };
        Ok(to_call_tool_result(result))
    }
}
