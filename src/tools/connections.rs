//! `list_connections` tool.

use crate::db::ConnectionManager;
use crate::models::ConnectionInfo;
use crate::tools::error::ToolError;
use crate::tools::result::ToolResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The tool takes no arguments.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListConnectionsInput {}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListConnectionsOutput {
    pub connections: Vec<ConnectionInfo>,
    pub count: usize,
}

pub struct ConnectionsToolHandler {
    manager: Arc<ConnectionManager>,
}

impl ConnectionsToolHandler {
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }

    /// Reads configuration only; no executor is opened.
    pub fn list_connections(&self, _input: ListConnectionsInput) -> Result<ToolResult, ToolError> {
        let connections = self.manager.connection_infos();

        let mut text = String::from("## Trino Connections\n\n");
        for info in &connections {
            text.push_str(&format!(
                "- `{}`{}: {}:{} as {}",
                info.name,
                if info.is_default { " (default)" } else { "" },
                info.host,
                info.port,
                info.user
            ));
            match (&info.catalog, &info.schema) {
                (Some(catalog), Some(schema)) => text.push_str(&format!(", {}.{}", catalog, schema)),
                (Some(catalog), None) => text.push_str(&format!(", {}", catalog)),
                _ => {}
            }
            if !info.ssl {
                text.push_str(", no TLS");
            }
            text.push('\n');
        }
        text.push_str(&format!(
            "\n*{} connections. Pass a name as `connection` to target it.*",
            connections.len()
        ));

        let output = ListConnectionsOutput {
            count: connections.len(),
            connections,
        };
        Ok(ToolResult::success(text).with_structured(&output))
    }
}
