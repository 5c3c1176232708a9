//! Tool names, default descriptions, annotations and icons.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prefix of every tool name exposed over MCP.
pub const MCP_TOOL_PREFIX: &str = "trino_";

/// The eight tools exposed by the toolkit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    Query,
    Execute,
    Explain,
    ListCatalogs,
    ListSchemas,
    ListTables,
    DescribeTable,
    ListConnections,
}

impl ToolName {
    pub const ALL: [ToolName; 8] = [
        ToolName::Query,
        ToolName::Execute,
        ToolName::Explain,
        ToolName::ListCatalogs,
        ToolName::ListSchemas,
        ToolName::ListTables,
        ToolName::DescribeTable,
        ToolName::ListConnections,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Execute => "execute",
            Self::Explain => "explain",
            Self::ListCatalogs => "list_catalogs",
            Self::ListSchemas => "list_schemas",
            Self::ListTables => "list_tables",
            Self::DescribeTable => "describe_table",
            Self::ListConnections => "list_connections",
        }
    }

    /// Name exposed over MCP, e.g. `trino_query`.
    pub fn mcp_name(&self) -> String {
        format!("{}{}", MCP_TOOL_PREFIX, self.as_str())
    }

    /// Tools whose SQL passes through the interceptor chain.
    pub fn is_sql_tool(&self) -> bool {
        matches!(self, Self::Query | Self::Execute | Self::Explain)
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Query => "Run Query",
            Self::Execute => "Execute Statement",
            Self::Explain => "Explain Query",
            Self::ListCatalogs => "List Catalogs",
            Self::ListSchemas => "List Schemas",
            Self::ListTables => "List Tables",
            Self::DescribeTable => "Describe Table",
            Self::ListConnections => "List Connections",
        }
    }

    pub fn default_description(&self) -> &'static str {
        match self {
            Self::Query => {
                "Execute a read-only SQL query against Trino and return the results.\n\
                 Write statements (INSERT, UPDATE, DELETE, DDL) are rejected; use trino_execute for those.\n\
                 Output format: json (default), csv, or markdown. Results are capped by `limit`."
            }
            Self::Execute => {
                "Execute any SQL statement against Trino, including INSERT, UPDATE, DELETE and DDL.\n\
                 Use trino_query for read-only queries."
            }
            Self::Explain => {
                "Show the execution plan of a SQL statement without running it.\n\
                 type: logical (default), distributed, io, or validate."
            }
            Self::ListCatalogs => "List all catalogs available on the Trino cluster.",
            Self::ListSchemas => "List schemas in a catalog.",
            Self::ListTables => {
                "List tables in a schema. `pattern` filters names case-insensitively; `%` is ignored."
            }
            Self::DescribeTable => {
                "Describe a table's columns and types, with business metadata when available.\n\
                 Set include_sample=true to append up to 5 sample rows."
            }
            Self::ListConnections => {
                "List configured Trino connections. Pass a name as `connection` to target a specific cluster."
            }
        }
    }

    pub fn default_annotations(&self) -> ToolAnnotations {
        match self {
            Self::Execute => ToolAnnotations {
                title: Some(self.title().to_string()),
                read_only_hint: Some(false),
                destructive_hint: Some(true),
                idempotent_hint: Some(false),
                open_world_hint: Some(true),
            },
            Self::ListConnections => ToolAnnotations {
                title: Some(self.title().to_string()),
                read_only_hint: Some(true),
                destructive_hint: Some(false),
                idempotent_hint: Some(true),
                open_world_hint: Some(false),
            },
            _ => ToolAnnotations {
                title: Some(self.title().to_string()),
                read_only_hint: Some(true),
                destructive_hint: Some(false),
                idempotent_hint: Some(true),
                open_world_hint: Some(true),
            },
        }
    }

    pub fn default_icons(&self) -> Vec<ToolIcon> {
        vec![ToolIcon::svg(TRINO_ICON_SVG)]
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = String;

    /// Accepts both the bare name (`query`) and the MCP name (`trino_query`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bare = s.strip_prefix(MCP_TOOL_PREFIX).unwrap_or(s);
        ToolName::ALL
            .into_iter()
            .find(|t| t.as_str() == bare)
            .ok_or_else(|| format!("unknown tool: {}", s))
    }
}

/// Behavioral hints advertised with a tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAnnotations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only_hint: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destructive_hint: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotent_hint: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_world_hint: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolIcon {
    pub src: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl ToolIcon {
    pub fn svg(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            mime_type: Some("image/svg+xml".to_string()),
        }
    }
}

const TRINO_ICON_SVG: &str = "data:image/svg+xml;utf8,%3Csvg xmlns='http://www.w3.org/2000/svg' viewBox='0 0 24 24'%3E%3Ccircle cx='12' cy='12' r='10' fill='%23dd00a1'/%3E%3Cpath d='M7 9h10M12 9v8' stroke='white' stroke-width='2'/%3E%3C/svg%3E";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_names_round_trip_through_from_str() {
        for tool in ToolName::ALL {
            assert_eq!(tool.as_str().parse::<ToolName>().unwrap(), tool);
            assert_eq!(tool.mcp_name().parse::<ToolName>().unwrap(), tool);
        }
    }

    #[test]
    fn test_unknown_tool() {
        assert!("trino_drop_everything".parse::<ToolName>().is_err());
    }

    #[test]
    fn test_mcp_name_prefix() {
        assert_eq!(ToolName::ListConnections.mcp_name(), "trino_list_connections");
    }

    #[test]
    fn test_sql_tools() {
        let sql: Vec<_> = ToolName::ALL.into_iter().filter(|t| t.is_sql_tool()).collect();
        assert_eq!(sql, vec![ToolName::Query, ToolName::Execute, ToolName::Explain]);
    }

    #[test]
    fn test_only_execute_is_destructive() {
        for tool in ToolName::ALL {
            let annotations = tool.default_annotations();
            assert_eq!(
                annotations.destructive_hint,
                Some(tool == ToolName::Execute),
                "{}",
                tool
            );
        }
    }

    #[test]
    fn test_query_description_points_to_execute() {
        assert!(ToolName::Query.default_description().contains("trino_execute"));
    }
}
