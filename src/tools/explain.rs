//! `explain` tool: execution plans without running the statement.

use crate::db::{ConnectionManager, with_deadline};
use crate::extensions::{InterceptorChain, ToolContext};
use crate::models::ExplainType;
use crate::tools::error::ToolError;
use crate::tools::names::ToolName;
use crate::tools::result::ToolResult;
use crate::tools::toolkit::ToolkitConfig;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Input for the explain tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ExplainInput {
    /// SQL statement to explain
    #[serde(default)]
    pub sql: String,
    /// Plan type: logical (default), distributed, io or validate
    #[serde(default, rename = "type")]
    pub plan_type: Option<String>,
    /// Connection name from trino_list_connections. Omit for the default.
    #[serde(default)]
    pub connection: String,
}

/// Structured payload of the explain tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ExplainOutput {
    pub plan: String,
    pub plan_type: ExplainType,
    pub sql: String,
    pub execution_time_ms: u64,
}

pub struct ExplainToolHandler {
    manager: Arc<ConnectionManager>,
    config: ToolkitConfig,
}

impl ExplainToolHandler {
    pub fn new(manager: Arc<ConnectionManager>, config: ToolkitConfig) -> Self {
        Self { manager, config }
    }

    /// Unknown plan types fall back to `logical`.
    pub async fn explain(
        &self,
        ctx: &ToolContext,
        interceptors: &InterceptorChain,
        input: ExplainInput,
    ) -> Result<ToolResult, ToolError> {
        if input.sql.trim().is_empty() {
            return Err(ToolError::MissingParameter("sql"));
        }
        let plan_type = ExplainType::parse_lenient(input.plan_type.as_deref());

        let sql = interceptors
            .apply(ctx, input.sql.clone(), ToolName::Explain)
            .await
            .map_err(|e| ToolError::Rejected(e.message))?;

        let client = self.manager.client(&input.connection).await?;
        let timeout = self.config.default_timeout();

        let plan = with_deadline("explain", timeout, client.explain(&sql, plan_type))
            .await
            .map_err(|e| ToolError::Explain(e.to_string()))?;

        let execution_time_ms = ctx.elapsed().as_millis() as u64;
        info!(
            connection = %input.connection,
            plan_type = %plan_type,
            duration_ms = execution_time_ms,
            "Explain executed"
        );

        let text = format!("## Execution Plan ({})\n\n```\n{}\n```", plan_type, plan.trim_end());
        let output = ExplainOutput {
            plan,
            plan_type,
            sql,
            execution_time_ms,
        };
        Ok(ToolResult::success(text).with_structured(&output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explain_input_type_field() {
        let input: ExplainInput =
            serde_json::from_str(r#"{"sql": "SELECT 1", "type": "io"}"#).unwrap();
        assert_eq!(input.plan_type.as_deref(), Some("io"));
        assert_eq!(
            ExplainType::parse_lenient(input.plan_type.as_deref()),
            ExplainType::Io
        );
    }

    #[test]
    fn test_explain_input_without_type() {
        let input: ExplainInput = serde_json::from_str(r#"{"sql": "SELECT 1"}"#).unwrap();
        assert_eq!(
            ExplainType::parse_lenient(input.plan_type.as_deref()),
            ExplainType::Logical
        );
    }
}
