//! Schema introspection tools.
//!
//! This module implements `list_catalogs`, `list_schemas`, `list_tables` and
//! `describe_table`. The describe output is enriched from the semantic
//! provider when one is configured; enrichment never fails the call.

use crate::db::{ConnectionManager, Executor, with_deadline};
use crate::extensions::ToolContext;
use crate::models::query::SAMPLE_ROW_LIMIT;
use crate::models::{QueryOptions, QueryResult, TableRef};
use crate::semantic::{ColumnContext, SemanticProvider, TableContext, TableIdentifier};
use crate::tools::error::ToolError;
use crate::tools::format::{DescribedColumn, format_name_list, format_table_description, merge_columns};
use crate::tools::result::ToolResult;
use crate::tools::toolkit::ToolkitConfig;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListCatalogsInput {
    /// Connection name from trino_list_connections. Omit for the default.
    #[serde(default)]
    pub connection: String,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListSchemasInput {
    /// Catalog to list schemas from
    #[serde(default)]
    pub catalog: String,
    /// Connection name from trino_list_connections. Omit for the default.
    #[serde(default)]
    pub connection: String,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListTablesInput {
    #[serde(default)]
    pub catalog: String,
    #[serde(default)]
    pub schema: String,
    /// Case-insensitive name filter; `%` characters are ignored, e.g. `%user%`
    #[serde(default)]
    pub pattern: Option<String>,
    /// Connection name from trino_list_connections. Omit for the default.
    #[serde(default)]
    pub connection: String,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct DescribeTableInput {
    #[serde(default)]
    pub catalog: String,
    #[serde(default)]
    pub schema: String,
    #[serde(default)]
    pub table: String,
    /// Append up to 5 sample rows. Default: false
    #[serde(default)]
    pub include_sample: bool,
    /// Connection name from trino_list_connections. Omit for the default.
    #[serde(default)]
    pub connection: String,
}

/// Structured payload of the list tools.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct NameListOutput {
    pub names: Vec<String>,
    pub count: usize,
}

impl NameListOutput {
    fn new(names: Vec<String>) -> Self {
        Self {
            count: names.len(),
            names,
        }
    }
}

/// Structured payload of `describe_table`.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DescribeTableOutput {
    pub table: TableRef,
    pub columns: Vec<DescribedColumn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_row_count: Option<usize>,
}

/// Keep names containing `pattern` (case-insensitive) once `%` is stripped.
pub fn filter_by_pattern(names: Vec<String>, pattern: Option<&str>) -> Vec<String> {
    let needle = pattern.unwrap_or("").replace('%', "").to_lowercase();
    if needle.is_empty() {
        return names;
    }
    names
        .into_iter()
        .filter(|name| name.to_lowercase().contains(&needle))
        .collect()
}

fn require(value: &str, name: &'static str) -> Result<(), ToolError> {
    if value.trim().is_empty() {
        Err(ToolError::MissingParameter(name))
    } else {
        Ok(())
    }
}

/// Handler for the introspection tools.
pub struct SchemaToolHandler {
    manager: Arc<ConnectionManager>,
    semantic: Option<Arc<dyn SemanticProvider>>,
    config: ToolkitConfig,
}

impl SchemaToolHandler {
    pub fn new(
        manager: Arc<ConnectionManager>,
        semantic: Option<Arc<dyn SemanticProvider>>,
        config: ToolkitConfig,
    ) -> Self {
        Self {
            manager,
            semantic,
            config,
        }
    }

    pub async fn list_catalogs(
        &self,
        _ctx: &ToolContext,
        input: ListCatalogsInput,
    ) -> Result<ToolResult, ToolError> {
        let client = self.manager.client(&input.connection).await?;
        let catalogs = with_deadline(
            "list catalogs",
            self.config.default_timeout(),
            client.list_catalogs(),
        )
        .await
        .map_err(|e| ToolError::list("catalogs", e))?;

        info!(connection = %input.connection, count = catalogs.len(), "Listed catalogs");
        let text = format_name_list("Catalogs", "catalogs", &catalogs);
        Ok(ToolResult::success(text).with_structured(&NameListOutput::new(catalogs)))
    }

    pub async fn list_schemas(
        &self,
        _ctx: &ToolContext,
        input: ListSchemasInput,
    ) -> Result<ToolResult, ToolError> {
        require(&input.catalog, "catalog")?;
        let client = self.manager.client(&input.connection).await?;
        let schemas = with_deadline(
            "list schemas",
            self.config.default_timeout(),
            client.list_schemas(&input.catalog),
        )
        .await
        .map_err(|e| ToolError::list("schemas", e))?;

        info!(connection = %input.connection, catalog = %input.catalog, count = schemas.len(), "Listed schemas");
        let text = format_name_list(&format!("Schemas in `{}`", input.catalog), "schemas", &schemas);
        Ok(ToolResult::success(text).with_structured(&NameListOutput::new(schemas)))
    }

    pub async fn list_tables(
        &self,
        _ctx: &ToolContext,
        input: ListTablesInput,
    ) -> Result<ToolResult, ToolError> {
        require(&input.catalog, "catalog")?;
        require(&input.schema, "schema")?;
        let client = self.manager.client(&input.connection).await?;
        let tables = with_deadline(
            "list tables",
            self.config.default_timeout(),
            client.list_tables(&input.catalog, &input.schema),
        )
        .await
        .map_err(|e| ToolError::list("tables", e))?;
        let tables = filter_by_pattern(tables, input.pattern.as_deref());

        info!(
            connection = %input.connection,
            catalog = %input.catalog,
            schema = %input.schema,
            count = tables.len(),
            "Listed tables"
        );
        let text = format_name_list(
            &format!("Tables in `{}.{}`", input.catalog, input.schema),
            "tables",
            &tables,
        );
        Ok(ToolResult::success(text).with_structured(&NameListOutput::new(tables)))
    }

    pub async fn describe_table(
        &self,
        ctx: &ToolContext,
        input: DescribeTableInput,
    ) -> Result<ToolResult, ToolError> {
        require(&input.catalog, "catalog")?;
        require(&input.schema, "schema")?;
        require(&input.table, "table")?;

        let client = self.manager.client(&input.connection).await?;
        let table = TableRef::new(&input.catalog, &input.schema, &input.table);
        let timeout = self.config.default_timeout();

        let schema = with_deadline("describe table", timeout, client.describe_table(&table))
            .await
            .map_err(|e| ToolError::Describe(e.to_string()))?;

        let sample = if input.include_sample {
            self.sample_rows(client.as_ref(), &table, timeout).await
        } else {
            None
        };

        let identifier = TableIdentifier::new(&input.catalog, &input.schema, &input.table)
            .with_connection(&input.connection);
        let (context, column_contexts) = self.enrichment(&identifier, timeout).await;
        ctx.set("semantic_enriched", context.is_some() || !column_contexts.is_empty());

        let columns = merge_columns(&schema, &column_contexts);
        let text = format_table_description(&schema, context.as_ref(), &columns, sample.as_ref());
        let output = DescribeTableOutput {
            table,
            description: context.and_then(|c| c.description),
            sample_row_count: sample.as_ref().map(|s| s.rows.len()),
            columns,
        };
        Ok(ToolResult::success(text).with_structured(&output))
    }

    /// Opportunistic sample; any failure drops the section.
    async fn sample_rows(
        &self,
        client: &dyn Executor,
        table: &TableRef,
        timeout: Duration,
    ) -> Option<QueryResult> {
        let sql = format!("SELECT * FROM {} LIMIT {}", table.quoted(), SAMPLE_ROW_LIMIT);
        let options = QueryOptions {
            limit: SAMPLE_ROW_LIMIT,
            timeout,
        };
        match with_deadline("sample rows", timeout, client.query(&sql, options)).await {
            Ok(result) => Some(result),
            Err(e) => {
                debug!(table = %table, error = %e, "Sample query failed, omitting sample");
                None
            }
        }
    }

    /// Best-effort semantic lookups; errors degrade to no enrichment.
    async fn enrichment(
        &self,
        table: &TableIdentifier,
        timeout: Duration,
    ) -> (Option<TableContext>, BTreeMap<String, ColumnContext>) {
        let Some(provider) = &self.semantic else {
            return (None, BTreeMap::new());
        };

        let context = match tokio::time::timeout(timeout, provider.get_table_context(table)).await {
            Ok(Ok(context)) => context,
            Ok(Err(e)) => {
                warn!(table = %table, provider = provider.name(), error = %e, "Table context lookup failed");
                None
            }
            Err(_) => None,
        };
        let columns = match tokio::time::timeout(timeout, provider.get_columns_context(table)).await {
            Ok(Ok(columns)) => columns,
            Ok(Err(e)) => {
                warn!(table = %table, provider = provider.name(), error = %e, "Column context lookup failed");
                BTreeMap::new()
            }
            Err(_) => BTreeMap::new(),
        };
        (context, columns)
    }
}
