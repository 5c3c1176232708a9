//! Ordered composition of semantic providers.

use super::{
    ColumnContext, ColumnIdentifier, GlossaryTerm, LineageDirection, LineageInfo, SearchFilter,
    SemanticProvider, SemanticResult, TableContext, TableIdentifier, TableSearchResult,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

/// Asks each provider in turn; the first non-empty answer wins.
///
/// Errors are returned immediately and never skipped over.
pub struct ProviderChain {
    name: String,
    providers: Vec<Arc<dyn SemanticProvider>>,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn SemanticProvider>>) -> Self {
        let name = format!(
            "chain({})",
            providers
                .iter()
                .map(|p| p.name().to_string())
                .collect::<Vec<_>>()
                .join(",")
        );
        Self { name, providers }
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[async_trait]
impl SemanticProvider for ProviderChain {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_table_context(
        &self,
        table: &TableIdentifier,
    ) -> SemanticResult<Option<TableContext>> {
        for provider in &self.providers {
            if let Some(context) = provider.get_table_context(table).await? {
                return Ok(Some(context));
            }
        }
        Ok(None)
    }

    async fn get_column_context(
        &self,
        column: &ColumnIdentifier,
    ) -> SemanticResult<Option<ColumnContext>> {
        for provider in &self.providers {
            if let Some(context) = provider.get_column_context(column).await? {
                return Ok(Some(context));
            }
        }
        Ok(None)
    }

    async fn get_columns_context(
        &self,
        table: &TableIdentifier,
    ) -> SemanticResult<BTreeMap<String, ColumnContext>> {
        for provider in &self.providers {
            let columns = provider.get_columns_context(table).await?;
            if !columns.is_empty() {
                return Ok(columns);
            }
        }
        Ok(BTreeMap::new())
    }

    async fn get_lineage(
        &self,
        table: &TableIdentifier,
        direction: LineageDirection,
        max_depth: u32,
    ) -> SemanticResult<Option<LineageInfo>> {
        for provider in &self.providers {
            if let Some(lineage) = provider.get_lineage(table, direction, max_depth).await? {
                return Ok(Some(lineage));
            }
        }
        Ok(None)
    }

    async fn get_glossary_term(&self, urn: &str) -> SemanticResult<Option<GlossaryTerm>> {
        for provider in &self.providers {
            if let Some(term) = provider.get_glossary_term(urn).await? {
                return Ok(Some(term));
            }
        }
        Ok(None)
    }

    async fn search_tables(&self, filter: &SearchFilter) -> SemanticResult<Vec<TableSearchResult>> {
        for provider in &self.providers {
            let results = provider.search_tables(filter).await?;
            if !results.is_empty() {
                return Ok(results);
            }
        }
        Ok(Vec::new())
    }

    /// Close every member in order; all are closed, the first error is returned.
    async fn close(&self) -> SemanticResult<()> {
        let mut first_error = None;
        for provider in &self.providers {
            if let Err(e) = provider.close().await {
                warn!(provider = %provider.name(), error = %e, "Failed to close semantic provider");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
