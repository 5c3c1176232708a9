//! Semantic metadata providers.
//!
//! A [`SemanticProvider`] supplies business metadata (descriptions, owners,
//! tags, glossary terms, lineage) that tool handlers use to enrich their
//! output. Providers compose: [`ProviderChain`] asks several in order, and
//! [`CachingProvider`] puts a TTL cache in front of any provider.

pub mod cache;
pub mod chain;
pub mod static_file;
pub mod types;

pub use cache::{CacheConfig, CacheStats, CachingProvider};
pub use chain::ProviderChain;
pub use static_file::StaticProvider;
pub use types::{
    ColumnContext, ColumnIdentifier, DataQuality, Deprecation, GlossaryTerm, LineageDirection,
    LineageEdge, LineageInfo, Owner, SearchFilter, SemanticError, SemanticResult, TableContext,
    TableIdentifier, TableSearchResult,
};

use async_trait::async_trait;
use std::collections::BTreeMap;

/// Source of business metadata.
///
/// Every lookup may return "not found" (`None`, or an empty collection)
/// without error. Errors are reserved for transport, auth and parse failures.
#[async_trait]
pub trait SemanticProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn get_table_context(&self, table: &TableIdentifier)
    -> SemanticResult<Option<TableContext>>;

    async fn get_column_context(
        &self,
        column: &ColumnIdentifier,
    ) -> SemanticResult<Option<ColumnContext>>;

    /// Contexts for every known column of a table, keyed by column name.
    async fn get_columns_context(
        &self,
        table: &TableIdentifier,
    ) -> SemanticResult<BTreeMap<String, ColumnContext>>;

    async fn get_lineage(
        &self,
        table: &TableIdentifier,
        direction: LineageDirection,
        max_depth: u32,
    ) -> SemanticResult<Option<LineageInfo>>;

    async fn get_glossary_term(&self, urn: &str) -> SemanticResult<Option<GlossaryTerm>>;

    async fn search_tables(&self, filter: &SearchFilter) -> SemanticResult<Vec<TableSearchResult>>;

    async fn close(&self) -> SemanticResult<()> {
        Ok(())
    }
}
