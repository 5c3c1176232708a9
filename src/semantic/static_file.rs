//! Semantic provider backed by a YAML or JSON document.
//!
//! ```yaml
//! tables:
//!   - catalog: hive
//!     schema: sales
//!     table: orders
//!     description: One row per customer order
//!     owners: [{ name: data-eng, role: technical_owner }]
//!     tags: [core]
//!     columns:
//!       customer_email:
//!         description: Contact address
//!         tags: [pii]
//!         is_sensitive: true
//! glossary:
//!   - urn: "urn:glossary:revenue"
//!     name: Revenue
//!     definition: Gross order value
//! lineage:
//!   - source: { catalog: hive, schema: raw, table: orders }
//!     target: { catalog: hive, schema: sales, table: orders }
//! ```

use super::{
    ColumnContext, ColumnIdentifier, DataQuality, Deprecation, GlossaryTerm, LineageDirection,
    LineageEdge, LineageInfo, Owner, SearchFilter, SemanticError, SemanticProvider,
    SemanticResult, TableContext, TableIdentifier, TableSearchResult,
};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::path::Path;

const PROVIDER_NAME: &str = "static";
const DEFAULT_SEARCH_LIMIT: usize = 20;

#[derive(Debug, Clone, Default, Deserialize)]
struct StaticDocument {
    #[serde(default)]
    tables: Vec<StaticTable>,
    #[serde(default)]
    glossary: Vec<GlossaryTerm>,
    #[serde(default)]
    lineage: Vec<LineageEdge>,
}

#[derive(Debug, Clone, Deserialize)]
struct StaticTable {
    #[serde(default)]
    connection: Option<String>,
    catalog: String,
    schema: String,
    table: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    owners: Vec<Owner>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    glossary_terms: Vec<String>,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    deprecation: Option<Deprecation>,
    #[serde(default)]
    quality: Option<DataQuality>,
    #[serde(default)]
    custom_properties: BTreeMap<String, String>,
    #[serde(default)]
    columns: BTreeMap<String, ColumnContext>,
}

impl StaticTable {
    fn identifier(&self) -> TableIdentifier {
        TableIdentifier {
            connection: self.connection.clone(),
            catalog: self.catalog.clone(),
            schema: self.schema.clone(),
            table: self.table.clone(),
        }
    }

    fn context(&self) -> TableContext {
        TableContext {
            description: self.description.clone(),
            owners: self.owners.clone(),
            tags: self.tags.clone(),
            glossary_terms: self.glossary_terms.clone(),
            domain: self.domain.clone(),
            deprecation: self.deprecation.clone(),
            quality: self.quality.clone(),
            custom_properties: self.custom_properties.clone(),
            source: PROVIDER_NAME.to_string(),
            fetched_at: Utc::now(),
        }
    }

    fn is_deprecated(&self) -> bool {
        self.deprecation.as_ref().is_some_and(|d| d.deprecated)
    }

    fn matches_filter(&self, filter: &SearchFilter) -> bool {
        fn eq(expected: &Option<String>, actual: Option<&str>) -> bool {
            match expected.as_deref().filter(|s| !s.is_empty()) {
                Some(expected) => actual.is_some_and(|a| a.eq_ignore_ascii_case(expected)),
                None => true,
            }
        }

        if self.is_deprecated() && !filter.include_deprecated {
            return false;
        }
        if !eq(&filter.catalog, Some(&self.catalog))
            || !eq(&filter.schema, Some(&self.schema))
            || !eq(&filter.domain, self.domain.as_deref())
        {
            return false;
        }
        if let Some(owner) = filter.owner.as_deref().filter(|o| !o.is_empty()) {
            if !self.owners.iter().any(|o| o.name.eq_ignore_ascii_case(owner)) {
                return false;
            }
        }
        if !filter
            .tags
            .iter()
            .all(|tag| self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)))
        {
            return false;
        }

        let query = filter.query.trim().to_lowercase();
        query.is_empty()
            || self.table.to_lowercase().contains(&query)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&query))
            || self.tags.iter().any(|t| t.to_lowercase().contains(&query))
    }
}

/// Provider answering from an in-memory document.
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    document: StaticDocument,
}

impl StaticProvider {
    /// Parse a YAML document. JSON is valid YAML, so both are accepted.
    pub fn from_yaml(text: &str) -> SemanticResult<Self> {
        let document = serde_yaml::from_str(text)
            .map_err(|e| SemanticError::Parse(format!("invalid semantic metadata: {}", e)))?;
        Ok(Self { document })
    }

    pub fn from_file(path: impl AsRef<Path>) -> SemanticResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            SemanticError::Transport(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&text)
    }

    fn find(&self, table: &TableIdentifier) -> Option<&StaticTable> {
        self.document
            .tables
            .iter()
            .find(|t| t.identifier().matches(table))
    }

    fn walk_lineage(
        &self,
        start: &TableIdentifier,
        direction: LineageDirection,
        max_depth: u32,
    ) -> Vec<LineageEdge> {
        let mut edges = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut frontier = VecDeque::from([(start.clone(), 0u32)]);

        while let Some((node, depth)) = frontier.pop_front() {
            if depth >= max_depth.max(1) {
                continue;
            }
            for edge in &self.document.lineage {
                let (from, to) = match direction {
                    LineageDirection::Upstream => (&edge.target, &edge.source),
                    LineageDirection::Downstream => (&edge.source, &edge.target),
                };
                if !from.matches(&node) {
                    continue;
                }
                let key = format!("{}->{}", edge.source.cache_key(), edge.target.cache_key());
                if seen.insert(key) {
                    edges.push(edge.clone());
                    frontier.push_back((to.clone(), depth + 1));
                }
            }
        }
        edges
    }
}

#[async_trait]
impl SemanticProvider for StaticProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn get_table_context(
        &self,
        table: &TableIdentifier,
    ) -> SemanticResult<Option<TableContext>> {
        Ok(self.find(table).map(StaticTable::context))
    }

    async fn get_column_context(
        &self,
        column: &ColumnIdentifier,
    ) -> SemanticResult<Option<ColumnContext>> {
        Ok(self.find(&column.table).and_then(|t| {
            t.columns
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(&column.column))
                .map(|(_, ctx)| with_source(ctx.clone()))
        }))
    }

    async fn get_columns_context(
        &self,
        table: &TableIdentifier,
    ) -> SemanticResult<BTreeMap<String, ColumnContext>> {
        Ok(self
            .find(table)
            .map(|t| {
                t.columns
                    .iter()
                    .map(|(name, ctx)| (name.clone(), with_source(ctx.clone())))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_lineage(
        &self,
        table: &TableIdentifier,
        direction: LineageDirection,
        max_depth: u32,
    ) -> SemanticResult<Option<LineageInfo>> {
        let edges = self.walk_lineage(table, direction, max_depth);
        if edges.is_empty() {
            return Ok(None);
        }
        Ok(Some(LineageInfo {
            table: table.clone(),
            direction,
            edges,
            source: PROVIDER_NAME.to_string(),
        }))
    }

    async fn get_glossary_term(&self, urn: &str) -> SemanticResult<Option<GlossaryTerm>> {
        Ok(self
            .document
            .glossary
            .iter()
            .find(|t| t.urn == urn)
            .cloned()
            .map(|mut term| {
                term.source = PROVIDER_NAME.to_string();
                term
            }))
    }

    async fn search_tables(&self, filter: &SearchFilter) -> SemanticResult<Vec<TableSearchResult>> {
        let limit = if filter.limit == 0 {
            DEFAULT_SEARCH_LIMIT
        } else {
            filter.limit
        };
        Ok(self
            .document
            .tables
            .iter()
            .filter(|t| t.matches_filter(filter))
            .take(limit)
            .map(|t| TableSearchResult {
                table: t.identifier(),
                description: t.description.clone(),
                tags: t.tags.clone(),
                domain: t.domain.clone(),
            })
            .collect())
    }
}

fn with_source(mut ctx: ColumnContext) -> ColumnContext {
    if ctx.source.is_empty() {
        ctx.source = PROVIDER_NAME.to_string();
    }
    ctx
}
