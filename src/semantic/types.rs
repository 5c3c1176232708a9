//! Semantic metadata entities and errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Failure of a semantic lookup.
///
/// "Not found" is never an error; providers return `None` (or an empty
/// collection) for that.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SemanticError {
    #[error("semantic provider transport error: {0}")]
    Transport(String),

    #[error("semantic provider authentication failed: {0}")]
    Auth(String),

    #[error("semantic provider returned unparseable data: {0}")]
    Parse(String),

    #[error("semantic provider error: {0}")]
    Other(String),
}

pub type SemanticResult<T> = Result<T, SemanticError>;

/// Identifies a table, optionally scoped to a named connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableIdentifier {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,
    pub catalog: String,
    pub schema: String,
    pub table: String,
}

impl TableIdentifier {
    pub fn new(
        catalog: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            connection: None,
            catalog: catalog.into(),
            schema: schema.into(),
            table: table.into(),
        }
    }

    pub fn with_connection(mut self, connection: impl Into<String>) -> Self {
        let connection = connection.into();
        self.connection = (!connection.is_empty()).then_some(connection);
        self
    }

    /// Deterministic key fragment, distinct for every distinct identifier.
    ///
    /// Components are length-prefixed so that dots inside names cannot make
    /// two identifiers collide.
    pub fn cache_key(&self) -> String {
        let part = |s: &str| format!("{}:{}", s.len(), s);
        format!(
            "{}|{}.{}.{}",
            part(self.connection.as_deref().unwrap_or("")),
            part(&self.catalog),
            part(&self.schema),
            part(&self.table)
        )
    }

    /// True when both name the same table, ignoring case and connection scope
    /// when either side has none.
    pub fn matches(&self, other: &TableIdentifier) -> bool {
        let connection_ok = match (&self.connection, &other.connection) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        };
        connection_ok
            && self.catalog.eq_ignore_ascii_case(&other.catalog)
            && self.schema.eq_ignore_ascii_case(&other.schema)
            && self.table.eq_ignore_ascii_case(&other.table)
    }
}

impl fmt::Display for TableIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.catalog, self.schema, self.table)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnIdentifier {
    pub table: TableIdentifier,
    pub column: String,
}

impl ColumnIdentifier {
    pub fn new(table: TableIdentifier, column: impl Into<String>) -> Self {
        Self {
            table,
            column: column.into(),
        }
    }

    pub fn cache_key(&self) -> String {
        format!("{}#{}:{}", self.table.cache_key(), self.column.len(), self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Owner {
    pub name: String,
    /// e.g. "technical_owner", "business_owner"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deprecation {
    pub deprecated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decommission_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQuality {
    /// 0.0 - 1.0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked_at: Option<DateTime<Utc>>,
}

/// Business metadata for a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub owners: Vec<Owner>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub glossary_terms: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation: Option<Deprecation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<DataQuality>,
    #[serde(default)]
    pub custom_properties: BTreeMap<String, String>,
    /// Provider that produced this context
    #[serde(default)]
    pub source: String,
    #[serde(default = "Utc::now")]
    pub fetched_at: DateTime<Utc>,
}

impl TableContext {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            description: None,
            owners: Vec::new(),
            tags: Vec::new(),
            glossary_terms: Vec::new(),
            domain: None,
            deprecation: None,
            quality: None,
            custom_properties: BTreeMap::new(),
            source: source.into(),
            fetched_at: Utc::now(),
        }
    }

    pub fn is_deprecated(&self) -> bool {
        self.deprecation.as_ref().is_some_and(|d| d.deprecated)
    }
}

/// Business metadata for a column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub glossary_terms: Vec<String>,
    #[serde(default)]
    pub is_sensitive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitivity_level: Option<String>,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlossaryTerm {
    pub urn: String,
    pub name: String,
    #[serde(default)]
    pub definition: String,
    #[serde(default)]
    pub related_terms: Vec<String>,
    #[serde(default)]
    pub source: String,
}

/// Criteria for [`SemanticProvider::search_tables`](super::SemanticProvider::search_tables).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilter {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub catalog: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub include_deprecated: bool,
    /// 0 means provider default
    #[serde(default)]
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSearchResult {
    pub table: TableIdentifier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineageDirection {
    Upstream,
    Downstream,
}

impl fmt::Display for LineageDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upstream => f.write_str("upstream"),
            Self::Downstream => f.write_str("downstream"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageEdge {
    pub source: TableIdentifier,
    pub target: TableIdentifier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageInfo {
    pub table: TableIdentifier,
    pub direction: LineageDirection,
    pub edges: Vec<LineageEdge>,
    #[serde(default)]
    pub source: String,
}
