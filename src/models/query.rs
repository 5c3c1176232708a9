//! Query-related data models.
//!
//! This module defines the result shape returned by an [`Executor`](crate::db::Executor)
//! and the knobs bounding a single statement.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::time::Duration;

/// Default row limit for query results.
pub const DEFAULT_ROW_LIMIT: i64 = 1000;

/// Maximum allowed row limit.
pub const MAX_ROW_LIMIT: i64 = 10000;

/// Default query timeout in seconds.
pub const DEFAULT_QUERY_TIMEOUT_SECS: i64 = 120;

/// Maximum query timeout in seconds.
pub const MAX_QUERY_TIMEOUT_SECS: i64 = 300;

/// Rows fetched for the `describe_table` sample.
pub const SAMPLE_ROW_LIMIT: usize = 5;

/// A row keyed by column name.
pub type Row = serde_json::Map<String, JsonValue>;

/// Column metadata from query results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnMetadata {
    pub name: String,
    /// Trino type signature, e.g. `varchar(255)` or `array(bigint)`
    pub type_name: String,
    pub nullable: bool,
}

impl ColumnMetadata {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            nullable: true,
        }
    }
}

/// Execution statistics attached to every result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct QueryStats {
    pub row_count: usize,
    pub duration_ms: u64,
    /// True when the executor saw at least one row past `limit_applied`
    pub truncated: bool,
    pub limit_applied: usize,
}

/// Result of a statement.
///
/// Every row carries a value (possibly null) for every column, and
/// `stats.row_count <= stats.limit_applied`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<ColumnMetadata>,
    pub rows: Vec<Row>,
    pub stats: QueryStats,
}

impl QueryResult {
    /// Build a result from positional rows, applying the row limit.
    ///
    /// Rows beyond `limit` are dropped and mark the result as truncated;
    /// short rows are padded with nulls.
    pub fn from_positional(
        columns: Vec<ColumnMetadata>,
        data: Vec<Vec<JsonValue>>,
        limit: usize,
        duration: Duration,
    ) -> Self {
        let truncated = data.len() > limit;
        let rows: Vec<Row> = data
            .into_iter()
            .take(limit)
            .map(|values| {
                let mut values = values.into_iter();
                columns
                    .iter()
                    .map(|col| (col.name.clone(), values.next().unwrap_or(JsonValue::Null)))
                    .collect()
            })
            .collect();

        Self {
            stats: QueryStats {
                row_count: rows.len(),
                duration_ms: duration.as_millis() as u64,
                truncated,
                limit_applied: limit,
            },
            columns,
            rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of the first column, as strings. Used for SHOW statements.
    pub fn first_column_strings(&self) -> Vec<String> {
        let Some(first) = self.columns.first() else {
            return Vec::new();
        };
        self.rows
            .iter()
            .filter_map(|row| match row.get(&first.name) {
                Some(JsonValue::String(s)) => Some(s.clone()),
                Some(JsonValue::Null) | None => None,
                Some(other) => Some(other.to_string()),
            })
            .collect()
    }
}

/// Bounds applied to a single statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    pub limit: usize,
    pub timeout: Duration,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_ROW_LIMIT as usize,
            timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS as u64),
        }
    }
}

/// Plan type for EXPLAIN.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExplainType {
    #[default]
    Logical,
    Distributed,
    Io,
    Validate,
}

impl ExplainType {
    /// Parse a user-supplied type. Unknown or empty values fall back to logical.
    pub fn parse_lenient(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("distributed") => Self::Distributed,
            Some("io") => Self::Io,
            Some("validate") => Self::Validate,
            _ => Self::Logical,
        }
    }

    /// Keyword used in `EXPLAIN (TYPE ...)`.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Logical => "LOGICAL",
            Self::Distributed => "DISTRIBUTED",
            Self::Io => "IO",
            Self::Validate => "VALIDATE",
        }
    }
}

impl fmt::Display for ExplainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}
