//! Output formatting for tool results.
//!
//! Tabular results render as JSON, CSV or Markdown; `describe_table` has its
//! own Markdown renderer that merges semantic metadata into the column list.

use crate::models::{ColumnMetadata, QueryResult, QueryStats, Row, TableSchema};
use crate::semantic::{ColumnContext, TableContext};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Output format for `query` and `execute`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Indented JSON with columns, rows and stats (default)
    #[default]
    Json,
    /// Comma-separated values with a header line
    Csv,
    /// Markdown pipe table
    Markdown,
}

/// Structured payload of `query` and `execute`.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct QueryOutput {
    pub columns: Vec<ColumnMetadata>,
    pub rows: Vec<Row>,
    pub row_count: usize,
    pub stats: QueryStats,
}

impl From<&QueryResult> for QueryOutput {
    fn from(result: &QueryResult) -> Self {
        Self {
            columns: result.columns.clone(),
            rows: result.rows.clone(),
            row_count: result.rows.len(),
            stats: result.stats,
        }
    }
}

/// Render a result in the requested format.
pub fn format_result(result: &QueryResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => format_as_json(result),
        OutputFormat::Csv => format_as_csv(result),
        OutputFormat::Markdown => format_as_markdown(result),
    }
}

pub fn format_as_json(result: &QueryResult) -> String {
    serde_json::to_string_pretty(&QueryOutput::from(result))
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to encode result: {}\"}}", e))
}

/// Display form of a cell. Null renders as empty.
pub fn format_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(_) | JsonValue::Object(_) => {
            serde_json::to_string(value).unwrap_or_default()
        }
    }
}

fn cell<'a>(row: &'a Row, column: &ColumnMetadata) -> &'a JsonValue {
    row.get(&column.name).unwrap_or(&JsonValue::Null)
}

/// `N rows returned[, truncated at limit L], executed in Dms`
pub fn stats_line(stats: &QueryStats) -> String {
    let mut line = format!("{} rows returned", stats.row_count);
    if stats.truncated {
        line.push_str(&format!(", truncated at limit {}", stats.limit_applied));
    }
    line.push_str(&format!(", executed in {}ms", stats.duration_ms));
    line
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn format_as_csv(result: &QueryResult) -> String {
    let mut output = String::new();

    let header: Vec<String> = result.columns.iter().map(|c| csv_field(&c.name)).collect();
    output.push_str(&header.join(","));
    output.push('\n');

    for row in &result.rows {
        let fields: Vec<String> = result
            .columns
            .iter()
            .map(|col| csv_field(&format_value(cell(row, col))))
            .collect();
        output.push_str(&fields.join(","));
        output.push('\n');
    }

    output.push_str(&format!("\n# {}", stats_line(&result.stats)));
    output
}

fn markdown_cell(value: &str) -> String {
    value.replace('|', "\\|").replace(['\r', '\n'], " ")
}

fn markdown_table(columns: &[ColumnMetadata], rows: &[Row]) -> String {
    let mut output = String::new();

    let header: String = columns
        .iter()
        .map(|c| format!("| {} ", markdown_cell(&c.name)))
        .collect::<String>()
        + "|\n";
    output.push_str(&header);

    let sep: String = columns.iter().map(|_| "|---").collect::<String>() + "|\n";
    output.push_str(&sep);

    for row in rows {
        let row_str: String = columns
            .iter()
            .map(|col| format!("| {} ", markdown_cell(&format_value(cell(row, col)))))
            .collect::<String>()
            + "|\n";
        output.push_str(&row_str);
    }

    output
}

pub fn format_as_markdown(result: &QueryResult) -> String {
    if result.columns.is_empty() || result.rows.is_empty() {
        return "No results".to_string();
    }

    let mut output = markdown_table(&result.columns, &result.rows);
    output.push_str(&format!("\n*{}*", stats_line(&result.stats)));
    output
}

/// Bulleted list of names followed by a count line.
pub fn format_name_list(title: &str, noun: &str, names: &[String]) -> String {
    let mut output = format!("## {}\n\n", title);
    if names.is_empty() {
        output.push_str(&format!("No {} found.\n", noun));
    } else {
        for name in names {
            output.push_str(&format!("- `{}`\n", name));
        }
    }
    output.push_str(&format!("\n*{} {} found*", names.len(), noun));
    output
}

/// Column of a described table after merging semantic metadata.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct DescribedColumn {
    pub name: String,
    pub data_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub sensitive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
}

/// Merge a column definition with its semantic context: the semantic
/// description overrides the catalog comment, tags are unioned.
pub fn merge_columns(
    schema: &TableSchema,
    contexts: &BTreeMap<String, ColumnContext>,
) -> Vec<DescribedColumn> {
    schema
        .columns
        .iter()
        .map(|col| {
            let context = contexts.get(&col.name);
            let description = context
                .and_then(|c| c.description.clone())
                .filter(|d| !d.is_empty())
                .or_else(|| col.comment.clone().filter(|c| !c.is_empty()));
            let mut tags: Vec<String> = Vec::new();
            for tag in context.map(|c| c.tags.as_slice()).unwrap_or_default() {
                if !tags.contains(tag) {
                    tags.push(tag.clone());
                }
            }
            DescribedColumn {
                name: col.name.clone(),
                data_type: col.data_type.clone(),
                description,
                tags,
                sensitive: context.is_some_and(|c| c.is_sensitive),
                extra: col.extra.clone().filter(|e| !e.is_empty()),
            }
        })
        .collect()
}

fn format_table_context(context: &TableContext) -> String {
    let mut output = String::new();

    if let Some(deprecation) = context.deprecation.as_ref().filter(|d| d.deprecated) {
        output.push_str("> **DEPRECATED**");
        if let Some(note) = &deprecation.note {
            output.push_str(&format!(": {}", note));
        }
        if let Some(at) = deprecation.decommission_at {
            output.push_str(&format!(" (decommission {})", at.format("%Y-%m-%d")));
        }
        output.push_str("\n\n");
    }

    if let Some(description) = &context.description {
        output.push_str(description);
        output.push_str("\n\n");
    }

    let mut facts: Vec<String> = Vec::new();
    if let Some(domain) = &context.domain {
        facts.push(format!("- **Domain:** {}", domain));
    }
    if !context.owners.is_empty() {
        let owners: Vec<String> = context
            .owners
            .iter()
            .map(|o| match &o.role {
                Some(role) => format!("{} ({})", o.name, role),
                None => o.name.clone(),
            })
            .collect();
        facts.push(format!("- **Owners:** {}", owners.join(", ")));
    }
    if !context.tags.is_empty() {
        facts.push(format!("- **Tags:** {}", context.tags.join(", ")));
    }
    if !context.glossary_terms.is_empty() {
        facts.push(format!(
            "- **Glossary terms:** {}",
            context.glossary_terms.join(", ")
        ));
    }
    if let Some(quality) = &context.quality {
        let mut line = String::from("- **Data quality:**");
        if let Some(score) = quality.score {
            line.push_str(&format!(" {:.0}%", score * 100.0));
        }
        if let Some(summary) = &quality.summary {
            line.push_str(&format!(" {}", summary));
        }
        facts.push(line);
    }
    for (key, value) in &context.custom_properties {
        facts.push(format!("- **{}:** {}", key, value));
    }
    if !facts.is_empty() {
        output.push_str(&facts.join("\n"));
        output.push_str("\n\n");
    }

    output
}

/// Markdown for `describe_table`.
///
/// `context` and `columns` are the semantic enrichment (possibly absent);
/// `sample` is appended as its own section when present.
pub fn format_table_description(
    schema: &TableSchema,
    context: Option<&TableContext>,
    columns: &[DescribedColumn],
    sample: Option<&QueryResult>,
) -> String {
    let mut output = format!("## Table: `{}`\n\n", schema.table);

    if let Some(context) = context {
        output.push_str(&format_table_context(context));
    }

    let with_tags = columns.iter().any(|c| !c.tags.is_empty());
    output.push_str("### Columns\n\n");
    if with_tags {
        output.push_str("| Column | Type | Description | Tags |\n|---|---|---|---|\n");
    } else {
        output.push_str("| Column | Type | Description |\n|---|---|---|\n");
    }

    for col in columns {
        let mut description = col.description.clone().unwrap_or_default();
        if let Some(extra) = &col.extra {
            if !description.is_empty() {
                description.push(' ');
            }
            description.push_str(&format!("({})", extra));
        }
        if col.sensitive {
            if !description.is_empty() {
                description.push(' ');
            }
            description.push_str("**SENSITIVE**");
        }
        output.push_str(&format!(
            "| {} | {} | {} ",
            markdown_cell(&col.name),
            markdown_cell(&col.data_type),
            markdown_cell(&description)
        ));
        if with_tags {
            output.push_str(&format!("| {} ", markdown_cell(&col.tags.join(", "))));
        }
        output.push_str("|\n");
    }
    output.push_str(&format!("\n*{} columns*", columns.len()));

    if let Some(sample) = sample {
        output.push_str("\n\n### Sample Data\n\n");
        if sample.is_empty() {
            output.push_str("No rows.");
        } else {
            output.push_str(markdown_table(&sample.columns, &sample.rows).trim_end());
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColumnDefinition, TableRef};
    use serde_json::json;
    use std::time::Duration;

    fn result(data: Vec<Vec<JsonValue>>, limit: usize) -> QueryResult {
        QueryResult::from_positional(
            vec![
                ColumnMetadata::new("id", "bigint"),
                ColumnMetadata::new("name", "varchar"),
            ],
            data,
            limit,
            Duration::from_millis(42),
        )
    }

    #[test]
    fn test_json_output_has_row_count_and_stats() {
        let text = format_as_json(&result(vec![vec![json!(1), json!("a")]], 10));
        let value: JsonValue = serde_json::from_str(&text).unwrap();
        assert_eq!(value["row_count"], 1);
        assert_eq!(value["rows"][0]["name"], "a");
        assert_eq!(value["stats"]["limit_applied"], 10);
        assert!(text.contains("\n  "));
    }

    #[test]
    fn test_csv_quoting_and_footer() {
        let text = format_as_csv(&result(
            vec![
                vec![json!(1), json!("plain")],
                vec![json!(2), json!("a,b")],
                vec![json!(3), json!("say \"hi\"")],
                vec![json!(4), JsonValue::Null],
            ],
            10,
        ));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "id,name");
        assert_eq!(lines[1], "1,plain");
        assert_eq!(lines[2], "2,\"a,b\"");
        assert_eq!(lines[3], "3,\"say \"\"hi\"\"\"");
        assert_eq!(lines[4], "4,");
        assert_eq!(lines[5], "");
        assert_eq!(lines[6], "# 4 rows returned, executed in 42ms");
    }

    #[test]
    fn test_csv_footer_mentions_truncation() {
        let text = format_as_csv(&result(
            vec![vec![json!(1), json!("a")], vec![json!(2), json!("b")]],
            1,
        ));
        assert!(text.ends_with("# 1 rows returned, truncated at limit 1, executed in 42ms"));
    }

    #[test]
    fn test_markdown_table() {
        let text = format_as_markdown(&result(
            vec![vec![json!(1), JsonValue::Null], vec![json!(2), json!("x|y")]],
            10,
        ));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "| id | name |");
        assert_eq!(lines[1], "|---|---|");
        assert_eq!(lines[2], "| 1 |  |");
        assert_eq!(lines[3], "| 2 | x\\|y |");
        assert_eq!(text.lines().last().unwrap(), "*2 rows returned, executed in 42ms*");
    }

    #[test]
    fn test_markdown_empty() {
        assert_eq!(format_as_markdown(&result(vec![], 10)), "No results");
    }

    #[test]
    fn test_name_list() {
        let text = format_name_list("Tables in `c.s`", "tables", &["users".to_string()]);
        assert!(text.contains("- `users`"));
        assert!(text.ends_with("*1 tables found*"));
    }

    #[test]
    fn test_describe_merges_semantic_columns() {
        let schema = TableSchema::new(
            TableRef::new("c", "s", "users"),
            vec![
                ColumnDefinition::new("id", "bigint").with_comment("row id"),
                ColumnDefinition::new("email", "varchar").with_comment("old comment"),
            ],
        );
        let mut contexts = BTreeMap::new();
        contexts.insert(
            "email".to_string(),
            ColumnContext {
                description: Some("Customer email".to_string()),
                tags: vec!["pii".to_string(), "pii".to_string()],
                is_sensitive: true,
                ..ColumnContext::default()
            },
        );

        let columns = merge_columns(&schema, &contexts);
        assert_eq!(columns[0].description.as_deref(), Some("row id"));
        assert_eq!(columns[1].description.as_deref(), Some("Customer email"));
        assert_eq!(columns[1].tags, vec!["pii"]);

        let mut table = TableContext::new("static");
        table.description = Some("All registered users".to_string());
        table.owners.push(crate::semantic::Owner {
            name: "data-team".to_string(),
            role: None,
            email: None,
        });
        let text = format_table_description(&schema, Some(&table), &columns, None);
        assert!(text.starts_with("## Table: `c.s.users`"));
        assert!(text.contains("All registered users"));
        assert!(text.contains("**Owners:** data-team"));
        assert!(text.contains("| email | varchar | Customer email **SENSITIVE** | pii |"));
        assert!(!text.contains("Sample Data"));
    }

    #[test]
    fn test_describe_with_sample() {
        let schema = TableSchema::new(
            TableRef::new("c", "s", "t"),
            vec![ColumnDefinition::new("id", "bigint")],
        );
        let columns = merge_columns(&schema, &BTreeMap::new());
        let sample = QueryResult::from_positional(
            vec![ColumnMetadata::new("id", "bigint")],
            vec![vec![json!(7)]],
            5,
            Duration::ZERO,
        );
        let text = format_table_description(&schema, None, &columns, Some(&sample));
        assert!(text.contains("| id | bigint |  |"));
        assert!(text.contains("### Sample Data\n\n| id |\n|---|\n| 7 |"));
    }
}
