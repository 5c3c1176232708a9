//! Trino REST statement-protocol client.
//!
//! A statement is submitted with `POST /v1/statement`; the coordinator answers
//! with a page that may carry `columns`, `data`, an `error` object and a
//! `nextUri`. The client follows `nextUri` until it disappears, or until it has
//! seen one row past the requested limit, in which case the rest of the query
//! is cancelled with `DELETE nextUri`. A statement whose collecting future is
//! dropped (deadline, client cancellation) is cancelled the same way from a
//! spawned task.

use crate::db::executor::Executor;
use crate::error::{TrinoError, TrinoResult};
use crate::models::{
    ColumnDefinition, ColumnMetadata, ConnectionConfig, ExplainType, QueryOptions, QueryResult,
    TableRef, TableSchema, quote_identifier,
};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::time::Instant;
use tracing::{debug, warn};
use url::Url;

const STATEMENT_PATH: &str = "/v1/statement";

const HEADER_USER: &str = "x-trino-user";
const HEADER_SOURCE: &str = "x-trino-source";
const HEADER_CATALOG: &str = "x-trino-catalog";
const HEADER_SCHEMA: &str = "x-trino-schema";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatementPage {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    next_uri: Option<String>,
    #[serde(default)]
    columns: Option<Vec<PageColumn>>,
    #[serde(default)]
    data: Option<Vec<Vec<JsonValue>>>,
    #[serde(default)]
    error: Option<PageError>,
}

#[derive(Debug, Deserialize)]
struct PageColumn {
    name: String,
    #[serde(rename = "type")]
    type_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageError {
    message: String,
    #[serde(default)]
    error_name: Option<String>,
}

/// Accumulates pages of one statement.
#[derive(Debug, Default)]
struct PageCollector {
    columns: Option<Vec<ColumnMetadata>>,
    data: Vec<Vec<JsonValue>>,
}

impl PageCollector {
    /// Fold a page into the collector, returning its `nextUri`.
    fn absorb(&mut self, page: StatementPage) -> TrinoResult<Option<String>> {
        if let Some(error) = page.error {
            return Err(TrinoError::query(error.message, error.error_name));
        }
        if self.columns.is_none() {
            if let Some(columns) = page.columns {
                self.columns = Some(
                    columns
                        .into_iter()
                        .map(|c| ColumnMetadata::new(c.name, c.type_name))
                        .collect(),
                );
            }
        }
        if let Some(rows) = page.data {
            self.data.extend(rows);
        }
        Ok(page.next_uri)
    }

    /// True once more than `limit` rows have been seen.
    fn overflowed(&self, limit: Option<usize>) -> bool {
        limit.is_some_and(|limit| self.data.len() > limit)
    }
}

/// Holds the `nextUri` of a statement that has not finished.
///
/// Dropping it while armed spawns `DELETE nextUri` on the current runtime.
struct PendingStatement {
    http: reqwest::Client,
    connection: String,
    next: Option<Url>,
}

impl PendingStatement {
    fn new(http: &reqwest::Client, connection: &str) -> Self {
        Self {
            http: http.clone(),
            connection: connection.to_string(),
            next: None,
        }
    }

    fn track(&mut self, url: Url) {
        self.next = Some(url);
    }

    /// The statement finished or was cancelled explicitly.
    fn disarm(&mut self) {
        self.next = None;
    }
}

impl Drop for PendingStatement {
    fn drop(&mut self) {
        let Some(url) = self.next.take() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(connection = %self.connection, "No runtime to cancel abandoned statement");
            return;
        };
        debug!(connection = %self.connection, "Cancelling abandoned statement");
        let http = self.http.clone();
        let connection = std::mem::take(&mut self.connection);
        runtime.spawn(async move {
            if let Err(e) = http.delete(url).send().await {
                warn!(connection = %connection, error = %e, "Failed to cancel statement");
            }
        });
    }
}

/// [`Executor`] speaking the Trino HTTP protocol.
pub struct TrinoClient {
    name: String,
    http: reqwest::Client,
    statement_url: Url,
    config: ConnectionConfig,
}

impl TrinoClient {
    /// Validate the configuration and build the HTTP client.
    ///
    /// No request is made until the first statement.
    pub fn new(name: impl Into<String>, config: &ConnectionConfig) -> TrinoResult<Self> {
        config.validate()?;
        let statement_url = config
            .base_url()?
            .join(STATEMENT_PATH)
            .map_err(|e| TrinoError::invalid_config(format!("invalid statement URL: {}", e)))?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.ssl_verify)
            .default_headers(Self::session_headers(config)?)
            .build()
            .map_err(|e| {
                TrinoError::connection(
                    format!("Failed to build HTTP client: {}", e),
                    "Check TLS settings (TRINO_SSL, TRINO_SSL_VERIFY)",
                )
            })?;

        Ok(Self {
            name: name.into(),
            http,
            statement_url,
            config: config.clone(),
        })
    }

    /// Connection name this client was opened for.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn session_headers(config: &ConnectionConfig) -> TrinoResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let mut put = |key: &'static str, value: &str| -> TrinoResult<()> {
            let value = HeaderValue::from_str(value).map_err(|_| {
                TrinoError::invalid_config(format!("{} contains characters not valid in a header", key))
            })?;
            headers.insert(key, value);
            Ok(())
        };
        put(HEADER_USER, &config.user)?;
        put(HEADER_SOURCE, &config.source)?;
        if let Some(catalog) = config.catalog.as_deref().filter(|c| !c.is_empty()) {
            put(HEADER_CATALOG, catalog)?;
        }
        if let Some(schema) = config.schema.as_deref().filter(|s| !s.is_empty()) {
            put(HEADER_SCHEMA, schema)?;
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        Ok(headers)
    }

    async fn read_page(response: reqwest::Response) -> TrinoResult<StatementPage> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => TrinoError::connection(
                    format!("Authentication rejected ({})", status),
                    "Verify TRINO_USER and TRINO_PASSWORD",
                ),
                _ => TrinoError::connection(
                    format!("Trino returned HTTP {}: {}", status, body.trim()),
                    "Check the coordinator logs",
                ),
            });
        }
        Ok(response.json::<StatementPage>().await?)
    }

    fn resolve_next(&self, next_uri: &str) -> TrinoResult<Url> {
        Url::parse(next_uri)
            .or_else(|_| self.statement_url.join(next_uri))
            .map_err(|e| TrinoError::internal(format!("invalid nextUri '{}': {}", next_uri, e)))
    }

    /// Best-effort cancellation of the remainder of a statement.
    async fn cancel(&self, url: Url) {
        if let Err(e) = self.http.delete(url).send().await {
            warn!(connection = %self.name, error = %e, "Failed to cancel statement");
        }
    }

    /// Submit `sql` and collect pages, stopping after `limit + 1` rows.
    async fn run(&self, sql: &str, limit: Option<usize>) -> TrinoResult<PageCollector> {
        let mut request = self.http.post(self.statement_url.clone()).body(sql.to_string());
        if let Some(password) = self.config.password.as_deref().filter(|p| !p.is_empty()) {
            request = request.basic_auth(&self.config.user, Some(password));
        }

        let mut page = Self::read_page(request.send().await?).await?;
        if let Some(id) = page.id.as_deref() {
            debug!(connection = %self.name, query_id = %id, "Statement submitted");
        }

        let mut pending = PendingStatement::new(&self.http, &self.name);
        let mut collector = PageCollector::default();
        loop {
            let next_uri = match collector.absorb(page) {
                Ok(Some(next_uri)) => next_uri,
                Ok(None) => break,
                Err(e) => {
                    // A failed statement has nothing left to cancel.
                    pending.disarm();
                    return Err(e);
                }
            };
            let url = self.resolve_next(&next_uri)?;
            pending.track(url.clone());
            if collector.overflowed(limit) {
                self.cancel(url).await;
                break;
            }
            page = Self::read_page(self.http.get(url).send().await?).await?;
        }
        pending.disarm();
        Ok(collector)
    }

    /// Run a metadata statement and return its first column.
    async fn first_column(&self, sql: &str) -> TrinoResult<Vec<String>> {
        let collector = self.run(sql, None).await?;
        let columns = collector.columns.unwrap_or_default();
        let result = QueryResult::from_positional(
            columns,
            collector.data,
            usize::MAX,
            std::time::Duration::ZERO,
        );
        Ok(result.first_column_strings())
    }
}

impl std::fmt::Debug for TrinoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrinoClient")
            .field("name", &self.name)
            .field("statement_url", &self.statement_url.as_str())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Executor for TrinoClient {
    async fn query(&self, sql: &str, options: QueryOptions) -> TrinoResult<QueryResult> {
        let start = Instant::now();
        let collector = self.run(sql, Some(options.limit)).await?;
        Ok(QueryResult::from_positional(
            collector.columns.unwrap_or_default(),
            collector.data,
            options.limit,
            start.elapsed(),
        ))
    }

    async fn explain(&self, sql: &str, plan_type: ExplainType) -> TrinoResult<String> {
        let statement = format!("EXPLAIN (TYPE {}) {}", plan_type.as_sql(), sql);
        Ok(self.first_column(&statement).await?.join("\n"))
    }

    async fn list_catalogs(&self) -> TrinoResult<Vec<String>> {
        self.first_column("SHOW CATALOGS").await
    }

    async fn list_schemas(&self, catalog: &str) -> TrinoResult<Vec<String>> {
        self.first_column(&format!("SHOW SCHEMAS FROM {}", quote_identifier(catalog)))
            .await
    }

    async fn list_tables(&self, catalog: &str, schema: &str) -> TrinoResult<Vec<String>> {
        self.first_column(&format!(
            "SHOW TABLES FROM {}.{}",
            quote_identifier(catalog),
            quote_identifier(schema)
        ))
        .await
    }

    async fn describe_table(&self, table: &TableRef) -> TrinoResult<TableSchema> {
        let collector = self.run(&format!("DESCRIBE {}", table.quoted()), None).await?;
        Ok(TableSchema::new(
            table.clone(),
            describe_rows_to_columns(collector.data),
        ))
    }
}

/// Map `DESCRIBE` rows (`Column`, `Type`, `Extra`, `Comment`) to definitions.
fn describe_rows_to_columns(rows: Vec<Vec<JsonValue>>) -> Vec<ColumnDefinition> {
    fn text(value: Option<&JsonValue>) -> Option<String> {
        match value {
            Some(JsonValue::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }

    rows.iter()
        .filter_map(|row| {
            let name = text(row.first())?;
            let mut column = ColumnDefinition::new(name, text(row.get(1)).unwrap_or_default());
            column.extra = text(row.get(2));
            column.comment = text(row.get(3));
            Some(column)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(value: JsonValue) -> StatementPage {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_collector_follows_pages() {
        let mut collector = PageCollector::default();
        let next = collector
            .absorb(page(json!({
                "id": "q1",
                "nextUri": "http://localhost:8080/v1/statement/q1/1",
                "columns": [{"name": "id", "type": "bigint"}],
                "data": [[1], [2]]
            })))
            .unwrap();
        assert_eq!(next.as_deref(), Some("http://localhost:8080/v1/statement/q1/1"));

        let next = collector
            .absorb(page(json!({"id": "q1", "data": [[3]]})))
            .unwrap();
        assert!(next.is_none());
        assert_eq!(collector.data.len(), 3);
        assert_eq!(collector.columns.unwrap()[0].type_name, "bigint");
    }

    #[test]
    fn test_collector_reports_query_error() {
        let mut collector = PageCollector::default();
        let err = collector
            .absorb(page(json!({
                "id": "q1",
                "error": {
                    "message": "line 1:15: Table 'hive.default.nope' does not exist",
                    "errorName": "TABLE_NOT_FOUND",
                    "errorCode": 46
                }
            })))
            .unwrap_err();
        match err {
            TrinoError::Query { message, error_name } => {
                assert!(message.contains("does not exist"));
                assert_eq!(error_name.as_deref(), Some("TABLE_NOT_FOUND"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_collector_overflow_detection() {
        let mut collector = PageCollector::default();
        collector.data = vec![vec![json!(1)], vec![json!(2)]];
        assert!(collector.overflowed(Some(1)));
        assert!(!collector.overflowed(Some(2)));
        assert!(!collector.overflowed(None));
    }

    #[test]
    fn test_describe_rows_mapping() {
        let columns = describe_rows_to_columns(vec![
            vec![json!("id"), json!("bigint"), json!(""), json!("primary key")],
            vec![json!("ds"), json!("varchar"), json!("partition key"), JsonValue::Null],
        ]);
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].comment.as_deref(), Some("primary key"));
        assert!(columns[0].extra.is_none());
        assert_eq!(columns[1].extra.as_deref(), Some("partition key"));
        assert!(columns[1].comment.is_none());
    }

    #[test]
    fn test_client_statement_url() {
        let mut config = ConnectionConfig::new("trino.example.com", "analyst");
        config.port = 8443;
        let client = TrinoClient::new("default", &config).unwrap();
        assert_eq!(
            client.statement_url.as_str(),
            "https://trino.example.com:8443/v1/statement"
        );
        assert_eq!(client.name(), "default");
    }

    #[test]
    fn test_session_headers() {
        let mut config = ConnectionConfig::new("localhost", "analyst");
        config.catalog = Some("hive".to_string());
        let headers = TrinoClient::session_headers(&config).unwrap();
        assert_eq!(headers.get(HEADER_USER).unwrap(), "analyst");
        assert_eq!(headers.get(HEADER_SOURCE).unwrap(), "mcp-trino");
        assert_eq!(headers.get(HEADER_CATALOG).unwrap(), "hive");
        assert!(headers.get(HEADER_SCHEMA).is_none());
    }

    #[test]
    fn test_resolve_relative_next_uri() {
        let client = TrinoClient::new("default", &ConnectionConfig::new("localhost", "a")).unwrap();
        let url = client.resolve_next("/v1/statement/executing/q1/2").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/v1/statement/executing/q1/2");
    }
}
