//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use mcp_trino::db::{ConnectionManager, Executor, ExecutorFactory};
use mcp_trino::error::{TrinoError, TrinoResult};
use mcp_trino::extensions::Extensions;
use mcp_trino::models::{
    ColumnDefinition, ColumnMetadata, ConnectionConfig, ExplainType, ManagerConfig,
    PartialConnectionConfig, QueryOptions, QueryResult, TableRef, TableSchema,
};
use mcp_trino::semantic::{
    ColumnContext, ColumnIdentifier, GlossaryTerm, LineageDirection, LineageInfo, SearchFilter,
    SemanticError, SemanticProvider, SemanticResult, TableContext, TableIdentifier,
    TableSearchResult,
};
use mcp_trino::tools::{ProgressNotifier, Toolkit};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Executor that records every call and answers from canned data.
#[derive(Default)]
pub struct MockExecutor {
    pub queries: Mutex<Vec<(String, QueryOptions)>>,
    pub explains: Mutex<Vec<(String, ExplainType)>>,
    pub tables: Vec<String>,
    /// Fail every `SELECT * FROM ...` sample query
    pub fail_sample: bool,
    /// Error returned by `query`, if set
    pub query_error: Option<String>,
    /// Delay before `query` answers
    pub delay: Option<Duration>,
    pub closed: AtomicUsize,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tables(tables: &[&str]) -> Self {
        Self {
            tables: tables.iter().map(|t| t.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn queries(&self) -> Vec<(String, QueryOptions)> {
        self.queries.lock().unwrap().clone()
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn explains(&self) -> Vec<(String, ExplainType)> {
        self.explains.lock().unwrap().clone()
    }
}

#[async_trait]
impl Executor for MockExecutor {
    async fn query(&self, sql: &str, options: QueryOptions) -> TrinoResult<QueryResult> {
        self.queries
            .lock()
            .unwrap()
            .push((sql.to_string(), options));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.query_error {
            return Err(TrinoError::query(message.clone(), None));
        }
        if self.fail_sample && sql.starts_with("SELECT * FROM") {
            return Err(TrinoError::query("Access Denied: Cannot select from table", None));
        }
        Ok(QueryResult::from_positional(
            vec![ColumnMetadata::new("_col0", "integer")],
            vec![vec![json!(1)]],
            options.limit,
            Duration::from_millis(3),
        ))
    }

    async fn explain(&self, sql: &str, plan_type: ExplainType) -> TrinoResult<String> {
        self.explains
            .lock()
            .unwrap()
            .push((sql.to_string(), plan_type));
        Ok("Fragment 0 [SINGLE]\n    Output[_col0]".to_string())
    }

    async fn list_catalogs(&self) -> TrinoResult<Vec<String>> {
        Ok(vec!["hive".to_string(), "system".to_string()])
    }

    async fn list_schemas(&self, _catalog: &str) -> TrinoResult<Vec<String>> {
        Ok(vec!["default".to_string(), "sales".to_string()])
    }

    async fn list_tables(&self, _catalog: &str, _schema: &str) -> TrinoResult<Vec<String>> {
        Ok(self.tables.clone())
    }

    async fn describe_table(&self, table: &TableRef) -> TrinoResult<TableSchema> {
        Ok(TableSchema::new(
            table.clone(),
            vec![
                ColumnDefinition::new("id", "bigint"),
                ColumnDefinition::new("email", "varchar").with_comment("login address"),
            ],
        ))
    }

    async fn close(&self) -> TrinoResult<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out one shared executor and counts constructions.
pub struct MockFactory {
    pub executor: Arc<MockExecutor>,
    pub created: AtomicUsize,
}

impl MockFactory {
    pub fn new(executor: Arc<MockExecutor>) -> Self {
        Self {
            executor,
            created: AtomicUsize::new(0),
        }
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl ExecutorFactory for MockFactory {
    fn create(&self, _name: &str, config: &ConnectionConfig) -> TrinoResult<Arc<dyn Executor>> {
        config.validate()?;
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::clone(&self.executor) as Arc<dyn Executor>)
    }
}

pub fn manager_config() -> ManagerConfig {
    ManagerConfig::new(ConnectionConfig::new("localhost", "tester")).with_additional(
        "staging",
        PartialConnectionConfig {
            host: Some("staging.example.com".to_string()),
            ..Default::default()
        },
    )
}

pub fn manager(executor: Arc<MockExecutor>) -> (Arc<ConnectionManager>, Arc<MockFactory>) {
    let factory = Arc::new(MockFactory::new(executor));
    let manager =
        ConnectionManager::with_factory(manager_config(), Arc::clone(&factory) as Arc<dyn ExecutorFactory>)
            .unwrap();
    (Arc::new(manager), factory)
}

/// Toolkit with every tool registered over `executor`.
pub fn toolkit_with(
    executor: Arc<MockExecutor>,
    extensions: Extensions,
    semantic: Option<Arc<dyn SemanticProvider>>,
) -> Toolkit {
    let (manager, _) = manager(executor);
    let mut builder = Toolkit::builder(manager).extensions(extensions);
    if let Some(provider) = semantic {
        builder = builder.semantic_provider(provider);
    }
    let mut toolkit = builder.build();
    toolkit.register_all();
    toolkit
}

pub fn toolkit(executor: Arc<MockExecutor>) -> Toolkit {
    toolkit_with(executor, Extensions::new(), None)
}

/// Progress sink that records every notification.
#[derive(Default)]
pub struct RecordingProgress {
    pub events: Mutex<Vec<(f64, Option<f64>, Option<String>)>>,
}

#[async_trait]
impl ProgressNotifier for RecordingProgress {
    async fn notify(&self, progress: f64, total: Option<f64>, message: Option<String>) {
        self.events.lock().unwrap().push((progress, total, message));
    }
}

/// Semantic provider with canned answers and call counters.
#[derive(Default)]
pub struct MockSemantic {
    pub name: String,
    pub tables: BTreeMap<String, TableContext>,
    pub columns: BTreeMap<String, BTreeMap<String, ColumnContext>>,
    pub fail: bool,
    pub fail_close: bool,
    pub table_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
    pub close_calls: AtomicUsize,
}

impl MockSemantic {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_table(mut self, table: &str, description: &str) -> Self {
        let mut context = TableContext::new(self.name.clone());
        context.description = Some(description.to_string());
        context.tags = vec!["core".to_string()];
        self.tables.insert(table.to_string(), context);
        self
    }

    pub fn with_column(mut self, table: &str, column: &str, context: ColumnContext) -> Self {
        self.columns
            .entry(table.to_string())
            .or_default()
            .insert(column.to_string(), context);
        self
    }

    pub fn failing(name: &str) -> Self {
        Self {
            fail: true,
            ..Self::named(name)
        }
    }

    pub fn table_calls(&self) -> usize {
        self.table_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> SemanticResult<()> {
        if self.fail {
            Err(SemanticError::Transport(format!("{} unavailable", self.name)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SemanticProvider for MockSemantic {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_table_context(
        &self,
        table: &TableIdentifier,
    ) -> SemanticResult<Option<TableContext>> {
        self.table_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.tables.get(&table.table).cloned())
    }

    async fn get_column_context(
        &self,
        column: &ColumnIdentifier,
    ) -> SemanticResult<Option<ColumnContext>> {
        self.check()?;
        Ok(self
            .columns
            .get(&column.table.table)
            .and_then(|cols| cols.get(&column.column))
            .cloned())
    }

    async fn get_columns_context(
        &self,
        table: &TableIdentifier,
    ) -> SemanticResult<BTreeMap<String, ColumnContext>> {
        self.check()?;
        Ok(self.columns.get(&table.table).cloned().unwrap_or_default())
    }

    async fn get_lineage(
        &self,
        _table: &TableIdentifier,
        _direction: LineageDirection,
        _max_depth: u32,
    ) -> SemanticResult<Option<LineageInfo>> {
        self.check()?;
        Ok(None)
    }

    async fn get_glossary_term(&self, _urn: &str) -> SemanticResult<Option<GlossaryTerm>> {
        self.check()?;
        Ok(None)
    }

    async fn search_tables(&self, _filter: &SearchFilter) -> SemanticResult<Vec<TableSearchResult>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(Vec::new())
    }

    async fn close(&self) -> SemanticResult<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            Err(SemanticError::Other(format!("{} close failed", self.name)))
        } else {
            Ok(())
        }
    }
}
