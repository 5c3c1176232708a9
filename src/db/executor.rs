//! Executor contract consumed by the tool handlers.
//!
//! An [`Executor`] is the opaque SQL driver for one Trino endpoint. The
//! connection manager owns executors and hands them out as shared
//! `Arc<dyn Executor>` references; a single executor serves many concurrent
//! tool invocations.

use crate::db::trino::TrinoClient;
use crate::error::{TrinoError, TrinoResult};
use crate::models::{ConnectionConfig, ExplainType, QueryOptions, QueryResult, TableRef, TableSchema};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
pub trait Executor: Send + Sync {
    /// Run a statement, returning at most `options.limit` rows.
    ///
    /// `stats.truncated` is set when at least one more row was available.
    async fn query(&self, sql: &str, options: QueryOptions) -> TrinoResult<QueryResult>;

    /// Return the textual plan of `sql`.
    async fn explain(&self, sql: &str, plan_type: ExplainType) -> TrinoResult<String>;

    async fn list_catalogs(&self) -> TrinoResult<Vec<String>>;

    async fn list_schemas(&self, catalog: &str) -> TrinoResult<Vec<String>>;

    async fn list_tables(&self, catalog: &str, schema: &str) -> TrinoResult<Vec<String>>;

    async fn describe_table(&self, table: &TableRef) -> TrinoResult<TableSchema>;

    /// Release any resources held by the executor.
    async fn close(&self) -> TrinoResult<()> {
        Ok(())
    }
}

/// Builds executors for named connections.
///
/// Construction is synchronous and must not perform network I/O; the first
/// statement is what actually reaches the coordinator.
pub trait ExecutorFactory: Send + Sync {
    fn create(&self, name: &str, config: &ConnectionConfig) -> TrinoResult<Arc<dyn Executor>>;
}

/// Factory producing [`TrinoClient`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrinoClientFactory;

impl ExecutorFactory for TrinoClientFactory {
    fn create(&self, name: &str, config: &ConnectionConfig) -> TrinoResult<Arc<dyn Executor>> {
        Ok(Arc::new(TrinoClient::new(name, config)?))
    }
}

/// Run an executor call under `deadline`.
///
/// An expired deadline becomes [`TrinoError::Timeout`] carrying the deadline
/// itself, and the call's future is dropped, which cancels any statement it
/// had in flight.
pub async fn with_deadline<T>(
    operation: &str,
    deadline: Duration,
    fut: impl Future<Output = TrinoResult<T>>,
) -> TrinoResult<T> {
    tokio::time::timeout(deadline, fut)
        .await
        .unwrap_or_else(|_| Err(TrinoError::timeout(operation, deadline.as_millis() as u64)))
}
