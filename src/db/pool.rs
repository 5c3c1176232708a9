//! Connection management.
//!
//! The [`ConnectionManager`] owns the configured set of named Trino endpoints
//! and lazily opens one shared [`Executor`] per name. Lookups take the shared
//! lock; construction takes the exclusive lock and re-checks the map first so
//! that concurrent callers never build two executors for the same name.

use crate::db::executor::{Executor, ExecutorFactory, TrinoClientFactory};
use crate::error::{TrinoError, TrinoResult};
use crate::models::{ConnectionConfig, ConnectionInfo, ManagerConfig};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub struct ConnectionManager {
    config: ManagerConfig,
    factory: Arc<dyn ExecutorFactory>,
    clients: RwLock<HashMap<String, Arc<dyn Executor>>>,
    closed: AtomicBool,
}

impl ConnectionManager {
    /// Create a manager that opens [`TrinoClient`](crate::db::TrinoClient)s.
    pub fn new(config: ManagerConfig) -> TrinoResult<Self> {
        Self::with_factory(config, Arc::new(TrinoClientFactory))
    }

    /// Create a manager with a custom executor factory.
    pub fn with_factory(
        config: ManagerConfig,
        factory: Arc<dyn ExecutorFactory>,
    ) -> TrinoResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            factory,
            clients: RwLock::new(HashMap::new()),
            closed: AtomicBool::new(false),
        })
    }

    pub fn default_name(&self) -> &str {
        &self.config.default_name
    }

    /// Map an empty name to the default connection.
    fn canonical<'a>(&'a self, name: &'a str) -> &'a str {
        if name.is_empty() {
            &self.config.default_name
        } else {
            name
        }
    }

    /// Resolve a connection name to a ready executor.
    ///
    /// An empty name selects the default connection. Construction failures
    /// are returned to the caller and not remembered, so the next call retries.
    pub async fn client(&self, name: &str) -> TrinoResult<Arc<dyn Executor>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TrinoError::Closed);
        }
        let name = self.canonical(name);

        {
            let clients = self.clients.read().await;
            if let Some(client) = clients.get(name) {
                return Ok(Arc::clone(client));
            }
        }

        let config = self
            .config
            .resolve(name)
            .ok_or_else(|| TrinoError::connection_not_found(name))?;

        let mut clients = self.clients.write().await;
        // Another caller may have opened it while we waited for the write lock
        if let Some(client) = clients.get(name) {
            return Ok(Arc::clone(client));
        }
        if self.closed.load(Ordering::Acquire) {
            return Err(TrinoError::Closed);
        }

        let client = self.factory.create(name, &config)?;
        info!(
            connection = %name,
            dsn = %config.redacted_dsn(),
            "Opened Trino connection"
        );
        clients.insert(name.to_string(), Arc::clone(&client));
        Ok(client)
    }

    /// Shorthand for `client("")`.
    pub async fn default_client(&self) -> TrinoResult<Arc<dyn Executor>> {
        self.client("").await
    }

    /// True for the default name (or empty) and for configured additional servers.
    pub fn has_connection(&self, name: &str) -> bool {
        name.is_empty()
            || name == self.config.default_name
            || self.config.additional.contains_key(name)
    }

    /// Connection names, default first, then additional servers in lexical order.
    pub fn connections(&self) -> Vec<String> {
        std::iter::once(self.config.default_name.clone())
            .chain(self.config.additional.keys().cloned())
            .collect()
    }

    /// Redacted connection details in the same order as [`connections`](Self::connections).
    pub fn connection_infos(&self) -> Vec<ConnectionInfo> {
        self.connections()
            .iter()
            .filter_map(|name| {
                self.config
                    .resolve(name)
                    .map(|config| config.info(name, name == &self.config.default_name))
            })
            .collect()
    }

    /// Resolved configuration for a name, if configured.
    pub fn config_for(&self, name: &str) -> Option<ConnectionConfig> {
        self.config.resolve(self.canonical(name))
    }

    /// Number of executors opened so far.
    pub async fn open_count(&self) -> usize {
        self.clients.read().await.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Close every opened executor and forget it.
    ///
    /// Idempotent. All executors are closed even if some fail; the first
    /// error is returned. Calls to [`client`](Self::client) made afterwards
    /// fail with [`TrinoError::Closed`].
    pub async fn close(&self) -> TrinoResult<()> {
        self.closed.store(true, Ordering::Release);
        let drained: Vec<(String, Arc<dyn Executor>)> = {
            let mut clients = self.clients.write().await;
            clients.drain().collect()
        };

        let mut first_error = None;
        for (name, client) in drained {
            debug!(connection = %name, "Closing connection");
            if let Err(e) = client.close().await {
                warn!(connection = %name, error = %e, "Failed to close connection");
                first_error.get_or_insert(e);
            }
        }
        info!("All connections closed");

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("default_name", &self.config.default_name)
            .field("connections", &self.connections())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ExplainType, PartialConnectionConfig, QueryOptions, QueryResult, TableRef, TableSchema,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    struct NullExecutor {
        fail_close: bool,
    }

    #[async_trait]
    impl Executor for NullExecutor {
        async fn query(&self, _sql: &str, _options: QueryOptions) -> TrinoResult<QueryResult> {
            Ok(QueryResult::default())
        }
        async fn explain(&self, _sql: &str, _plan_type: ExplainType) -> TrinoResult<String> {
            Ok(String::new())
        }
        async fn list_catalogs(&self) -> TrinoResult<Vec<String>> {
            Ok(Vec::new())
        }
        async fn list_schemas(&self, _catalog: &str) -> TrinoResult<Vec<String>> {
            Ok(Vec::new())
        }
        async fn list_tables(&self, _catalog: &str, _schema: &str) -> TrinoResult<Vec<String>> {
            Ok(Vec::new())
        }
        async fn describe_table(&self, table: &TableRef) -> TrinoResult<TableSchema> {
            Ok(TableSchema::new(table.clone(), Vec::new()))
        }
        async fn close(&self) -> TrinoResult<()> {
            if self.fail_close {
                Err(TrinoError::internal("close failed"))
            } else {
                Ok(())
            }
        }
    }

    #[derive(Default)]
    struct RecordingFactory {
        created: Mutex<Vec<String>>,
        fail_first: AtomicUsize,
    }

    impl ExecutorFactory for RecordingFactory {
        fn create(&self, name: &str, config: &ConnectionConfig) -> TrinoResult<Arc<dyn Executor>> {
            config.validate()?;
            if self.fail_first.load(Ordering::SeqCst) > 0 {
                self.fail_first.fetch_sub(1, Ordering::SeqCst);
                return Err(TrinoError::connection("boom", "retry"));
            }
            self.created.lock().unwrap().push(name.to_string());
            Ok(Arc::new(NullExecutor {
                fail_close: name == "flaky",
            }))
        }
    }

    fn manager_config() -> ManagerConfig {
        ManagerConfig::new(ConnectionConfig::new("localhost", "admin"))
            .with_additional(
                "staging",
                PartialConnectionConfig {
                    host: Some("staging.internal".to_string()),
                    ..Default::default()
                },
            )
            .with_additional(
                "broken",
                PartialConnectionConfig {
                    user: Some(String::new()),
                    ..Default::default()
                },
            )
    }

    fn manager(factory: Arc<RecordingFactory>) -> ConnectionManager {
        ConnectionManager::with_factory(manager_config(), factory).unwrap()
    }

    #[tokio::test]
    async fn test_empty_name_is_default() {
        let factory = Arc::new(RecordingFactory::default());
        let manager = manager(factory.clone());

        manager.client("").await.unwrap();
        manager.default_client().await.unwrap();
        manager.client("default").await.unwrap();

        assert_eq!(*factory.created.lock().unwrap(), vec!["default".to_string()]);
        assert_eq!(manager.open_count().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_connection_names_key() {
        let manager = manager(Arc::new(RecordingFactory::default()));
        let err = manager.client("warehouse").await.err().unwrap();
        assert!(matches!(err, TrinoError::ConnectionNotFound { .. }));
        assert!(err.to_string().contains("warehouse"));
    }

    #[tokio::test]
    async fn test_validation_happens_at_client_construction() {
        let manager = manager(Arc::new(RecordingFactory::default()));
        let err = manager.client("broken").await.err().unwrap();
        assert_eq!(err.to_string(), "user is required");
    }

    #[tokio::test]
    async fn test_construction_errors_are_not_cached() {
        let factory = Arc::new(RecordingFactory::default());
        factory.fail_first.store(1, Ordering::SeqCst);
        let manager = manager(factory.clone());

        assert!(manager.client("staging").await.is_err());
        assert!(manager.client("staging").await.is_ok());
        assert_eq!(factory.created.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_has_connection() {
        let manager = manager(Arc::new(RecordingFactory::default()));
        assert!(manager.has_connection(""));
        assert!(manager.has_connection("default"));
        assert!(manager.has_connection("staging"));
        assert!(!manager.has_connection("prod"));
    }

    #[test]
    fn test_connections_default_first() {
        let manager = manager(Arc::new(RecordingFactory::default()));
        assert_eq!(manager.connections(), vec!["default", "broken", "staging"]);

        let infos = manager.connection_infos();
        assert_eq!(infos.len(), 3);
        assert!(infos[0].is_default);
        assert!(infos[1..].iter().all(|i| !i.is_default));
        assert_eq!(infos[2].host, "staging.internal");
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_fails_fast_afterwards() {
        let factory = Arc::new(RecordingFactory::default());
        let manager = manager(factory);
        manager.client("").await.unwrap();

        manager.close().await.unwrap();
        manager.close().await.unwrap();
        assert_eq!(manager.open_count().await, 0);
        assert!(matches!(manager.client("").await, Err(TrinoError::Closed)));
    }

    #[tokio::test]
    async fn test_close_returns_first_error_but_closes_all() {
        let config = manager_config().with_additional("flaky", PartialConnectionConfig::default());
        let manager =
            ConnectionManager::with_factory(config, Arc::new(RecordingFactory::default())).unwrap();
        manager.client("").await.unwrap();
        manager.client("flaky").await.unwrap();

        let err = manager.close().await.unwrap_err();
        assert!(err.to_string().contains("close failed"));
        assert_eq!(manager.open_count().await, 0);
    }

    #[test]
    fn test_rejects_additional_named_default() {
        let config = ManagerConfig::new(ConnectionConfig::new("localhost", "admin"))
            .with_additional("default", PartialConnectionConfig::default());
        assert!(ConnectionManager::new(config).is_err());
    }
}
