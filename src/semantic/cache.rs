//! TTL and capacity bounded cache in front of a semantic provider.

use super::{
    ColumnContext, ColumnIdentifier, GlossaryTerm, LineageDirection, LineageInfo, SearchFilter,
    SemanticError, SemanticProvider, SemanticResult, TableContext, TableIdentifier,
    TableSearchResult,
};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::debug;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 10_000;
pub const DEFAULT_ERROR_TTL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub max_entries: usize,
    /// Store provider errors too, for `error_ttl`
    pub cache_errors: bool,
    pub error_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_CACHE_TTL,
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            cache_errors: false,
            error_ttl: DEFAULT_ERROR_TTL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub active_entries: usize,
    pub expired_entries: usize,
    pub max_entries: usize,
}

#[derive(Debug, Clone)]
enum CachedValue {
    Table(Option<TableContext>),
    Column(Option<ColumnContext>),
    Columns(BTreeMap<String, ColumnContext>),
    Lineage(Option<LineageInfo>),
    Glossary(Option<GlossaryTerm>),
}

#[derive(Debug, Clone)]
enum Payload {
    Value(CachedValue),
    Error(SemanticError),
}

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: Payload,
    expires_at: Instant,
}

/// Wraps a provider and caches every read except `search_tables`.
pub struct CachingProvider {
    name: String,
    inner: Arc<dyn SemanticProvider>,
    config: CacheConfig,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl CachingProvider {
    pub fn new(inner: Arc<dyn SemanticProvider>, config: CacheConfig) -> Self {
        let config = CacheConfig {
            max_entries: config.max_entries.max(1),
            ..config
        };
        Self {
            name: format!("cached({})", inner.name()),
            inner,
            config,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let expired_entries = entries.values().filter(|e| e.expires_at <= now).count();
        CacheStats {
            active_entries: entries.len() - expired_entries,
            expired_entries,
            max_entries: self.config.max_entries,
        }
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    fn lookup(&self, key: &str) -> Option<Payload> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.payload.clone())
    }

    fn store(&self, key: String, payload: Payload, ttl: Duration) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if !entries.contains_key(&key) && entries.len() >= self.config.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.expires_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                debug!(key = %oldest, "Evicting semantic cache entry");
                entries.remove(&oldest);
            }
        }
        entries.insert(
            key,
            CacheEntry {
                payload,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    async fn cached<T, F>(
        &self,
        key: String,
        fetch: F,
        wrap: fn(T) -> CachedValue,
        unwrap: fn(CachedValue) -> Option<T>,
    ) -> SemanticResult<T>
    where
        T: Clone,
        F: Future<Output = SemanticResult<T>>,
    {
        match self.lookup(&key) {
            Some(Payload::Value(value)) => {
                if let Some(value) = unwrap(value) {
                    return Ok(value);
                }
            }
            Some(Payload::Error(e)) => return Err(e),
            None => {}
        }

        match fetch.await {
            Ok(value) => {
                self.store(key, Payload::Value(wrap(value.clone())), self.config.ttl);
                Ok(value)
            }
            Err(e) => {
                if self.config.cache_errors {
                    self.store(key, Payload::Error(e.clone()), self.config.error_ttl);
                }
                Err(e)
            }
        }
    }
}

#[async_trait]
impl SemanticProvider for CachingProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_table_context(
        &self,
        table: &TableIdentifier,
    ) -> SemanticResult<Option<TableContext>> {
        self.cached(
            format!("table:{}", table.cache_key()),
            self.inner.get_table_context(table),
            CachedValue::Table,
            |v| match v {
                CachedValue::Table(v) => Some(v),
                _ => None,
            },
        )
        .await
    }

    async fn get_column_context(
        &self,
        column: &ColumnIdentifier,
    ) -> SemanticResult<Option<ColumnContext>> {
        self.cached(
            format!("column:{}", column.cache_key()),
            self.inner.get_column_context(column),
            CachedValue::Column,
            |v| match v {
                CachedValue::Column(v) => Some(v),
                _ => None,
            },
        )
        .await
    }

    async fn get_columns_context(
        &self,
        table: &TableIdentifier,
    ) -> SemanticResult<BTreeMap<String, ColumnContext>> {
        self.cached(
            format!("columns:{}", table.cache_key()),
            self.inner.get_columns_context(table),
            CachedValue::Columns,
            |v| match v {
                CachedValue::Columns(v) => Some(v),
                _ => None,
            },
        )
        .await
    }

    async fn get_lineage(
        &self,
        table: &TableIdentifier,
        direction: LineageDirection,
        max_depth: u32,
    ) -> SemanticResult<Option<LineageInfo>> {
        self.cached(
            format!("lineage:{}:{}:{}", table.cache_key(), direction, max_depth),
            self.inner.get_lineage(table, direction, max_depth),
            CachedValue::Lineage,
            |v| match v {
                CachedValue::Lineage(v) => Some(v),
                _ => None,
            },
        )
        .await
    }

    async fn get_glossary_term(&self, urn: &str) -> SemanticResult<Option<GlossaryTerm>> {
        self.cached(
            format!("glossary:{}", urn),
            self.inner.get_glossary_term(urn),
            CachedValue::Glossary,
            |v| match v {
                CachedValue::Glossary(v) => Some(v),
                _ => None,
            },
        )
        .await
    }

    async fn search_tables(&self, filter: &SearchFilter) -> SemanticResult<Vec<TableSearchResult>> {
        self.inner.search_tables(filter).await
    }

    async fn close(&self) -> SemanticResult<()> {
        self.clear();
        self.inner.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl, Duration::from_secs(300));
        assert_eq!(config.max_entries, 10_000);
        assert!(!config.cache_errors);
        assert_eq!(config.error_ttl, Duration::from_secs(30));
    }
}
