//! Per-invocation context shared by hooks.

use crate::tools::names::ToolName;
use crate::tools::progress::ProgressNotifier;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// State of one tool invocation.
///
/// Created immediately before the `before` hooks run and dropped when the
/// invocation returns. The metadata map is the only mutable part and is
/// safe to use from concurrent hooks.
pub struct ToolContext {
    pub tool: ToolName,
    /// Raw JSON arguments
    pub input: JsonValue,
    pub request_id: Uuid,
    pub started_at: DateTime<Utc>,
    start: Instant,
    metadata: RwLock<HashMap<String, JsonValue>>,
    progress: Option<Arc<dyn ProgressNotifier>>,
}

impl ToolContext {
    pub fn new(tool: ToolName, input: JsonValue) -> Self {
        Self {
            tool,
            input,
            request_id: Uuid::new_v4(),
            started_at: Utc::now(),
            start: Instant::now(),
            metadata: RwLock::new(HashMap::new()),
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: Option<Arc<dyn ProgressNotifier>>) -> Self {
        self.progress = progress;
        self
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// `connection` argument of the invocation, empty for the default.
    pub fn connection(&self) -> &str {
        self.input
            .get("connection")
            .and_then(JsonValue::as_str)
            .unwrap_or("")
    }

    /// `sql` argument of the invocation, before interception.
    pub fn sql(&self) -> Option<&str> {
        self.input.get("sql").and_then(JsonValue::as_str)
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<JsonValue>) {
        self.metadata
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<JsonValue> {
        self.metadata
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.metadata
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(key)
    }

    /// Sorted copy of the metadata.
    pub fn metadata(&self) -> BTreeMap<String, JsonValue> {
        self.metadata
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Send a progress notification; dropped when no notifier is attached.
    pub async fn report_progress(&self, progress: f64, total: Option<f64>, message: String) {
        if let Some(notifier) = &self.progress {
            notifier.notify(progress, total, Some(message)).await;
        }
    }
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("tool", &self.tool)
            .field("request_id", &self.request_id)
            .field("started_at", &self.started_at)
            .field("has_progress", &self.progress.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metadata_set_get() {
        let ctx = ToolContext::new(ToolName::Query, json!({}));
        assert!(!ctx.contains("k"));
        ctx.set("k", 42);
        ctx.set("name", "value");
        assert_eq!(ctx.get("k"), Some(json!(42)));
        assert_eq!(ctx.metadata().keys().collect::<Vec<_>>(), vec!["k", "name"]);
    }

    #[test]
    fn test_input_accessors() {
        let ctx = ToolContext::new(
            ToolName::Query,
            json!({"sql": "SELECT 1", "connection": "staging"}),
        );
        assert_eq!(ctx.sql(), Some("SELECT 1"));
        assert_eq!(ctx.connection(), "staging");

        let ctx = ToolContext::new(ToolName::ListCatalogs, json!({}));
        assert_eq!(ctx.connection(), "");
        assert!(ctx.sql().is_none());
    }

    #[test]
    fn test_concurrent_metadata_access() {
        let ctx = Arc::new(ToolContext::new(ToolName::Query, json!({})));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let ctx = Arc::clone(&ctx);
                std::thread::spawn(move || ctx.set(format!("k{}", i), i))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(ctx.metadata().len(), 8);
    }

    #[tokio::test]
    async fn test_progress_without_notifier_is_noop() {
        let ctx = ToolContext::new(ToolName::Query, json!({}));
        ctx.report_progress(1.0, Some(3.0), "Executing".to_string()).await;
    }
}
